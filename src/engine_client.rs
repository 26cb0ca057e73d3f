// Copyright (c) 2026 ASM-Search Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Client side of the engine protocol: drives an engine over a [`Transport`],
//! usually the pipes of a spawned engine process.

use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde_json::Value;

use crate::error::ServiceError;
use crate::instr::BasicBlock;
use crate::model::parse_blocks;
use crate::protocol::{EngineReply, EngineRequest, ExecuteResult};
use crate::service::DisassemblerService;
use crate::transport::{FramedTransport, Transport};

pub struct EngineClient<T: Transport> {
    transport: T,
    next_seq: u64,
}

impl<T: Transport> EngineClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_seq: 1,
        }
    }

    fn seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Send one request and block until its reply arrives.
    fn round_trip(
        &mut self,
        request: EngineRequest,
        address: Option<u64>,
    ) -> Result<Value, ServiceError> {
        let seq = request.seq();
        self.transport.write_message(&serde_json::to_value(&request)?)?;
        let msg = self
            .transport
            .read_message()?
            .ok_or_else(|| ServiceError::Transport("engine closed the connection".to_string()))?;
        let reply: EngineReply = serde_json::from_value(msg)?;
        if reply.seq != seq {
            return Err(ServiceError::Transport(format!(
                "reply for request {} while waiting for {}",
                reply.seq, seq
            )));
        }
        reply.into_result(address)
    }

    pub fn shutdown(&mut self) -> Result<(), ServiceError> {
        let seq = self.seq();
        self.round_trip(EngineRequest::Shutdown { seq }, None)?;
        Ok(())
    }
}

impl<T: Transport> DisassemblerService for EngineClient<T> {
    fn open(&mut self, path: &Path) -> Result<(), ServiceError> {
        let seq = self.seq();
        self.round_trip(
            EngineRequest::Open {
                seq,
                path: path.to_string_lossy().into_owned(),
            },
            None,
        )?;
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<String, ServiceError> {
        let seq = self.seq();
        let result = self.round_trip(
            EngineRequest::Execute {
                seq,
                command: command.to_string(),
            },
            None,
        )?;
        let result: ExecuteResult = serde_json::from_value(result)
            .map_err(|e| ServiceError::Remote(format!("unexpected execute result: {}", e)))?;
        Ok(result.output)
    }

    fn disassemble_function(&mut self, address: u64) -> Result<Vec<BasicBlock>, ServiceError> {
        let seq = self.seq();
        let reply = self.round_trip(
            EngineRequest::DisassembleFunction {
                seq,
                address: format!("0x{:x}", address),
            },
            Some(address),
        )?;
        Ok(parse_blocks(&reply)?)
    }
}

type ChildTransport = FramedTransport<BufReader<ChildStdout>, BufWriter<ChildStdin>>;

/// An engine running as a child process speaking the protocol on its stdio.
pub struct EngineProcess {
    child: Child,
    client: EngineClient<ChildTransport>,
}

impl EngineProcess {
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, ServiceError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ServiceError::Transport(format!("failed to start {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ServiceError::Transport("failed to capture engine stdout".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ServiceError::Transport("failed to capture engine stdin".to_string()))?;

        log::info!("Started engine {} (pid {})", program, child.id());
        let transport = FramedTransport::new(
            BufReader::with_capacity(64 * 1024, stdout),
            BufWriter::new(stdin),
        );
        Ok(Self {
            child,
            client: EngineClient::new(transport),
        })
    }
}

impl DisassemblerService for EngineProcess {
    fn open(&mut self, path: &Path) -> Result<(), ServiceError> {
        self.client.open(path)
    }

    fn execute(&mut self, command: &str) -> Result<String, ServiceError> {
        self.client.execute(command)
    }

    fn disassemble_function(&mut self, address: u64) -> Result<Vec<BasicBlock>, ServiceError> {
        self.client.disassemble_function(address)
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if let Err(e) = self.client.shutdown() {
            log::debug!("Engine shutdown request failed: {}", e);
        }
        match self.child.wait() {
            Ok(status) => log::debug!("Engine exited with {}", status),
            Err(e) => log::warn!("Failed to wait for engine: {}", e),
        }
    }
}
