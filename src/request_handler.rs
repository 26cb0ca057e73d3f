//! Server side of the engine protocol: dispatch framed requests to a service.
use std::path::Path;

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::disasm_serializer::serialize_blocks;
use crate::error::ServiceError;
use crate::protocol::{parse_hex_address, EngineReply, EngineRequest, ExecuteResult};
use crate::service::DisassemblerService;
use crate::transport::Transport;

/// Serve requests until end of stream or a `shutdown` request. Returns the number of requests handled.
pub fn serve<T, S>(transport: &mut T, service: &mut S) -> Result<usize>
where
    T: Transport + ?Sized,
    S: DisassemblerService + ?Sized,
{
    let mut handled = 0;
    loop {
        let msg = match transport.read_message() {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                log::info!("Engine client disconnected");
                break;
            }
            Err(e) => return Err(anyhow!("Failed to read request: {}", e)),
        };

        let (reply, stop) = dispatch_request(&msg, service);
        handled += 1;
        transport
            .write_message(&serde_json::to_value(&reply)?)
            .map_err(|e| anyhow!("Failed to write reply: {}", e))?;
        if stop {
            log::info!("Engine shutdown requested");
            break;
        }
    }
    Ok(handled)
}

/// Build the reply to one request. The flag is true for `shutdown`.
pub fn dispatch_request<S>(msg: &Value, service: &mut S) -> (EngineReply, bool)
where
    S: DisassemblerService + ?Sized,
{
    let request = match serde_json::from_value::<EngineRequest>(msg.clone()) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Unknown request {}: {}", msg, e);
            // Peek at the seq so the client can still correlate the failure
            let seq = msg.get("seq").and_then(Value::as_u64).unwrap_or(0);
            let err = ServiceError::Remote(format!("unrecognized request: {}", e));
            return (EngineReply::failed(seq, &err), false);
        }
    };
    log::debug!("Engine request: {:?}", request);

    let seq = request.seq();
    let result = match request {
        EngineRequest::Open { path, .. } => service.open(Path::new(&path)).map(|_| Value::Null),
        EngineRequest::Execute { command, .. } => service
            .execute(&command)
            .and_then(|output| Ok(serde_json::to_value(ExecuteResult { output })?)),
        EngineRequest::DisassembleFunction { address, .. } => match parse_hex_address(&address) {
            Some(addr) => service
                .disassemble_function(addr)
                .map(|blocks| serialize_blocks(&blocks)),
            None => Err(ServiceError::Remote(format!("bad address '{}'", address))),
        },
        EngineRequest::Shutdown { .. } => return (EngineReply::ok(seq, Value::Null), true),
    };

    let reply = match result {
        Ok(value) => EngineReply::ok(seq, value),
        Err(e) => {
            log::debug!("Request {} failed: {}", seq, e);
            EngineReply::failed(seq, &e)
        }
    };
    (reply, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{BasicBlock, Instruction};
    use crate::transport::FramedTransport;
    use serde_json::json;
    use std::io::Write;

    struct Fixed;

    impl DisassemblerService for Fixed {
        fn open(&mut self, _path: &Path) -> Result<(), ServiceError> {
            Ok(())
        }

        fn execute(&mut self, command: &str) -> Result<String, ServiceError> {
            Ok(format!("ran {}", command))
        }

        fn disassemble_function(&mut self, address: u64) -> Result<Vec<BasicBlock>, ServiceError> {
            if address == 0x1000 {
                Ok(vec![BasicBlock::new(
                    vec![Instruction::new(0x1000, 1, "ret".to_string())],
                    vec![],
                )])
            } else {
                Err(ServiceError::Undecodable(address))
            }
        }
    }

    fn frame(out: &mut Vec<u8>, v: Value) {
        let body = serde_json::to_vec(&v).unwrap();
        write!(out, "Content-Length: {}\r\n\r\n", body.len()).unwrap();
        out.extend_from_slice(&body);
    }

    fn replies(wire: &[u8]) -> Vec<Value> {
        let mut t = FramedTransport::new(wire, std::io::sink());
        let mut out = Vec::new();
        while let Some(v) = t.read_message().unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn serves_until_shutdown() {
        let mut input = Vec::new();
        frame(&mut input, json!({"req": "open", "seq": 1, "path": "a.exe"}));
        frame(&mut input, json!({"req": "execute", "seq": 2, "command": "lm"}));
        frame(&mut input, json!({"req": "disassembleFunction", "seq": 3, "address": "0x1000"}));
        frame(&mut input, json!({"req": "disassembleFunction", "seq": 4, "address": "0x2000"}));
        frame(&mut input, json!({"req": "shutdown", "seq": 5}));
        frame(&mut input, json!({"req": "execute", "seq": 6, "command": "never"}));

        let mut output = Vec::new();
        let handled = {
            let mut t = FramedTransport::new(&input[..], &mut output);
            serve(&mut t, &mut Fixed).unwrap()
        };
        assert_eq!(handled, 5);

        let out = replies(&output);
        assert_eq!(out.len(), 5);
        assert_eq!(out[1]["result"]["output"], "ran lm");
        assert_eq!(
            out[2]["result"]["BasicBlocks"][0]["Instructions"][0]["DisplayString"],
            "ret"
        );
        assert_eq!(out[3]["error"]["kind"], "undecodable");
        assert_eq!(out[4]["seq"], 5);
    }

    #[test]
    fn unknown_request_gets_a_failure_reply() {
        let (reply, stop) = dispatch_request(&json!({"req": "globals", "seq": 7}), &mut Fixed);
        assert!(!stop);
        assert_eq!(reply.seq, 7);
        assert!(reply.error.is_some());
    }
}
