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

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::ServiceError;
use crate::instr::BasicBlock;
use crate::symbols::parse_symbol_listing;

/// The request/response surface of a disassembler engine.
///
/// Calls are blocking; one request is outstanding at a time.
pub trait DisassemblerService {
    fn open(&mut self, path: &Path) -> Result<(), ServiceError>;

    /// Run an engine control command and return its text output.
    fn execute(&mut self, command: &str) -> Result<String, ServiceError>;

    /// Decode the function starting at `address` into basic blocks.
    fn disassemble_function(&mut self, address: u64) -> Result<Vec<BasicBlock>, ServiceError>;
}

impl<S: DisassemblerService + ?Sized> DisassemblerService for Box<S> {
    fn open(&mut self, path: &Path) -> Result<(), ServiceError> {
        (**self).open(path)
    }

    fn execute(&mut self, command: &str) -> Result<String, ServiceError> {
        (**self).execute(command)
    }

    fn disassemble_function(&mut self, address: u64) -> Result<Vec<BasicBlock>, ServiceError> {
        (**self).disassemble_function(address)
    }
}

/// How a session is brought up before traversal.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Commands issued after the binary is opened, e.g. extension loads and symbol reloads.
    pub prepare_commands: Vec<String>,
    /// Command whose output is the symbol listing.
    pub symbols_command: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prepare_commands: vec![".reload -f".to_string(), "lm".to_string()],
            symbols_command: "x *!*".to_string(),
        }
    }
}

/// Open `binary`, run the bootstrap commands and return the seed addresses
/// extracted from the symbol listing.
pub fn open_session<S: DisassemblerService + ?Sized>(
    service: &mut S,
    binary: &Path,
    config: &SessionConfig,
) -> Result<Vec<u64>> {
    service
        .open(binary)
        .with_context(|| format!("Failed to open {}", binary.display()))?;

    for command in &config.prepare_commands {
        let output = service
            .execute(command)
            .with_context(|| format!("Bootstrap command '{}' failed", command))?;
        log::debug!("{}:\n{}", command, output.trim_end());
    }

    let listing = service
        .execute(&config.symbols_command)
        .with_context(|| format!("Symbol command '{}' failed", config.symbols_command))?;
    let seeds = parse_symbol_listing(&listing);
    log::info!(
        "{} seed addresses from {} listing lines",
        seeds.len(),
        listing.lines().count()
    );
    Ok(seeds)
}
