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

use thiserror::Error;

/// A structured engine reply did not have the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("no root element `{0}` in disassembly reply")]
    MissingRoot(&'static str),
    #[error("no `{0}` where expected in disassembly reply")]
    MissingField(&'static str),
    #[error("expected a list for `{0}` in disassembly reply")]
    NotAList(&'static str),
    #[error("expected hex integer but found '{0}' in disassembly reply")]
    NotHex(String),
    #[error("expected a string for `{0}` in disassembly reply")]
    NotAString(&'static str),
}

/// Failures reported by a disassembler service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The address does not hold code the engine can decode (data, unmapped memory).
    #[error("address 0x{0:x} cannot be decoded")]
    Undecodable(u64),
    #[error(transparent)]
    Malformed(#[from] ResponseError),
    /// The engine understood the request and refused it.
    #[error("disassembler engine reported: {0}")]
    Remote(String),
    #[error("disassembler engine transport failed: {0}")]
    Transport(String),
    #[error("no binary has been opened")]
    NotOpen,
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Transport(e.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ServiceError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ServiceError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Transport(e.to_string())
    }
}
