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

//! Checked access to the structured reply of a `disassembleFunction` request.
//!
//! Reply shape:
//! {
//!   "BasicBlocks": [
//!     { "Instructions": [ { "Address": "0x...", "Length": "0x...", "DisplayString": "..." } ],
//!       "OutBound": [ "0x...", ... ] }
//!   ]
//! }
//!
//! Every accessor is fallible; nothing in an engine reply is assumed present.

use serde_json::Value;

use crate::error::ResponseError;
use crate::instr::{BasicBlock, Instruction};

pub const BLOCKS: &str = "BasicBlocks";
pub const INSTRUCTIONS: &str = "Instructions";
pub const OUTBOUND: &str = "OutBound";
pub const ADDRESS: &str = "Address";
pub const LENGTH: &str = "Length";
pub const DISPLAY_STRING: &str = "DisplayString";

#[derive(Debug, Clone, Copy)]
pub struct ModelObject<'a> {
    value: &'a Value,
}

impl<'a> ModelObject<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn child(&self, name: &'static str) -> Result<ModelObject<'a>, ResponseError> {
        self.value
            .get(name)
            .map(ModelObject::new)
            .ok_or(ResponseError::MissingField(name))
    }

    /// Elements of the list stored under `name`.
    pub fn iterated_children(
        &self,
        name: &'static str,
    ) -> Result<impl Iterator<Item = ModelObject<'a>>, ResponseError> {
        let list = self
            .child(name)?
            .value
            .as_array()
            .ok_or(ResponseError::NotAList(name))?;
        Ok(list.iter().map(ModelObject::new))
    }

    /// The value as a `0x`-prefixed hex integer.
    pub fn value_as_int(&self) -> Result<u64, ResponseError> {
        let text = match self.value {
            Value::String(s) => s.as_str(),
            other => return Err(ResponseError::NotHex(other.to_string())),
        };
        let digits = text
            .strip_prefix("0x")
            .ok_or_else(|| ResponseError::NotHex(text.to_string()))?;
        u64::from_str_radix(digits, 16).map_err(|_| ResponseError::NotHex(text.to_string()))
    }

    pub fn display_value(&self, name: &'static str) -> Result<&'a str, ResponseError> {
        self.value.as_str().ok_or(ResponseError::NotAString(name))
    }
}

/// Decode a whole reply into blocks. The first shape violation aborts the decode.
pub fn parse_blocks(reply: &Value) -> Result<Vec<BasicBlock>, ResponseError> {
    let root = reply
        .get(BLOCKS)
        .map(ModelObject::new)
        .ok_or(ResponseError::MissingRoot(BLOCKS))?;
    let list = root.value.as_array().ok_or(ResponseError::NotAList(BLOCKS))?;

    let mut blocks = Vec::with_capacity(list.len());
    for block in list.iter().map(ModelObject::new) {
        let mut instructions = Vec::new();
        for instr in block.iterated_children(INSTRUCTIONS)? {
            let address = instr.child(ADDRESS)?.value_as_int()?;
            let length = instr.child(LENGTH)?.value_as_int()?;
            let length = u32::try_from(length)
                .map_err(|_| ResponseError::NotHex(format!("0x{:x}", length)))?;
            let text = instr.child(DISPLAY_STRING)?.display_value(DISPLAY_STRING)?;
            instructions.push(Instruction::new(address, length, text.to_string()));
        }
        let outbound = block
            .iterated_children(OUTBOUND)?
            .map(|target| target.value_as_int())
            .collect::<Result<Vec<_>, _>>()?;
        blocks.push(BasicBlock::new(instructions, outbound));
    }
    Ok(blocks)
}
