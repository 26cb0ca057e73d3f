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

//! In-process engine: decodes functions straight from the binary with capstone.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::capstone::{Disassembler, Flow};
use super::image::BinaryImage;
use crate::error::ServiceError;
use crate::instr::{BasicBlock, Instruction};
use crate::service::DisassemblerService;
use crate::symbols::format_segmented;

pub const DEFAULT_MAX_FUNCTION_INSTRUCTIONS: usize = 0x10000;

struct Loaded {
    image: BinaryImage,
    disasm: Disassembler,
}

pub struct LocalEngine {
    loaded: Option<Loaded>,
    max_function_instructions: usize,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngine {
    pub fn new() -> Self {
        Self {
            loaded: None,
            max_function_instructions: DEFAULT_MAX_FUNCTION_INSTRUCTIONS,
        }
    }

    pub fn with_max_function_instructions(mut self, max: usize) -> Self {
        self.max_function_instructions = max;
        self
    }

    /// Use an already loaded image instead of opening a file.
    pub fn from_image(image: BinaryImage) -> Result<Self, ServiceError> {
        let mut engine = Self::new();
        engine.attach(image)?;
        Ok(engine)
    }

    fn attach(&mut self, image: BinaryImage) -> Result<(), ServiceError> {
        let disasm = Disassembler::new(image.bitness)
            .map_err(|e| ServiceError::Remote(format!("failed to initialize capstone: {}", e)))?;
        self.loaded = Some(Loaded { image, disasm });
        Ok(())
    }

    fn loaded(&self) -> Result<&Loaded, ServiceError> {
        self.loaded.as_ref().ok_or(ServiceError::NotOpen)
    }

    fn list_modules(&self) -> Result<String, ServiceError> {
        let image = &self.loaded()?.image;
        let mut out = String::from("start             end                 module name\n");
        if let Some((start, end)) = image.extent() {
            out.push_str(&format!(
                "{} {}   {}\n",
                format_segmented(start),
                format_segmented(end),
                image.module
            ));
        }
        Ok(out)
    }

    /// `x [module!]pattern`
    fn examine_symbols(&self, spec: &str) -> Result<String, ServiceError> {
        let image = &self.loaded()?.image;
        let (module, pattern) = match spec.split_once('!') {
            Some((m, p)) => (m, p),
            None => ("*", spec),
        };
        let module_hit = module == "*" || module.eq_ignore_ascii_case(&image.module);
        if !module_hit || pattern.is_empty() {
            return Ok(String::new());
        }
        Ok(image.symbols.listing(&image.module, pattern))
    }

    /// Recursive descent over one function. Jump targets and conditional
    /// fall-throughs become further blocks of the function; call targets are
    /// only reported as outbound edges.
    fn decode_function(&self, loaded: &Loaded, entry: u64) -> Vec<BasicBlock> {
        let image = &loaded.image;
        let mut blocks: BTreeMap<u64, BasicBlock> = BTreeMap::new();
        let mut decoded: HashSet<u64> = HashSet::new();
        let mut pending = vec![entry];
        let mut budget = self.max_function_instructions;

        while let Some(start) = pending.pop() {
            if decoded.contains(&start) || !image.is_code(start) {
                continue;
            }
            let mut block = BasicBlock::default();
            let mut pc = start;
            loop {
                if budget == 0 {
                    log::debug!("0x{:x}: instruction budget exhausted", entry);
                    break;
                }
                if decoded.contains(&pc) {
                    // Ran into code already decoded for this function.
                    block.outbound.push(pc);
                    break;
                }
                let Some(insn) = image
                    .code_at(pc)
                    .and_then(|code| loaded.disasm.decode_one(code, pc))
                else {
                    break;
                };
                budget -= 1;
                decoded.insert(pc);
                let next = insn.next_address();
                block
                    .instructions
                    .push(Instruction::new(insn.address, insn.size, insn.text));

                match insn.flow {
                    Flow::Sequential => pc = next,
                    Flow::Call => {
                        block.outbound.extend(insn.target);
                        pc = next;
                    }
                    Flow::Jump => {
                        if let Some(target) = insn.target {
                            block.outbound.push(target);
                            pending.push(target);
                        }
                        break;
                    }
                    Flow::ConditionalJump => {
                        if let Some(target) = insn.target {
                            block.outbound.push(target);
                            pending.push(target);
                        }
                        block.outbound.push(next);
                        pending.push(next);
                        break;
                    }
                    Flow::Return | Flow::Stop => break,
                }
            }
            // Edges only lead to addresses this engine can decode.
            block.outbound.retain(|&target| image.is_code(target));
            if !block.instructions.is_empty() {
                blocks.insert(start, block);
            }
        }
        blocks.into_values().collect()
    }
}

impl DisassemblerService for LocalEngine {
    fn open(&mut self, path: &Path) -> Result<(), ServiceError> {
        let image = BinaryImage::load(path).map_err(|e| ServiceError::Remote(format!("{:#}", e)))?;
        self.attach(image)
    }

    fn execute(&mut self, command: &str) -> Result<String, ServiceError> {
        let command = command.trim();
        let (verb, rest) = command
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((command, ""));
        match verb {
            // Symbols are read at open; extensions do not apply.
            ".reload" | ".load" | ".symfix" => {
                self.loaded()?;
                Ok(String::new())
            }
            "lm" => self.list_modules(),
            "x" => self.examine_symbols(rest),
            _ => Err(ServiceError::Remote(format!(
                "unsupported command '{}'",
                command
            ))),
        }
    }

    fn disassemble_function(&mut self, address: u64) -> Result<Vec<BasicBlock>, ServiceError> {
        let loaded = self.loaded()?;
        if !loaded.image.is_code(address) {
            return Err(ServiceError::Undecodable(address));
        }
        Ok(self.decode_function(loaded, address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::capstone::Bitness;
    use crate::local::memory::CodeRegion;
    use crate::symbols::{parse_symbol_listing, Symbol, SymbolTable};

    // 0x1000: push rbp
    // 0x1001: test eax, eax
    // 0x1003: je 0x100d
    // 0x1005: call 0x2000
    // 0x100a: pop rbp
    // 0x100b: jmp 0x100e
    // 0x100d: nop
    // 0x100e: ret
    const FUNC: [u8; 15] = [
        0x55, 0x85, 0xc0, 0x74, 0x08, 0xe8, 0xf6, 0x0f, 0x00, 0x00, 0x5d, 0xeb, 0x01, 0x90, 0xc3,
    ];

    fn engine() -> LocalEngine {
        let mut code = vec![0xcc; 0x1010];
        code[..FUNC.len()].copy_from_slice(&FUNC);
        code[0x1000] = 0xc3; // 0x2000: ret
        let mut symbols = SymbolTable::new();
        symbols.insert(Symbol {
            name: "main".to_string(),
            address: 0x1000,
        });
        symbols.insert(Symbol {
            name: "leaf".to_string(),
            address: 0x2000,
        });
        let image = BinaryImage::new(
            "app".to_string(),
            Bitness::Bits64,
            vec![CodeRegion::new(0x1000, code)],
            symbols,
        );
        LocalEngine::from_image(image).unwrap()
    }

    #[test]
    fn edges_leaving_the_code_are_not_reported() {
        // 0x1000: call 0x2000 (no code there)
        // 0x1005: ret
        let code = vec![0xe8, 0xfb, 0x0f, 0x00, 0x00, 0xc3];
        let image = BinaryImage::new(
            "app".to_string(),
            Bitness::Bits64,
            vec![CodeRegion::new(0x1000, code)],
            SymbolTable::new(),
        );
        let mut engine = LocalEngine::from_image(image).unwrap();

        let blocks = engine.disassemble_function(0x1000).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].instructions.len(), 2);
        assert!(blocks[0].outbound.is_empty());
    }

    #[test]
    fn function_is_split_into_blocks() {
        let mut engine = engine();
        let blocks = engine.disassemble_function(0x1000).unwrap();

        let starts: Vec<u64> = blocks.iter().filter_map(|b| b.start_address()).collect();
        assert_eq!(starts, vec![0x1000, 0x1005, 0x100d, 0x100e]);

        let entry = &blocks[0];
        assert_eq!(entry.instructions.len(), 3);
        assert_eq!(entry.instructions[2].text, "je 0x100d");
        assert_eq!(entry.outbound, vec![0x100d, 0x1005]);

        // The call target is an edge but not part of the function.
        let body = &blocks[1];
        assert!(body.outbound.contains(&0x2000));
        assert!(body.outbound.contains(&0x100e));
        assert!(blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .all(|i| i.address < 0x2000));
    }

    #[test]
    fn every_instruction_is_decoded_once() {
        let mut engine = engine();
        let blocks = engine.disassemble_function(0x1000).unwrap();
        let total: usize = blocks.iter().map(|b| b.instructions.len()).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn address_outside_code_is_undecodable() {
        let mut engine = engine();
        assert!(matches!(
            engine.disassemble_function(0x9000),
            Err(ServiceError::Undecodable(0x9000))
        ));
    }

    #[test]
    fn budget_bounds_a_function() {
        let mut engine = engine().with_max_function_instructions(2);
        let blocks = engine.disassemble_function(0x1000).unwrap();
        let total: usize = blocks.iter().map(|b| b.instructions.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn symbol_commands_feed_the_seed_parser() {
        let mut engine = engine();
        assert_eq!(engine.execute(".reload -f").unwrap(), "");

        let listing = engine.execute("x *!*").unwrap();
        assert!(listing.contains("app!main"));
        assert_eq!(parse_symbol_listing(&listing), vec![0x1000, 0x2000]);

        let lm = engine.execute("lm").unwrap();
        assert!(lm.contains("00000000`00001000 00000000`00002010   app"));
        // header line contributes no seed
        assert_eq!(parse_symbol_listing(&lm), vec![0x1000]);

        assert_eq!(engine.execute("x other!*").unwrap(), "");
        assert!(matches!(
            engine.execute("g"),
            Err(ServiceError::Remote(_))
        ));
    }

    #[test]
    fn nothing_works_before_open() {
        let mut engine = LocalEngine::new();
        assert!(matches!(engine.execute("lm"), Err(ServiceError::NotOpen)));
        assert!(matches!(
            engine.disassemble_function(0x1000),
            Err(ServiceError::NotOpen)
        ));
    }
}
