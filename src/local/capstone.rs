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

use capstone::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitness {
    Bits32,
    Bits64,
}

/// How control leaves an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Sequential,
    Call,
    Jump,
    ConditionalJump,
    Return,
    /// Traps and halts: nothing is known to follow.
    Stop,
}

#[derive(Debug, Clone)]
pub struct InstructionData {
    pub address: u64,
    pub size: u32,
    pub text: String,
    pub flow: Flow,
    /// Direct branch or call destination, when the operand is an immediate.
    pub target: Option<u64>,
}

impl InstructionData {
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(self.size as u64)
    }
}

pub struct Disassembler {
    cs: Capstone,
}

impl Disassembler {
    pub fn new(bitness: Bitness) -> Result<Self, capstone::Error> {
        let mode = match bitness {
            Bitness::Bits32 => arch::x86::ArchMode::Mode32,
            Bitness::Bits64 => arch::x86::ArchMode::Mode64,
        };
        let cs = Capstone::new()
            .x86()
            .mode(mode)
            .syntax(arch::x86::ArchSyntax::Intel)
            .detail(true) // Required for instruction groups
            .build()?;

        Ok(Self { cs })
    }

    /// Decode the single instruction at the start of `code`. `None` if the bytes are not valid code.
    pub fn decode_one(&self, code: &[u8], address: u64) -> Option<InstructionData> {
        let insns = self.cs.disasm_count(code, address, 1).ok()?;
        let insn = insns.iter().next()?;

        let mnemonic = insn.mnemonic().unwrap_or("");
        let op_str = insn.op_str().unwrap_or("");
        let text = if op_str.is_empty() {
            mnemonic.to_string()
        } else {
            format!("{} {}", mnemonic, op_str)
        };

        let mut groups: Vec<String> = Vec::new();
        if let Ok(detail) = self.cs.insn_detail(&insn) {
            for group in detail.groups() {
                if let Some(name) = self.cs.group_name(*group) {
                    groups.push(name);
                }
            }
        }

        let flow = classify(mnemonic, &groups);
        let target = match flow {
            Flow::Call | Flow::Jump | Flow::ConditionalJump => parse_immediate(op_str),
            _ => None,
        };

        Some(InstructionData {
            address: insn.address(),
            size: insn.bytes().len() as u32,
            text,
            flow,
            target,
        })
    }
}

fn classify(mnemonic: &str, groups: &[String]) -> Flow {
    let in_group = |name: &str| groups.iter().any(|g| g == name);
    if in_group("ret") || in_group("iret") {
        Flow::Return
    } else if in_group("call") {
        Flow::Call
    } else if in_group("jump") {
        // jmp, ljmp and prefixed forms such as "bnd jmp" or "notrack jmp"
        if mnemonic.ends_with("jmp") {
            Flow::Jump
        } else {
            Flow::ConditionalJump
        }
    } else if matches!(mnemonic, "int3" | "hlt" | "ud2" | "ud1" | "ud0") {
        Flow::Stop
    } else {
        Flow::Sequential
    }
}

/// Branch operands like `0x401000`; register and memory operands give `None`.
fn parse_immediate(op_str: &str) -> Option<u64> {
    let digits = op_str.trim().strip_prefix("0x")?;
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_control_flow() {
        let d = Disassembler::new(Bitness::Bits64).unwrap();

        let ret = d.decode_one(&[0xc3], 0x1000).unwrap();
        assert_eq!(ret.flow, Flow::Return);
        assert_eq!(ret.text, "ret");

        // call rel32 to 0x2000 from 0x1000 (next = 0x1005)
        let call = d.decode_one(&[0xe8, 0xfb, 0x0f, 0x00, 0x00], 0x1000).unwrap();
        assert_eq!(call.flow, Flow::Call);
        assert_eq!(call.target, Some(0x2000));
        assert_eq!(call.size, 5);

        // je +2
        let je = d.decode_one(&[0x74, 0x02], 0x1000).unwrap();
        assert_eq!(je.flow, Flow::ConditionalJump);
        assert_eq!(je.target, Some(0x1004));

        // jmp rax
        let indirect = d.decode_one(&[0xff, 0xe0], 0x1000).unwrap();
        assert_eq!(indirect.flow, Flow::Jump);
        assert_eq!(indirect.target, None);

        let int3 = d.decode_one(&[0xcc], 0x1000).unwrap();
        assert_eq!(int3.flow, Flow::Stop);

        let push = d.decode_one(&[0x55], 0x1000).unwrap();
        assert_eq!(push.flow, Flow::Sequential);
        assert_eq!(push.text, "push rbp");
    }

    #[test]
    fn invalid_bytes_do_not_decode() {
        let d = Disassembler::new(Bitness::Bits64).unwrap();
        assert!(d.decode_one(&[], 0x1000).is_none());
        // truncated call rel32
        assert!(d.decode_one(&[0xe8, 0x00], 0x1000).is_none());
    }

    #[test]
    fn parses_only_immediate_operands() {
        assert_eq!(parse_immediate("0x401000"), Some(0x401000));
        assert_eq!(parse_immediate("qword ptr [rip + 0x10]"), None);
        assert_eq!(parse_immediate("rax"), None);
    }
}
