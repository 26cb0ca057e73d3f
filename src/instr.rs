use serde::{Deserialize, Serialize};

/// One decoded instruction as stored in the index and in the sidecar cache.
/// Field names are PascalCase on disk so caches written by the older .NET tool load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instruction {
    pub text: String, // e.g., "mov eax, ebx"
    pub address: u64,
    pub length: u32,
}

impl Instruction {
    pub fn new(address: u64, length: u32, text: String) -> Self {
        Self {
            text,
            address,
            length,
        }
    }
}

/// A basic block as reported by a disassembler engine: its instructions in
/// address order and every address control may leave it for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
    pub outbound: Vec<u64>,
}

impl BasicBlock {
    pub fn new(instructions: Vec<Instruction>, outbound: Vec<u64>) -> Self {
        Self {
            instructions,
            outbound,
        }
    }

    pub fn start_address(&self) -> Option<u64> {
        self.instructions.first().map(|i| i.address)
    }
}
