use serde_json::json;
use serde_json::Value;

use crate::instr::BasicBlock;
use crate::model::{ADDRESS, BLOCKS, DISPLAY_STRING, INSTRUCTIONS, LENGTH, OUTBOUND};

/// Serialize decoded blocks into the reply body of a `disassembleFunction` request.
/// Addresses and lengths are hex strings so 64-bit values survive JS clients.
pub fn serialize_blocks(blocks: &[BasicBlock]) -> Value {
    let mut out: Vec<Value> = Vec::with_capacity(blocks.len());
    for block in blocks {
        let instructions: Vec<Value> = block
            .instructions
            .iter()
            .map(|i| {
                json!({
                    ADDRESS: format!("0x{:x}", i.address),
                    LENGTH: format!("0x{:x}", i.length),
                    DISPLAY_STRING: i.text,
                })
            })
            .collect();
        let outbound: Vec<Value> = block
            .outbound
            .iter()
            .map(|a| Value::String(format!("0x{:x}", a)))
            .collect();
        out.push(json!({
            INSTRUCTIONS: instructions,
            OUTBOUND: outbound,
        }));
    }

    json!({ BLOCKS: Value::Array(out) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Instruction;
    use crate::model::parse_blocks;

    #[test]
    fn serialize_blocks_basic() {
        let blocks = vec![BasicBlock::new(
            vec![
                Instruction::new(0x1000, 2, "push ebp".to_string()),
                Instruction::new(0x1002, 2, "mov ebp, esp".to_string()),
            ],
            vec![0x2000],
        )];

        let v = serialize_blocks(&blocks);
        let list = v["BasicBlocks"].as_array().expect("blocks array");
        assert_eq!(list.len(), 1);
        let first = &list[0]["Instructions"][0];
        assert_eq!(first["Address"], "0x1000");
        assert_eq!(first["Length"], "0x2");
        assert_eq!(list[0]["OutBound"][0], "0x2000");

        assert_eq!(parse_blocks(&v).unwrap(), blocks);
    }
}
