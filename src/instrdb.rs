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

use std::collections::BTreeMap;

use crate::instr::Instruction;

/// Address-keyed index of every instruction decoded so far.
///
/// Entries are write-once: the first instruction recorded for an address is
/// kept and later inserts for the same address are ignored. Iteration is in
/// ascending address order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionIndex {
    // Key is the start address
    map: BTreeMap<u64, Instruction>,
    total_bytes: u64,
}

impl InstructionIndex {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            total_bytes: 0,
        }
    }

    /// Insert `instr` unless its address is already present. Returns true if it was added.
    pub fn insert(&mut self, instr: Instruction) -> bool {
        if self.map.contains_key(&instr.address) {
            return false;
        }
        self.total_bytes += instr.length as u64;
        self.map.insert(instr.address, instr);
        true
    }

    pub fn contains(&self, address: u64) -> bool {
        self.map.contains_key(&address)
    }

    pub fn get(&self, address: u64) -> Option<&Instruction> {
        self.map.get(&address)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sum of the lengths of all indexed instructions.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.map.values()
    }

    /// Every instruction whose display text contains `query`, case-sensitive, in index order.
    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a Instruction> + 'a {
        self.map.values().filter(move |i| i.text.contains(query))
    }
}

impl Extend<Instruction> for InstructionIndex {
    fn extend<T: IntoIterator<Item = Instruction>>(&mut self, iter: T) {
        for instr in iter {
            self.insert(instr);
        }
    }
}

impl FromIterator<Instruction> for InstructionIndex {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        let mut index = InstructionIndex::new();
        index.extend(iter);
        index
    }
}
