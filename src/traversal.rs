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

//! Worklist traversal that fills an [`InstructionIndex`] with every
//! instruction reachable from a set of seed addresses.
//!
//! The worklist is a LIFO stack of candidates and may hold the same address
//! more than once. De-duplication happens in one place, when an address is
//! popped: it is skipped if the index already holds an instruction there or
//! if the engine was already asked about it during this run. Each address is
//! therefore sent to the engine at most once.

use std::collections::HashSet;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::error::ServiceError;
use crate::instrdb::InstructionIndex;
use crate::service::DisassemblerService;

/// What to do when the engine reports that an address holds no decodable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndecodablePolicy {
    /// Abort the traversal.
    #[default]
    Fail,
    /// Log it and treat the reply as zero blocks.
    Skip,
}

#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Log progress every this many popped addresses; 0 disables it.
    pub progress_interval: usize,
    pub on_undecodable: UndecodablePolicy,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            on_undecodable: UndecodablePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Addresses popped from the worklist, including skipped ones.
    pub roots_explored: usize,
    pub service_calls: usize,
    pub skipped_undecodable: usize,
    pub instructions: usize,
    pub total_bytes: u64,
}

/// Build an index by following control flow out of `seeds`.
///
/// Any engine failure other than a skipped undecodable address aborts the
/// whole build; no partial index is returned.
pub fn build_index<S, I>(
    service: &mut S,
    seeds: I,
    options: &TraversalOptions,
) -> Result<(InstructionIndex, TraversalStats)>
where
    S: DisassemblerService + ?Sized,
    I: IntoIterator<Item = u64>,
{
    let now = Instant::now();
    let mut index = InstructionIndex::new();
    let mut stats = TraversalStats::default();
    let mut queried: HashSet<u64> = HashSet::new();
    let mut worklist: Vec<u64> = seeds.into_iter().collect();

    while let Some(address) = worklist.pop() {
        stats.roots_explored += 1;
        if options.progress_interval > 0 && stats.roots_explored % options.progress_interval == 0 {
            log::info!(
                "Total roots explored: {}, current amount remaining: {}, total bytes disassembled: {}",
                stats.roots_explored,
                worklist.len(),
                index.total_bytes()
            );
        }

        if index.contains(address) || !queried.insert(address) {
            continue;
        }

        stats.service_calls += 1;
        let blocks = match service.disassemble_function(address) {
            Ok(blocks) => blocks,
            Err(ServiceError::Undecodable(addr))
                if options.on_undecodable == UndecodablePolicy::Skip =>
            {
                log::warn!("Skipping undecodable address 0x{:x}", addr);
                stats.skipped_undecodable += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to disassemble function at 0x{:x}", address)
                })
            }
        };

        let mut found_new = false;
        for block in &blocks {
            for instr in &block.instructions {
                if index.insert(instr.clone()) {
                    found_new = true;
                }
            }
        }

        // Nothing new means an earlier request already covered this code and
        // queued its successors.
        if found_new {
            for block in &blocks {
                worklist.extend(block.outbound.iter().copied());
            }
        } else {
            log::debug!("0x{:x}: no new instructions", address);
        }
    }

    stats.instructions = index.len();
    stats.total_bytes = index.total_bytes();
    log::info!(
        "Traversal finished: {} roots, {} engine calls, {} instructions, {} bytes in {:.2?}",
        stats.roots_explored,
        stats.service_calls,
        stats.instructions,
        stats.total_bytes,
        now.elapsed()
    );
    Ok((index, stats))
}
