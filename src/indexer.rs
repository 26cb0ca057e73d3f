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

use anyhow::Result;

use crate::cache;
use crate::instrdb::InstructionIndex;
use crate::service::{open_session, DisassemblerService, SessionConfig};
use crate::traversal::{build_index, TraversalOptions};

/// Produce the index for `binary`: from its sidecar cache when present,
/// otherwise by connecting an engine, traversing from the binary's symbols
/// and saving the result. The engine is only started on a cache miss.
pub fn index_binary<F, S>(
    binary: &Path,
    rebuild: bool,
    session: &SessionConfig,
    options: &TraversalOptions,
    connect: F,
) -> Result<InstructionIndex>
where
    F: FnOnce() -> Result<S>,
    S: DisassemblerService,
{
    cache::load_or_build(binary, rebuild, || {
        let mut service = connect()?;
        let seeds = open_session(&mut service, binary, session)?;
        let (index, _stats) = build_index(&mut service, seeds, options)?;

        log::info!("Finished disassembling {}", binary.display());
        log::info!("Total bytes disassembled: {}", index.total_bytes());
        Ok(index)
    })
}
