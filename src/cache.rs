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

//! Sidecar cache: `<binary>.discache`, a JSON object mapping the decimal
//! address to `{"Text", "Address", "Length"}`. Every save rewrites the whole file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

use crate::instr::Instruction;
use crate::instrdb::InstructionIndex;

pub const CACHE_SUFFIX: &str = ".discache";

/// Where the cache for `binary` lives.
pub fn sidecar_path(binary: &Path) -> PathBuf {
    let mut os = binary.as_os_str().to_owned();
    os.push(CACHE_SUFFIX);
    PathBuf::from(os)
}

pub fn has_cache(binary: &Path) -> bool {
    sidecar_path(binary).is_file()
}

/// Write the whole index next to `binary`, replacing any previous cache.
/// The file is written to a temporary sibling first and renamed into place.
pub fn save(index: &InstructionIndex, binary: &Path) -> Result<PathBuf> {
    let path = sidecar_path(binary);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let records: BTreeMap<u64, &Instruction> = index.iter().map(|i| (i.address, i)).collect();

    let mut tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary cache in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, &records).context("Failed to serialize cache")?;
        writer.flush()?;
    }
    tmp.persist(&path)
        .with_context(|| format!("Failed to write cache {}", path.display()))?;

    log::info!(
        "Saved {} instructions to {}",
        index.len(),
        path.display()
    );
    Ok(path)
}

/// Read the cache for `binary`. Any parse failure or key/record mismatch is an error.
pub fn load(binary: &Path) -> Result<InstructionIndex> {
    let path = sidecar_path(binary);
    let file =
        File::open(&path).with_context(|| format!("Failed to open cache {}", path.display()))?;
    let records: BTreeMap<u64, Instruction> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Corrupt cache {}", path.display()))?;

    let mut index = InstructionIndex::new();
    for (key, instr) in records {
        if key != instr.address {
            bail!(
                "Corrupt cache {}: key {} holds instruction at 0x{:x}",
                path.display(),
                key,
                instr.address
            );
        }
        index.insert(instr);
    }
    Ok(index)
}

/// Load the cache if one exists and is readable. A corrupt cache is reported
/// and treated as missing.
pub fn try_load(binary: &Path) -> Option<InstructionIndex> {
    if !has_cache(binary) {
        log::info!("No cache at {}", sidecar_path(binary).display());
        return None;
    }
    match load(binary) {
        Ok(index) => {
            log::info!(
                "Loaded {} instructions from {}",
                index.len(),
                sidecar_path(binary).display()
            );
            Some(index)
        }
        Err(e) => {
            log::warn!("Ignoring cache: {:#}", e);
            None
        }
    }
}

/// Load the cache for `binary`, or run `build` and save what it produces.
/// `rebuild` forces the second branch.
pub fn load_or_build<F>(binary: &Path, rebuild: bool, build: F) -> Result<InstructionIndex>
where
    F: FnOnce() -> Result<InstructionIndex>,
{
    if !rebuild {
        if let Some(index) = try_load(binary) {
            return Ok(index);
        }
    }
    let index = build()?;
    save(&index, binary)?;
    Ok(index)
}
