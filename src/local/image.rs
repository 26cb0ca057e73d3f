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

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use object::{Architecture, Object, ObjectSection, ObjectSymbol, SectionKind};

use super::capstone::Bitness;
use super::memory::CodeRegion;
use crate::symbols::{Symbol, SymbolTable};

pub const ENTRY_SYMBOL: &str = "$entry";

/// The parts of a binary the local engine needs: code and symbols.
pub struct BinaryImage {
    pub module: String,
    pub bitness: Bitness,
    pub regions: Vec<CodeRegion>,
    pub symbols: SymbolTable,
}

impl BinaryImage {
    pub fn new(module: String, bitness: Bitness, regions: Vec<CodeRegion>, symbols: SymbolTable) -> Self {
        Self {
            module,
            bitness,
            regions,
            symbols,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        // SAFETY: the mapping is read-only and dropped before this function returns.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to map {}", path.display()))?;
        let obj = object::File::parse(&*mmap)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let bitness = match obj.architecture() {
            Architecture::X86_64 => Bitness::Bits64,
            Architecture::I386 => Bitness::Bits32,
            other => bail!("Unsupported architecture {:?} in {}", other, path.display()),
        };

        let mut regions = Vec::new();
        for section in obj.sections() {
            if section.kind() != SectionKind::Text {
                continue;
            }
            let data = section.uncompressed_data()?;
            if data.is_empty() {
                continue;
            }
            log::debug!(
                "Code section {} at 0x{:x}, {} bytes",
                section.name().unwrap_or("?"),
                section.address(),
                data.len()
            );
            regions.push(CodeRegion::new(section.address(), data.into_owned()));
        }

        // Exports also cover data objects (copy-relocated .bss and the like);
        // only names that start code are kept as symbols.
        let in_code = |addr: u64| regions.iter().any(|r| r.contains(addr));
        let mut symbols = SymbolTable::new();
        let mut dropped = 0usize;
        let entry = obj.entry();
        if in_code(entry) {
            symbols.insert(Symbol {
                name: ENTRY_SYMBOL.to_string(),
                address: entry,
            });
        }
        for export in obj.exports()? {
            if !in_code(export.address()) {
                dropped += 1;
                continue;
            }
            symbols.insert(Symbol {
                name: String::from_utf8_lossy(export.name()).into_owned(),
                address: export.address(),
            });
        }
        for sym in obj.symbols() {
            if sym.kind() != object::SymbolKind::Text || !sym.is_definition() {
                continue;
            }
            if !in_code(sym.address()) {
                dropped += 1;
                continue;
            }
            if let Ok(name) = sym.name() {
                symbols.insert(Symbol {
                    name: name.to_string(),
                    address: sym.address(),
                });
            }
        }
        if dropped > 0 {
            log::debug!("{} symbols outside code sections ignored", dropped);
        }

        let module = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());

        log::info!(
            "Loaded {}: {} code regions, {} symbols",
            path.display(),
            regions.len(),
            symbols.len()
        );
        Ok(Self::new(module, bitness, regions, symbols))
    }

    pub fn region_of(&self, addr: u64) -> Option<&CodeRegion> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    pub fn is_code(&self, addr: u64) -> bool {
        self.region_of(addr).is_some()
    }

    pub fn code_at(&self, addr: u64) -> Option<&[u8]> {
        self.region_of(addr)?.bytes_from(addr)
    }

    /// Lowest and highest code address, for `lm`.
    pub fn extent(&self) -> Option<(u64, u64)> {
        let start = self.regions.iter().map(|r| r.start).min()?;
        let end = self.regions.iter().map(|r| r.end()).max()?;
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "just text").unwrap();
        assert!(BinaryImage::load(&path).is_err());
    }

    #[test]
    fn code_lookup_spans_regions() {
        let image = BinaryImage::new(
            "app".to_string(),
            Bitness::Bits64,
            vec![
                CodeRegion::new(0x1000, vec![0x90; 0x10]),
                CodeRegion::new(0x4000, vec![0xc3]),
            ],
            SymbolTable::new(),
        );
        assert!(image.is_code(0x100f));
        assert!(!image.is_code(0x1010));
        assert_eq!(image.code_at(0x4000), Some(&[0xc3u8][..]));
        assert_eq!(image.extent(), Some((0x1000, 0x4001)));
    }
}
