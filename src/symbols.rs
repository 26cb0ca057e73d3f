//! Symbol listings: turning an engine's textual `x *!*` output into seed
//! addresses, and producing that same text from a symbol table.

use std::collections::BTreeMap;

/// Separator used by debuggers to split a 64-bit address into two 32-bit halves.
pub const SEGMENT_SEPARATOR: char = '`';

const SEGMENTED_LEN: usize = 17;
const HALF_LEN: usize = 8;

/// Extract candidate start addresses from a raw symbol listing.
///
/// The first whitespace-delimited token of each line is the address field.
/// Lines whose field is not a hex number (headers, banners, blank lines) are
/// dropped. Order is preserved and duplicates are kept.
pub fn parse_symbol_listing(listing: &str) -> Vec<u64> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(parse_address_field)
        .collect()
}

/// Parse one address field, joining the segmented `HHHHHHHH`HHHHHHHH` form first.
pub fn parse_address_field(field: &str) -> Option<u64> {
    let joined;
    let hex = if field.len() == SEGMENTED_LEN
        && field.is_char_boundary(HALF_LEN)
        && field[HALF_LEN..].starts_with(SEGMENT_SEPARATOR)
    {
        joined = format!("{}{}", &field[..HALF_LEN], &field[HALF_LEN + 1..]);
        joined.as_str()
    } else {
        field
    };
    // from_str_radix alone would also take a leading '+'
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(hex, 16).ok()
}

/// Render an address the way debuggers print 64-bit symbol addresses.
pub fn format_segmented(address: u64) -> String {
    format!(
        "{:08x}{}{:08x}",
        address >> 32,
        SEGMENT_SEPARATOR,
        address & 0xffff_ffff
    )
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
}

/// Symbols of one module keyed by start address.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols_by_addr: BTreeMap<u64, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols_by_addr: BTreeMap::new(),
        }
    }

    /// Aliases at an address already taken are dropped; the first name seen is kept.
    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols_by_addr.entry(symbol.address).or_insert(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols_by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols_by_addr.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols_by_addr.values()
    }

    /// `x module!pattern` style listing. A pattern of `*` (or one ending in `*`) matches by prefix.
    pub fn listing(&self, module: &str, pattern: &str) -> String {
        let prefix = pattern.trim_end_matches('*');
        let exact = !pattern.ends_with('*');
        let mut out = String::new();
        for symbol in self.iter() {
            let hit = if exact {
                symbol.name == pattern
            } else {
                symbol.name.starts_with(prefix)
            };
            if hit {
                out.push_str(&format!(
                    "{} {}!{}\n",
                    format_segmented(symbol.address),
                    module,
                    symbol.name
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segmented_address_is_joined() {
        let seeds = parse_symbol_listing("00000001`00000002 SomeExport");
        assert_eq!(seeds, vec![0x0000_0001_0000_0002]);
    }

    #[test]
    fn non_hex_lines_are_dropped() {
        assert!(parse_symbol_listing("---- not an address ----").is_empty());
        assert!(parse_symbol_listing("").is_empty());
    }

    #[test]
    fn listing_keeps_order_and_duplicates() {
        let text = "\
start             end                 module name
00007ff6`12340000 00007ff6`12350000   app
00007ff6`12341000 app!main
  401000 app!helper
00007ff6`12341000 app!main_alias
";
        let seeds = parse_symbol_listing(text);
        assert_eq!(
            seeds,
            vec![0x7ff6_1234_0000, 0x7ff6_1234_1000, 0x40_1000, 0x7ff6_1234_1000]
        );
    }

    #[test]
    fn seventeen_chars_without_separator_is_parsed_as_is() {
        // Too long for u64 once the separator check fails.
        assert_eq!(parse_address_field("00000001x00000002"), None);
        assert_eq!(parse_address_field("deadbeef"), Some(0xdead_beef));
    }

    #[test]
    fn signed_or_prefixed_fields_are_not_addresses() {
        assert_eq!(parse_address_field("+401000"), None);
        assert_eq!(parse_address_field("-1"), None);
        assert_eq!(parse_address_field("0x401000"), None);
        assert_eq!(parse_address_field("+0000000`00401000"), None);
        assert_eq!(
            parse_symbol_listing("+401000 app!bogus
00401000 app!main
"),
            vec![0x40_1000]
        );
    }

    #[test]
    fn table_listing_round_trips_through_parser() {
        let mut table = SymbolTable::new();
        table.insert(Symbol {
            name: "main".to_string(),
            address: 0x1_4000_1000,
        });
        table.insert(Symbol {
            name: "helper".to_string(),
            address: 0x1_4000_2000,
        });
        table.insert(Symbol {
            name: "main_alias".to_string(),
            address: 0x1_4000_1000,
        });
        assert_eq!(table.len(), 2);

        let text = table.listing("app", "*");
        assert!(text.contains("00000001`40001000 app!main"));
        assert_eq!(parse_symbol_listing(&text), vec![0x1_4000_1000, 0x1_4000_2000]);

        let only_main = table.listing("app", "main");
        assert_eq!(parse_symbol_listing(&only_main), vec![0x1_4000_1000]);
    }
}
