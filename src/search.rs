use std::io::{self, BufRead, Write};

use crate::instrdb::InstructionIndex;

/// Answer one query per input line until end of stream. Each match is written
/// as its display text on its own line. Returns the number of queries served.
///
/// Lines are taken as raw bytes; invalid UTF-8 is replaced rather than
/// ending the session.
pub fn run_query_loop<R: BufRead, W: Write>(
    index: &InstructionIndex,
    mut input: R,
    mut output: W,
) -> io::Result<usize> {
    let mut served = 0;
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let query = text.trim_end_matches(&['\r', '\n'][..]);
        let mut hits = 0;
        for instr in index.search(query) {
            writeln!(output, "{}", instr.text)?;
            hits += 1;
        }
        output.flush()?;
        log::debug!("query '{}': {} matches", query, hits);
        served += 1;
    }
    Ok(served)
}
