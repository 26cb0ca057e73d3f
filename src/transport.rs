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

use serde_json::Value;
use std::error::Error;
use std::io::{self, BufRead, Write};

pub type TransportResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub trait Transport {
    /// Next message, or `None` on a clean end of stream between messages.
    fn read_message(&mut self) -> TransportResult<Option<Value>>;
    fn write_message(&mut self, msg: &Value) -> TransportResult<()>;
}

/// `Content-Length` framed JSON over any reader/writer pair: child process
/// pipes on the client side, stdin/stdout on the server side.
pub struct FramedTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> FramedTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl FramedTransport<io::StdinLock<'static>, io::StdoutLock<'static>> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout().lock())
    }
}

impl<R: BufRead, W: Write> Transport for FramedTransport<R, W> {
    fn read_message(&mut self) -> TransportResult<Option<Value>> {
        // Read headers until an empty line
        let mut content_length: Option<usize> = None;
        let mut saw_header = false;
        loop {
            let mut header_line = String::new();
            let n = self.reader.read_line(&mut header_line)?;
            if n == 0 {
                if saw_header {
                    return Err("EOF while reading header".into());
                }
                return Ok(None);
            }
            let header_trim = header_line.trim();
            if header_trim.is_empty() {
                if saw_header {
                    break; // end of headers
                }
                continue;
            }
            saw_header = true;
            if header_trim.to_lowercase().starts_with("content-length") {
                if let Some(idx) = header_trim.find(':') {
                    let num = header_trim[idx + 1..].trim();
                    content_length = Some(num.parse::<usize>()?);
                }
            }
            // ignore other headers
        }

        let len = content_length.ok_or("Missing Content-Length header")?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        let v: Value = serde_json::from_slice(&buf)?;
        Ok(Some(v))
    }

    fn write_message(&mut self, msg: &Value) -> TransportResult<()> {
        let body = serde_json::to_vec(msg)?;
        write!(self.writer, "Content-Length: {}\r\n\r\n", body.len())?;
        self.writer.write_all(&body)?;
        self.writer.flush()?;
        Ok(())
    }
}
