//! Incremental decoder for `text/event-stream` bodies.
//!
//! Bytes are buffered until a full event (terminated by a blank line) is
//! available, so events and multi-byte characters split across network
//! chunks come out whole.

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the `data` payloads of every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // CR only ever appears as part of a CRLF line ending; JSON payloads
        // escape it.
        self.buffer
            .extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = parse_event(&raw[..end]) {
                events.push(data);
            }
        }
        events
    }

    /// Flush a trailing event the server did not terminate.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            parse_event(&self.buffer)
        }
    }
}

fn parse_event(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let data_lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
