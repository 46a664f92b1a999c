use std::io::{BufRead, Lines};
use regex::Regex;
use thiserror::Error;

// One hexadecimal address per line, with an optional 0x prefix
const ADDRESS_PATTERN: &str = r"^\s*(?:0[xX])?(?P<address>[0-9a-fA-F]{1,16})\s*$";

#[derive(Debug, Error)]
pub enum TraceParseError {
    #[error("line {line}: couldn't parse {text:?} as a hexadecimal address")]
    Malformed { line: usize, text: String },
    #[error("couldn't read the trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("couldn't build the address pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Iterates the addresses of a text trace. Blank lines and lines starting with `#` are skipped
pub struct TraceReader<R> {
    lines: Lines<R>,
    pattern: Regex,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Result<Self, TraceParseError> {
        Ok(Self {
            lines: reader.lines(),
            pattern: Regex::new(ADDRESS_PATTERN)?,
            line: 0,
        })
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<u64, TraceParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let address = self
                .pattern
                .captures(&text)
                .and_then(|tokens| u64::from_str_radix(&tokens["address"], 16).ok());
            return Some(address.ok_or(TraceParseError::Malformed {
                line: self.line,
                text,
            }));
        }
    }
}
