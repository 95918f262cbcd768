//! # Wire framing.
//!
//! Sensors write the decimal text of a Celsius value (`23.456789`) with no
//! guaranteed delimiter. [`Framing::PerRead`] treats every completed read as
//! exactly one reading. [`Framing::Lines`] buffers until `\n` and accepts any
//! number of readings per read, including ones split across reads.

use std::str::FromStr;

use crate::error::SensorError;

/// How received bytes are cut into readings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Framing {
    /// One read is one reading.
    #[default]
    PerRead,
    /// Newline-delimited readings.
    Lines,
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "per-read" | "per_read" | "perread" => Ok(Framing::PerRead),
            "lines" | "line" => Ok(Framing::Lines),
            other => Err(format!("unknown framing {other:?} (per-read | lines)")),
        }
    }
}

/// Parses one payload as a finite decimal number, ignoring surrounding whitespace.
///
/// ```
/// use thermovisor::parse_reading;
///
/// assert_eq!(parse_reading(b"23.5\r\n").unwrap(), 23.5);
/// assert!(parse_reading(b"hot").is_err());
/// assert!(parse_reading(b"NaN").is_err());
/// ```
pub fn parse_reading(payload: &[u8]) -> Result<f64, SensorError> {
    let reject = |reason: String| SensorError::Parse {
        payload: preview(payload),
        reason,
    };

    let text = std::str::from_utf8(payload).map_err(|e| reject(e.to_string()))?;
    let value: f64 = text.trim().parse().map_err(|e| reject(format!("{e}")))?;
    if !value.is_finite() {
        return Err(reject("not a finite number".to_string()));
    }
    Ok(value)
}

fn preview(payload: &[u8]) -> String {
    const MAX: usize = 64;
    let text = String::from_utf8_lossy(&payload[..payload.len().min(MAX)]);
    if payload.len() > MAX {
        format!("{text}...")
    } else {
        text.into_owned()
    }
}

/// Stateful decoder for one connection.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    max_len: usize,
    pending: Vec<u8>,
    /// Dropping the rest of an over-long line until the next `\n`.
    discarding: bool,
}

impl FrameDecoder {
    /// `max_len` bounds a buffered line in [`Framing::Lines`] mode.
    pub fn new(framing: Framing, max_len: usize) -> Self {
        Self {
            framing,
            max_len: max_len.max(1),
            pending: Vec::new(),
            discarding: false,
        }
    }

    /// Decodes the bytes of one completed read, in arrival order.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Result<f64, SensorError>> {
        match self.framing {
            Framing::PerRead if chunk.is_empty() => Vec::new(),
            Framing::PerRead => vec![parse_reading(chunk)],
            Framing::Lines => self.decode_lines(chunk),
        }
    }

    fn decode_lines(&mut self, chunk: &[u8]) -> Vec<Result<f64, SensorError>> {
        let mut out = Vec::new();
        let mut rest = chunk;

        if self.discarding {
            match rest.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    rest = &rest[pos + 1..];
                }
                None => return out,
            }
        }

        self.pending.extend_from_slice(rest);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let body = line.trim_ascii_end();
            if body.len() > self.max_len {
                out.push(Err(self.overlong(body)));
                continue;
            }
            if body.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            out.push(parse_reading(body));
        }

        if self.pending.len() > self.max_len {
            out.push(Err(self.overlong(&self.pending)));
            self.pending.clear();
            self.discarding = true;
        }
        out
    }

    fn overlong(&self, line: &[u8]) -> SensorError {
        SensorError::Parse {
            payload: preview(line),
            reason: format!("line exceeds {} bytes", self.max_len),
        }
    }

    /// Discards a partially received line (used when the connection is replaced).
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}
