//! `Range: bytes=...` negotiation

/// Inclusive byte interval inside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// What to send for a request against a file of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable range: send the whole file
    Full,
    Partial(ByteRange),
    /// 416 with `Content-Range: bytes */<length>`
    Unsatisfiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    From { start: u64, end: Option<u64> },
    Suffix(u64),
}

/// Resolve a raw `Range` header against the current file length.
///
/// Malformed headers, other units and multi-range requests are treated as
/// if no range had been asked for.
pub fn negotiate(header: Option<&str>, length: u64) -> RangeOutcome {
    let Some(spec) = header.and_then(parse) else {
        return RangeOutcome::Full;
    };

    match spec {
        RangeSpec::From { start, end } => {
            if start >= length {
                return RangeOutcome::Unsatisfiable;
            }
            let last = length - 1;
            let end = end.map(|end| end.min(last)).unwrap_or(last);
            RangeOutcome::Partial(ByteRange { start, end })
        }
        RangeSpec::Suffix(count) => {
            if length == 0 {
                return RangeOutcome::Unsatisfiable;
            }
            RangeOutcome::Partial(ByteRange {
                start: length.saturating_sub(count),
                end: length - 1,
            })
        }
    }
}

fn parse(header: &str) -> Option<RangeSpec> {
    let spec = header.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let count = parse_number(end)?;
        return (count > 0).then_some(RangeSpec::Suffix(count));
    }

    let start = parse_number(start)?;
    let end = if end.is_empty() {
        None
    } else {
        Some(parse_number(end)?)
    };
    if matches!(end, Some(end) if end < start) {
        return None;
    }
    Some(RangeSpec::From { start, end })
}

fn parse_number(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
