//! Stream identifier parsing, validation and auto-generation.
//!
//! A stream identifier is `<milliseconds>-<sequenceNumber>`. Either half of
//! an XADD candidate may be the wildcard `*`, and the bare string `*` asks
//! for a fully auto-generated identifier. Identifiers are strictly monotonic
//! within a stream, which is what makes binary-searched range lookups valid.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StreamIdError {
    #[error("id doesn't have <milliseconds>-<sequenceNumber> format")]
    InvalidFormat,
    #[error("invalid <milliseconds> value in the ID")]
    InvalidMilliseconds,
    #[error("invalid <sequenceNumber> value in the ID")]
    InvalidSequence,
    #[error("ERR The ID specified in XADD must be greater than 0-0")]
    IdIsZero,
    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    IdTooSmall,
}

/// A concrete stream entry identifier.
///
/// Ordering derives from the field order, so `(ms, seq)` compares
/// lexicographically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        StreamId { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// An XADD candidate identifier as written by the client.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntryIdSpec {
    /// `*` — both halves auto-generated.
    Auto,
    /// `ms-*` — explicit milliseconds, inferred sequence number.
    Partial { ms: u64 },
    /// `ms-seq` — fully explicit.
    Explicit(StreamId),
}

impl EntryIdSpec {
    pub fn parse(input: &str) -> Result<Self, StreamIdError> {
        if input == "*" {
            return Ok(EntryIdSpec::Auto);
        }

        let (ms_part, seq_part) = input.split_once('-').ok_or(StreamIdError::InvalidFormat)?;

        if seq_part.contains('-') {
            return Err(StreamIdError::InvalidFormat);
        }

        let ms = ms_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::InvalidMilliseconds)?;

        if seq_part == "*" {
            return Ok(EntryIdSpec::Partial { ms });
        }

        let seq = seq_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::InvalidSequence)?;

        Ok(EntryIdSpec::Explicit(StreamId::new(ms, seq)))
    }
}

/// Resolves an XADD candidate into the concrete identifier to append.
///
/// `last` is the identifier currently at the top of the stream, or `None`
/// for an empty or absent stream; `now_ms` supplies the wall-clock half of
/// fully auto-generated identifiers.
///
/// Inference for a wildcard sequence: a zero `ms` starts at sequence 1
/// (`0-0` is reserved), a stream with no prior millisecond starts at 0, and
/// anything else continues from the previous sequence. The resolved
/// identifier must then still be strictly greater than `last`.
pub fn next_id(
    spec: EntryIdSpec,
    last: Option<StreamId>,
    now_ms: u64,
) -> Result<StreamId, StreamIdError> {
    let prev = last.unwrap_or(StreamId::ZERO);

    let candidate = match spec {
        EntryIdSpec::Auto => return Ok(StreamId::new(now_ms, 0)),
        EntryIdSpec::Partial { ms } => {
            let seq = if ms == 0 {
                1
            } else if prev.ms == 0 {
                0
            } else {
                prev.seq + 1
            };

            StreamId::new(ms, seq)
        }
        EntryIdSpec::Explicit(id) => {
            if id == StreamId::ZERO {
                return Err(StreamIdError::IdIsZero);
            }

            id
        }
    };

    if candidate <= prev {
        return Err(StreamIdError::IdTooSmall);
    }

    Ok(candidate)
}

/// A range boundary for XRANGE and a since-id for XREAD.
///
/// The sequence half is optional: `ms`, `ms-*` and `ms-seq` all parse. A
/// missing sequence resolves to 0 at the start of a range and to the maximum
/// at the end, so `5` spans every entry with `ms == 5`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeId {
    pub ms: u64,
    pub seq: Option<u64>,
}

impl RangeId {
    pub fn parse(input: &str) -> Result<Self, StreamIdError> {
        let (ms_part, seq_part) = match input.split_once('-') {
            Some(parts) => parts,
            None => {
                let ms = input
                    .parse::<u64>()
                    .map_err(|_| StreamIdError::InvalidMilliseconds)?;
                return Ok(RangeId { ms, seq: None });
            }
        };

        if seq_part.contains('-') {
            return Err(StreamIdError::InvalidFormat);
        }

        let ms = ms_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::InvalidMilliseconds)?;

        if seq_part == "*" {
            return Ok(RangeId { ms, seq: None });
        }

        let seq = seq_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::InvalidSequence)?;

        Ok(RangeId { ms, seq: Some(seq) })
    }

    /// The smallest identifier this boundary admits.
    pub fn start_bound(self) -> StreamId {
        StreamId::new(self.ms, self.seq.unwrap_or(0))
    }

    /// The largest identifier this boundary admits.
    pub fn end_bound(self) -> StreamId {
        StreamId::new(self.ms, self.seq.unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_ordering_and_display() {
        assert!(StreamId::new(1, 0) > StreamId::ZERO);
        assert!(StreamId::new(1, 5) < StreamId::new(2, 0));
        assert!(StreamId::new(2, 3) < StreamId::new(2, 4));
        assert_eq!(StreamId::new(1526919030474, 3).to_string(), "1526919030474-3");
        assert_eq!(StreamId::ZERO.to_string(), "0-0");
    }

    #[test]
    fn test_parse_entry_id_spec() {
        let test_cases = vec![
            ("*", Ok(EntryIdSpec::Auto)),
            ("5-*", Ok(EntryIdSpec::Partial { ms: 5 })),
            ("0-0", Ok(EntryIdSpec::Explicit(StreamId::ZERO))),
            ("1-2", Ok(EntryIdSpec::Explicit(StreamId::new(1, 2)))),
            (
                "1526919030474-55",
                Ok(EntryIdSpec::Explicit(StreamId::new(1526919030474, 55))),
            ),
            ("invalid", Err(StreamIdError::InvalidFormat)),
            ("", Err(StreamIdError::InvalidFormat)),
            ("1-2-3", Err(StreamIdError::InvalidFormat)),
            ("-1", Err(StreamIdError::InvalidMilliseconds)),
            ("abc-1", Err(StreamIdError::InvalidMilliseconds)),
            ("1-", Err(StreamIdError::InvalidSequence)),
            ("1-abc", Err(StreamIdError::InvalidSequence)),
        ];

        for (input, expected) in test_cases {
            assert_eq!(EntryIdSpec::parse(input), expected, "parsing {:?}", input);
        }
    }

    #[test]
    fn test_next_id() {
        let spec = |s: &str| EntryIdSpec::parse(s).unwrap();

        let test_cases = vec![
            // Fully explicit against an empty stream.
            (spec("1-1"), None, Ok(StreamId::new(1, 1))),
            (spec("1234-5"), None, Ok(StreamId::new(1234, 5))),
            (spec("0-0"), None, Err(StreamIdError::IdIsZero)),
            (
                spec("0-0"),
                Some(StreamId::new(5, 5)),
                Err(StreamIdError::IdIsZero),
            ),
            // Explicit against an existing top item.
            (
                spec("1-1"),
                Some(StreamId::new(1, 1)),
                Err(StreamIdError::IdTooSmall),
            ),
            (
                spec("1-0"),
                Some(StreamId::new(1, 1)),
                Err(StreamIdError::IdTooSmall),
            ),
            (
                spec("0-2"),
                Some(StreamId::new(1, 1)),
                Err(StreamIdError::IdTooSmall),
            ),
            (spec("1-2"), Some(StreamId::new(1, 1)), Ok(StreamId::new(1, 2))),
            (spec("2-0"), Some(StreamId::new(1, 1)), Ok(StreamId::new(2, 0))),
            // Wildcard sequence inference.
            (spec("0-*"), None, Ok(StreamId::new(0, 1))),
            (spec("1234-*"), None, Ok(StreamId::new(1234, 0))),
            (
                spec("5-*"),
                Some(StreamId::new(5, 2)),
                Ok(StreamId::new(5, 3)),
            ),
            (
                spec("1526919030474-*"),
                Some(StreamId::new(1526919030474, 0)),
                Ok(StreamId::new(1526919030474, 1)),
            ),
            (
                spec("3-*"),
                Some(StreamId::new(5, 2)),
                Err(StreamIdError::IdTooSmall),
            ),
        ];

        for (candidate, last, expected) in test_cases {
            assert_eq!(
                next_id(candidate, last, 99),
                expected,
                "generating from {:?} against {:?}",
                candidate,
                last
            );
        }
    }

    #[test]
    fn test_next_id_auto() {
        assert_eq!(
            next_id(EntryIdSpec::Auto, None, 1526919030474),
            Ok(StreamId::new(1526919030474, 0))
        );
        assert_eq!(
            next_id(EntryIdSpec::Auto, Some(StreamId::new(1, 1)), 42),
            Ok(StreamId::new(42, 0))
        );
    }

    #[test]
    fn test_parse_range_id() {
        let test_cases = vec![
            ("5", Ok(RangeId { ms: 5, seq: None })),
            ("5-*", Ok(RangeId { ms: 5, seq: None })),
            ("5-3", Ok(RangeId { ms: 5, seq: Some(3) })),
            ("0-0", Ok(RangeId { ms: 0, seq: Some(0) })),
            ("abc", Err(StreamIdError::InvalidMilliseconds)),
            ("5-x", Err(StreamIdError::InvalidSequence)),
            ("5-1-2", Err(StreamIdError::InvalidFormat)),
        ];

        for (input, expected) in test_cases {
            assert_eq!(RangeId::parse(input), expected, "parsing {:?}", input);
        }
    }

    #[test]
    fn test_range_id_bounds() {
        let partial = RangeId { ms: 7, seq: None };
        assert_eq!(partial.start_bound(), StreamId::new(7, 0));
        assert_eq!(partial.end_bound(), StreamId::new(7, u64::MAX));

        let exact = RangeId { ms: 7, seq: Some(3) };
        assert_eq!(exact.start_bound(), StreamId::new(7, 3));
        assert_eq!(exact.end_bound(), StreamId::new(7, 3));
    }
}
