//! Accepted status code ranges.
//!
//! A range spec is a comma separated list of inclusive ranges (`200-299`) and
//! single codes (`404`). Whitespace around items and dashes is ignored.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use thiserror::Error;

const MIN_STATUS: u16 = 100;
const MAX_STATUS: u16 = 599;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusRangeError {
    #[error("range specification is empty")]
    Empty,
    #[error("empty entry in '{0}'")]
    EmptyEntry(String),
    #[error("'{0}' is not a status code")]
    NotANumber(String),
    #[error("status code {0} is outside 100-599")]
    OutOfBounds(u16),
    #[error("range {0}-{1} starts after it ends")]
    Reversed(u16, u16),
}

/// Parsed accepted status code specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedStatusCodes {
    ranges: Vec<RangeInclusive<u16>>,
}

impl AcceptedStatusCodes {
    pub fn parse(spec: &str) -> Result<Self, StatusRangeError> {
        if spec.trim().is_empty() {
            return Err(StatusRangeError::Empty);
        }

        let ranges = spec
            .split(',')
            .map(|entry| parse_entry(entry, spec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ranges })
    }

    pub fn accepts(&self, status_code: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(&status_code))
    }
}

impl FromStr for AcceptedStatusCodes {
    type Err = StatusRangeError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Self::parse(spec)
    }
}

impl fmt::Display for AcceptedStatusCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if range.start() == range.end() {
                write!(f, "{}", range.start())?;
            } else {
                write!(f, "{}-{}", range.start(), range.end())?;
            }
        }
        Ok(())
    }
}

/// Check `status_code` against a range spec such as `"200-299"`
pub fn classify(status_code: u16, range_spec: &str) -> Result<bool, StatusRangeError> {
    Ok(AcceptedStatusCodes::parse(range_spec)?.accepts(status_code))
}

fn parse_entry(entry: &str, spec: &str) -> Result<RangeInclusive<u16>, StatusRangeError> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(StatusRangeError::EmptyEntry(spec.to_string()));
    }

    match entry.split_once('-') {
        Some((start, end)) => {
            let start = parse_code(start)?;
            let end = parse_code(end)?;
            if start > end {
                return Err(StatusRangeError::Reversed(start, end));
            }
            Ok(start..=end)
        }
        None => {
            let code = parse_code(entry)?;
            Ok(code..=code)
        }
    }
}

fn parse_code(raw: &str) -> Result<u16, StatusRangeError> {
    let raw = raw.trim();
    let code: u16 = raw.parse().map_err(|_| StatusRangeError::NotANumber(raw.to_string()))?;
    if !(MIN_STATUS..=MAX_STATUS).contains(&code) {
        return Err(StatusRangeError::OutOfBounds(code));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        assert_eq!(classify(200, "200-299"), Ok(true));
        assert_eq!(classify(299, "200-299"), Ok(true));
        assert_eq!(classify(300, "200-299"), Ok(false));
        assert_eq!(classify(199, "200-299"), Ok(false));
    }

    #[test]
    fn test_list_with_singletons_and_whitespace() {
        let accepted = AcceptedStatusCodes::parse(" 200 - 204 , 301,  404 ").unwrap();
        assert!(accepted.accepts(204));
        assert!(accepted.accepts(301));
        assert!(accepted.accepts(404));
        assert!(!accepted.accepts(302));
        assert_eq!(accepted.to_string(), "200-204,301,404");
    }

    #[test]
    fn test_malformed_specs_fail() {
        assert_eq!(classify(200, ""), Err(StatusRangeError::Empty));
        assert_eq!(classify(200, "   "), Err(StatusRangeError::Empty));
        assert!(matches!(classify(200, "200-299,"), Err(StatusRangeError::EmptyEntry(_))));
        assert!(matches!(classify(200, "2xx"), Err(StatusRangeError::NotANumber(_))));
        assert!(matches!(classify(200, "200-"), Err(StatusRangeError::NotANumber(_))));
        assert_eq!(classify(200, "299-200"), Err(StatusRangeError::Reversed(299, 200)));
        assert_eq!(classify(200, "99"), Err(StatusRangeError::OutOfBounds(99)));
    }

    #[test]
    fn test_classify_is_deterministic() {
        for code in [100_u16, 200, 250, 301, 404, 500, 599] {
            let first = classify(code, "200-299,404");
            for _ in 0..3 {
                assert_eq!(classify(code, "200-299,404"), first);
            }
        }
    }
}
