//! Lexical checks for the XML Schema datatypes used by the grammar

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Datatype of a leaf element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    /// `xsd:string`, text kept verbatim
    String,
    /// `xsd:nonNegativeInteger`
    NonNegativeInteger,
    /// `xsd:positiveInteger`
    PositiveInteger,
    /// `xsd:dateTime`
    DateTime,
    /// `xsd:boolean`
    Boolean,
    /// Token enumeration such as `"Enabled" | "Disabled"`
    Enumeration(&'static [&'static str]),
    /// Externally defined storage class enumeration
    StorageClass,
}

/// Datatype violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatatypeError {
    #[error("'{value}' is not an integer")]
    NotAnInteger { value: String },

    #[error("'{value}' must not be negative")]
    Negative { value: String },

    #[error("'{value}' must be greater than zero")]
    NotPositive { value: String },

    #[error("'{value}' is too large")]
    OutOfRange { value: String },

    #[error("'{value}' is not a valid dateTime")]
    InvalidDateTime { value: String },

    #[error("'{value}' is not a valid boolean")]
    InvalidBoolean { value: String },

    #[error("'{value}' is not one of: {}", allowed.join(", "))]
    NotAllowed { value: String, allowed: Vec<String> },
}

impl DatatypeError {
    /// Short label for diagnostics
    pub fn hint(&self) -> &'static str {
        match self {
            DatatypeError::NotAnInteger { .. } => "not an integer",
            DatatypeError::Negative { .. } => "negative value",
            DatatypeError::NotPositive { .. } => "must be positive",
            DatatypeError::OutOfRange { .. } => "out of range",
            DatatypeError::InvalidDateTime { .. } => "invalid dateTime",
            DatatypeError::InvalidBoolean { .. } => "invalid boolean",
            DatatypeError::NotAllowed { .. } => "invalid value",
        }
    }

    /// Suggestion for fixing the value
    pub fn help(&self) -> Option<String> {
        match self {
            DatatypeError::NotAnInteger { .. } => Some("Use a whole number, e.g. 30".to_string()),
            DatatypeError::Negative { .. } => Some("Use 0 or a positive number".to_string()),
            DatatypeError::NotPositive { .. } => Some("Use a number of 1 or more".to_string()),
            DatatypeError::OutOfRange { .. } => None,
            DatatypeError::InvalidDateTime { .. } => Some(
                "Use ISO 8601 with a time part, e.g. 2024-01-01T00:00:00Z".to_string(),
            ),
            DatatypeError::InvalidBoolean { .. } => {
                Some("Valid values: true, false, 1, 0".to_string())
            }
            DatatypeError::NotAllowed { allowed, .. } => {
                Some(format!("Valid values: {}", allowed.join(", ")))
            }
        }
    }
}

impl Datatype {
    /// Check raw character data against this datatype
    pub fn check(&self, raw: &str, storage_classes: &[String]) -> Result<(), DatatypeError> {
        match self {
            Datatype::String => Ok(()),
            Datatype::NonNegativeInteger => parse_non_negative_integer(raw).map(|_| ()),
            Datatype::PositiveInteger => parse_positive_integer(raw).map(|_| ()),
            Datatype::DateTime => raw.parse::<XsdDateTime>().map(|_| ()),
            Datatype::Boolean => parse_boolean(raw).map(|_| ()),
            Datatype::Enumeration(values) => {
                check_token(raw, values.iter().copied()).map(|_| ())
            }
            Datatype::StorageClass => {
                check_token(raw, storage_classes.iter().map(String::as_str)).map(|_| ())
            }
        }
    }

    /// Human-readable datatype name
    pub fn label(&self) -> String {
        match self {
            Datatype::String => "string".to_string(),
            Datatype::NonNegativeInteger => "nonNegativeInteger".to_string(),
            Datatype::PositiveInteger => "positiveInteger".to_string(),
            Datatype::DateTime => "dateTime".to_string(),
            Datatype::Boolean => "boolean".to_string(),
            Datatype::Enumeration(values) => values.join(" | "),
            Datatype::StorageClass => "StorageClass".to_string(),
        }
    }
}

/// XML whitespace collapsing: trim and fold internal runs to one space
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn check_token<'a>(
    raw: &str,
    allowed: impl Iterator<Item = &'a str> + Clone,
) -> Result<String, DatatypeError> {
    let value = collapse_whitespace(raw);
    if allowed.clone().any(|v| v == value) {
        Ok(value)
    } else {
        Err(DatatypeError::NotAllowed {
            value,
            allowed: allowed.map(str::to_string).collect(),
        })
    }
}

/// Parse an `xsd:nonNegativeInteger`
pub fn parse_non_negative_integer(raw: &str) -> Result<u64, DatatypeError> {
    let value = collapse_whitespace(raw);
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'+') => (false, &value[1..]),
        Some(b'-') => (true, &value[1..]),
        _ => (false, value.as_str()),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DatatypeError::NotAnInteger { value });
    }

    let zero = digits.bytes().all(|b| b == b'0');
    if negative && !zero {
        return Err(DatatypeError::Negative { value });
    }

    digits
        .parse::<u64>()
        .map_err(|_| DatatypeError::OutOfRange { value: value.clone() })
}

/// Parse an `xsd:positiveInteger`
pub fn parse_positive_integer(raw: &str) -> Result<u64, DatatypeError> {
    match parse_non_negative_integer(raw) {
        Ok(0) | Err(DatatypeError::Negative { .. }) => Err(DatatypeError::NotPositive {
            value: collapse_whitespace(raw),
        }),
        other => other,
    }
}

/// Parse an `xsd:boolean`
pub fn parse_boolean(raw: &str) -> Result<bool, DatatypeError> {
    match collapse_whitespace(raw).as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        value => Err(DatatypeError::InvalidBoolean {
            value: value.to_string(),
        }),
    }
}

/// An `xsd:dateTime` value with optional timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XsdDateTime {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl XsdDateTime {
    /// True when the instant is exactly midnight UTC
    pub fn is_midnight_utc(&self) -> bool {
        match self.offset {
            Some(offset) => {
                let utc = self.datetime - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
                utc.time() == NaiveTime::MIN
            }
            None => false,
        }
    }
}

impl FromStr for XsdDateTime {
    type Err = DatatypeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = collapse_whitespace(raw);
        let invalid = || DatatypeError::InvalidDateTime {
            value: value.clone(),
        };

        // Date and time must be separated by an upper-case 'T'
        if value.as_bytes().get(10) != Some(&b'T') {
            return Err(invalid());
        }
        // chrono accepts a lower-case 'z' and leap seconds, xsd:dateTime does not
        if !has_lexical_suffix(&value) || value.get(17..19) == Some("60") {
            return Err(invalid());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            if dt.nanosecond() >= 1_000_000_000 {
                return Err(invalid());
            }
            return Ok(Self {
                datetime: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }

        NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .filter(|datetime| datetime.nanosecond() < 1_000_000_000)
            .map(|datetime| Self {
                datetime,
                offset: None,
            })
            .ok_or_else(invalid)
    }
}

/// Check what follows the seconds field: `[.fff][Z|(+|-)hh:mm]`
fn has_lexical_suffix(value: &str) -> bool {
    let Some(tail) = value.get(19..) else {
        return false;
    };
    let tail = match tail.strip_prefix('.') {
        Some(fraction) => {
            let digits = fraction.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return false;
            }
            &fraction[digits..]
        }
        None => tail,
    };
    match tail.as_bytes() {
        [] | [b'Z'] => true,
        [b'+' | b'-', h1, h2, b':', m1, m2] => {
            [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

impl fmt::Display for XsdDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datetime.format("%Y-%m-%dT%H:%M:%S%.f"))?;
        match self.offset {
            Some(offset) if offset.local_minus_utc() == 0 => write!(f, "Z"),
            Some(offset) => {
                let secs = offset.local_minus_utc();
                let sign = if secs < 0 { '-' } else { '+' };
                let secs = secs.abs();
                write!(f, "{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
            }
            None => Ok(()),
        }
    }
}

impl Serialize for XsdDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for XsdDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["STANDARD".to_string(), "GLACIER".to_string()]
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_non_negative_integer() {
        assert_eq!(parse_non_negative_integer("0"), Ok(0));
        assert_eq!(parse_non_negative_integer(" 30 \n"), Ok(30));
        assert_eq!(parse_non_negative_integer("+7"), Ok(7));
        assert_eq!(parse_non_negative_integer("-0"), Ok(0));
        assert!(matches!(
            parse_non_negative_integer("-1"),
            Err(DatatypeError::Negative { .. })
        ));
        assert!(matches!(
            parse_non_negative_integer("1.5"),
            Err(DatatypeError::NotAnInteger { .. })
        ));
        assert!(matches!(
            parse_non_negative_integer(""),
            Err(DatatypeError::NotAnInteger { .. })
        ));
        assert!(matches!(
            parse_non_negative_integer("99999999999999999999999"),
            Err(DatatypeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_positive_integer() {
        assert_eq!(parse_positive_integer("1"), Ok(1));
        assert!(matches!(
            parse_positive_integer("0"),
            Err(DatatypeError::NotPositive { .. })
        ));
        assert!(matches!(
            parse_positive_integer("-3"),
            Err(DatatypeError::NotPositive { .. })
        ));
        assert!(matches!(
            parse_positive_integer("abc"),
            Err(DatatypeError::NotAnInteger { .. })
        ));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(parse_boolean("true"), Ok(true));
        assert_eq!(parse_boolean(" 0 "), Ok(false));
        assert!(parse_boolean("TRUE").is_err());
        assert!(parse_boolean("yes").is_err());
    }

    #[test]
    fn test_datetime_forms() {
        let utc: XsdDateTime = "2024-01-01T00:00:00Z".parse().unwrap();
        assert!(utc.is_midnight_utc());
        assert_eq!(utc.to_string(), "2024-01-01T00:00:00Z");

        let offset: XsdDateTime = "2024-01-01T02:00:00+02:00".parse().unwrap();
        assert!(offset.is_midnight_utc());
        assert_eq!(offset.to_string(), "2024-01-01T02:00:00+02:00");

        let local: XsdDateTime = "2024-06-30T12:30:00.250".parse().unwrap();
        assert_eq!(local.offset, None);
        assert!(!local.is_midnight_utc());
        assert_eq!(local.to_string(), "2024-06-30T12:30:00.250");

        assert!("2024-01-01".parse::<XsdDateTime>().is_err());
        assert!("2024-01-01 00:00:00Z".parse::<XsdDateTime>().is_err());
        assert!("2024-13-01T00:00:00Z".parse::<XsdDateTime>().is_err());

        assert!("2024-01-01T00:00:00z".parse::<XsdDateTime>().is_err());
        assert!("2024-01-01T00:00:00+0200".parse::<XsdDateTime>().is_err());
        assert!("2024-01-01T00:00:00.Z".parse::<XsdDateTime>().is_err());
        assert!("2024-01-01T23:59:60Z".parse::<XsdDateTime>().is_err());
        assert!("2024-01-01T23:59:60".parse::<XsdDateTime>().is_err());
        assert!("2024-01-01T23:59:59.5-05:30".parse::<XsdDateTime>().is_ok());
    }

    #[test]
    fn test_enumeration_collapses_whitespace() {
        let status = Datatype::Enumeration(&["Enabled", "Disabled"]);
        assert!(status.check(" Enabled\n", &[]).is_ok());
        let err = status.check("enabled", &[]).unwrap_err();
        assert_eq!(err.to_string(), "'enabled' is not one of: Enabled, Disabled");
    }

    #[test]
    fn test_storage_class_uses_configured_set() {
        assert!(Datatype::StorageClass.check("GLACIER", &classes()).is_ok());
        assert!(Datatype::StorageClass.check("DEEP_ARCHIVE", &classes()).is_err());
    }

    #[test]
    fn test_string_accepts_anything() {
        assert!(Datatype::String.check("", &[]).is_ok());
        assert!(Datatype::String.check("  anything <>  ", &[]).is_ok());
    }
}
