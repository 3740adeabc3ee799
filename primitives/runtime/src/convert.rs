//! Path-parameter conversion.
//!
//! Generated handlers receive every path parameter as a string and convert it
//! to the target field type with these functions. Repeated parameters are
//! split on the separator configured at generation time.

use std::fmt::Display;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use thiserror::Error;

/// Conversion failures; all of them are client input errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The value does not parse as the field's scalar type
    #[error("cannot parse {value:?}: {reason}")]
    Parse {
        /// Offending input
        value: String,
        /// Parser message
        reason: String,
    },
    /// The value is neither a known enum name nor a known enum number
    #[error("{0} is not valid")]
    UnknownEnum(String),
    /// The value is not valid base64
    #[error("{0:?} is not valid base64")]
    Bytes(String),
}

/// Result type for conversions
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Parse a single scalar value
pub fn parse<T>(val: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    val.parse::<T>()
        .map_err(|e| ConvertError::Parse { value: val.to_string(), reason: e.to_string() })
}

/// Parse a repeated scalar value split on `sep`
pub fn parse_repeated<T>(val: &str, sep: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    split(val, sep).map(parse::<T>).collect()
}

/// Decode a base64 bytes value, accepting standard and URL-safe alphabets
pub fn bytes(val: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(val)
        .or_else(|_| URL_SAFE.decode(val))
        .map_err(|_| ConvertError::Bytes(val.to_string()))
}

/// Decode a repeated bytes value split on `sep`
pub fn bytes_repeated(val: &str, sep: &str) -> Result<Vec<Vec<u8>>> { split(val, sep).map(bytes).collect() }

/// Convert a symbolic enum name (or a known enum number) to its wire value.
///
/// `from_str_name` is the lookup prost generates for every enum. Unknown
/// names are rejected, never mapped to the default value.
pub fn enum_value<E>(val: &str, from_str_name: impl Fn(&str) -> Option<E>) -> Result<i32>
where
    E: Into<i32> + TryFrom<i32>,
{
    if let Some(e) = from_str_name(val) {
        return Ok(e.into());
    }
    match val.parse::<i32>() {
        Ok(number) if E::try_from(number).is_ok() => Ok(number),
        _ => Err(ConvertError::UnknownEnum(val.to_string())),
    }
}

/// Convert a repeated enum value split on `sep`, preserving input order
pub fn enum_values<E>(val: &str, sep: &str, from_str_name: impl Fn(&str) -> Option<E>) -> Result<Vec<i32>>
where
    E: Into<i32> + TryFrom<i32>,
{
    split(val, sep).map(|v| enum_value(v, &from_str_name)).collect()
}

fn split<'a>(val: &'a str, sep: &'a str) -> impl Iterator<Item = &'a str> {
    // An empty value is an empty list, not a list with one empty element.
    val.split(sep).filter(move |_| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Shelf {
        Unspecified = 0,
        Fiction = 1,
        Poetry = 2,
    }

    impl Shelf {
        fn from_str_name(value: &str) -> Option<Self> {
            match value {
                "SHELF_UNSPECIFIED" => Some(Self::Unspecified),
                "FICTION" => Some(Self::Fiction),
                "POETRY" => Some(Self::Poetry),
                _ => None,
            }
        }
    }

    impl From<Shelf> for i32 {
        fn from(value: Shelf) -> Self { value as i32 }
    }

    impl TryFrom<i32> for Shelf {
        type Error = ();
        fn try_from(value: i32) -> std::result::Result<Self, ()> {
            match value {
                0 => Ok(Self::Unspecified),
                1 => Ok(Self::Fiction),
                2 => Ok(Self::Poetry),
                _ => Err(()),
            }
        }
    }

    #[test]
    fn scalars() {
        assert_eq!(parse::<i64>("-42"), Ok(-42));
        assert_eq!(parse::<String>("alice"), Ok("alice".to_string()));
        assert!(matches!(parse::<u32>("x"), Err(ConvertError::Parse { .. })));
        assert_eq!(parse_repeated::<i32>("1,2,3", ","), Ok(vec![1, 2, 3]));
        assert_eq!(parse_repeated::<i32>("", ","), Ok(vec![]));
    }

    #[test]
    fn enum_by_name_and_number() {
        assert_eq!(enum_value("POETRY", Shelf::from_str_name), Ok(2));
        assert_eq!(enum_value("1", Shelf::from_str_name), Ok(1));
        assert_eq!(
            enum_value("COMICS", Shelf::from_str_name),
            Err(ConvertError::UnknownEnum("COMICS".into()))
        );
        assert!(enum_value("7", Shelf::from_str_name).is_err());
    }

    #[test]
    fn repeated_enum_keeps_order() {
        assert_eq!(enum_values("POETRY,FICTION", ",", Shelf::from_str_name), Ok(vec![2, 1]));
        assert_eq!(enum_values("POETRY|FICTION", "|", Shelf::from_str_name), Ok(vec![2, 1]));
        assert!(enum_values("POETRY,NOPE", ",", Shelf::from_str_name).is_err());
    }

    #[test]
    fn base64_bytes() {
        assert_eq!(bytes("aGk="), Ok(b"hi".to_vec()));
        assert_eq!(bytes("-_8="), Ok(vec![0xfb, 0xff]));
        assert!(bytes("***").is_err());
    }
}
