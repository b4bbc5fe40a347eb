//! Lenient decoders for numeric columns the backend serves from CSV.
//!
//! Category codes and scores arrive as integers in the common case, but a
//! column that ever held a missing value is re-read as floating point
//! (`1.0` instead of `1`). These decoders accept both and reject anything
//! that is not an integral value in range.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

fn integral_code<E: serde::de::Error>(value: f64) -> Result<u8, E> {
    if value.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&value) {
        return Err(E::custom(format!("expected a small integer code, got {value}")));
    }
    // Range checked above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value as u8)
}

/// Decode a required category code (`1` or `1.0`).
pub(crate) fn code<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    integral_code(value)
}

/// Decode an optional category code; `null` and absent both map to `None`.
pub(crate) fn optional_code<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(value) => integral_code(value).map(Some),
        None => Ok(None),
    }
}

/// Decode a 0–100 score that may arrive as a float.
pub(crate) fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(D::Error::custom(format!("score {value} out of range [0, 100]")));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value.round() as u8)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::code")]
        code: u8,
        #[serde(default, deserialize_with = "super::optional_code")]
        maybe: Option<u8>,
        #[serde(deserialize_with = "super::score")]
        score: u8,
    }

    #[test]
    fn test_accepts_integral_floats() {
        let row: Row = serde_json::from_str(r#"{"code": 2.0, "maybe": 1, "score": 72.0}"#)
            .expect("Should decode");
        assert_eq!(row.code, 2);
        assert_eq!(row.maybe, Some(1));
        assert_eq!(row.score, 72);
    }

    #[test]
    fn test_missing_optional_is_none() {
        let row: Row = serde_json::from_str(r#"{"code": 3, "maybe": null, "score": 0}"#)
            .expect("Should decode");
        assert_eq!(row.maybe, None);

        let row: Row = serde_json::from_str(r#"{"code": 3, "score": 100}"#).expect("Should decode");
        assert_eq!(row.maybe, None);
    }

    #[test]
    fn test_rejects_fractional_and_out_of_range() {
        assert!(serde_json::from_str::<Row>(r#"{"code": 1.5, "score": 10}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"code": -1, "score": 10}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"code": 1, "score": 140}"#).is_err());
    }
}
