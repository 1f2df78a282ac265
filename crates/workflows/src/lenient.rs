//! Field-level decoding helpers for loosely typed JSON producers.
//!
//! `#[serde(default)]` only covers absent keys. These helpers extend that to
//! `null` values and, for [`default_on_invalid`], to values of the wrong type,
//! so one bad field never fails the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Decodes `null` as `T::default()`.
pub fn default_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes `null` or a value that does not fit `T` as `T::default()`.
///
/// The input must still be well-formed JSON.
pub fn default_on_invalid<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Loose {
        #[serde(deserialize_with = "default_on_invalid")]
        count: Option<u64>,
        #[serde(deserialize_with = "default_on_null")]
        tags: Vec<String>,
    }

    #[test]
    fn test_wrong_type_becomes_default() {
        let loose: Loose = serde_json::from_str(r#"{"count":"five","tags":["a"]}"#).unwrap();
        assert_eq!(loose.count, None);
        assert_eq!(loose.tags, vec!["a"]);
    }

    #[test]
    fn test_null_becomes_default() {
        let loose: Loose = serde_json::from_str(r#"{"count":null,"tags":null}"#).unwrap();
        assert_eq!(loose.count, None);
        assert!(loose.tags.is_empty());
    }

    #[test]
    fn test_null_only_helper_still_rejects_wrong_type() {
        assert!(serde_json::from_str::<Loose>(r#"{"tags":"a"}"#).is_err());
    }
}
