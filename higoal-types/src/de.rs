//! Lenient field deserializers
//!
//! The cloud is inconsistent about whether ids are JSON strings or numbers.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Integer(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
        }
    }
}

/// String, number or null as a string (null becomes empty)
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?
        .map(StringOrNumber::into_string)
        .unwrap_or_default())
}

/// String, number or null as an optional string (null or empty becomes `None`)
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?
        .map(StringOrNumber::into_string)
        .filter(|s| !s.is_empty()))
}

/// Integer or numeric string as an integer
pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Integer(n) => Ok(n),
        StringOrNumber::Float(n) if n.fract() == 0.0 => Ok(n as i64),
        StringOrNumber::Float(n) => Err(D::Error::custom(format!("expected an integer, got {n}"))),
        StringOrNumber::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "string")]
        text: String,
        #[serde(default, deserialize_with = "optional_string")]
        maybe: Option<String>,
        #[serde(default, deserialize_with = "integer")]
        number: i64,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_string_accepts_numbers_and_null() {
        assert_eq!(sample(r#"{"text": "abc"}"#).text, "abc");
        assert_eq!(sample(r#"{"text": 1234}"#).text, "1234");
        assert_eq!(sample(r#"{"text": null}"#).text, "");
        assert_eq!(sample("{}").text, "");
    }

    #[test]
    fn test_optional_string() {
        assert_eq!(sample(r#"{"maybe": 7}"#).maybe.as_deref(), Some("7"));
        assert_eq!(sample(r#"{"maybe": ""}"#).maybe, None);
        assert_eq!(sample(r#"{"maybe": null}"#).maybe, None);
    }

    #[test]
    fn test_integer_accepts_numeric_strings() {
        assert_eq!(sample(r#"{"number": 5}"#).number, 5);
        assert_eq!(sample(r#"{"number": "17"}"#).number, 17);
        assert!(serde_json::from_str::<Sample>(r#"{"number": "x"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"number": 1.5}"#).is_err());
    }
}
