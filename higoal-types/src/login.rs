//! Sign-in response records

use serde::{Deserialize, Serialize};

use crate::de;

/// Envelope wrapping every API response body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "repData")]
    pub rep_data: Option<T>,
}

/// `repData` of `POST /login`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub uid: Option<String>,

    #[serde(default, deserialize_with = "de::optional_string")]
    pub token: Option<String>,

    #[serde(default)]
    pub home_list: Vec<HomeRecord>,
}

impl LoginData {
    /// Ids of all homes, empty ids dropped
    pub fn home_ids(&self) -> Vec<String> {
        self.home_list
            .iter()
            .filter(|home| !home.id.is_empty())
            .map(|home| home.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HomeRecord {
    #[serde(default, deserialize_with = "de::string")]
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_login_numeric_ids() {
        let body = r#"{"repData": {"uid": 42, "token": "abcd", "homeList": [{"id": 7}, {"id": "8"}]}}"#;
        let envelope: ApiEnvelope<LoginData> = serde_json::from_str(body).unwrap();
        let data = envelope.rep_data.unwrap();

        assert_eq!(data.uid.as_deref(), Some("42"));
        assert_eq!(data.token.as_deref(), Some("abcd"));
        assert_eq!(data.home_ids(), vec!["7".to_string(), "8".to_string()]);
    }

    #[test]
    fn test_login_missing_token() {
        let body = r#"{"repData": {"uid": "42"}}"#;
        let envelope: ApiEnvelope<LoginData> = serde_json::from_str(body).unwrap();
        let data = envelope.rep_data.unwrap();

        assert_eq!(data.token, None);
        assert!(data.home_ids().is_empty());
    }

    #[test]
    fn test_missing_rep_data() {
        let envelope: ApiEnvelope<LoginData> =
            serde_json::from_str(r#"{"code": 1, "msg": "bad password"}"#).unwrap();
        assert_eq!(envelope.rep_data, None);
    }
}
