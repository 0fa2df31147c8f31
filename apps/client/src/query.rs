//! Query input — the form state a user fills in and the request it turns into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// How many recommendations to ask for. Only 5 through 10 are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TopK(u8);

impl TopK {
    pub const CHOICES: [u8; 6] = [5, 6, 7, 8, 9, 10];

    pub fn new(value: u8) -> Result<Self, ClientError> {
        if Self::CHOICES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ClientError::InvalidTopK(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for TopK {
    type Error = ClientError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TopK> for u8 {
    fn from(value: TopK) -> Self {
        value.0
    }
}

impl FromStr for TopK {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("'{s}' is not a number between 5 and 10"))?;
        Self::new(value).map_err(|e| e.to_string())
    }
}

impl fmt::Display for TopK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request body for `POST /recommend`. Absent fields go over the wire as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    pub query_text: Option<String>,
    pub query_url: Option<String>,
    pub top_k: TopK,
}

/// The three fields of the input form. Nothing here touches the network.
#[derive(Debug, Clone, Default)]
pub struct QueryInput {
    text: String,
    url: String,
    top_k: TopK,
}

impl QueryInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn set_top_k(&mut self, top_k: TopK) {
        self.top_k = top_k;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn top_k(&self) -> TopK {
        self.top_k
    }

    /// Resets every field to its initial value.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Packages the current fields into a fresh `Query`.
    ///
    /// Empty strings become `None`. Whitespace is kept as typed, and having
    /// both or neither of text and URL is allowed; the service decides.
    pub fn submit(&self) -> Query {
        Query {
            query_text: non_empty(&self.text),
            query_url: non_empty(&self.url),
            top_k: self.top_k,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_k_accepts_every_choice() {
        for k in TopK::CHOICES {
            assert_eq!(TopK::new(k).unwrap().get(), k);
        }
    }

    #[test]
    fn test_top_k_rejects_out_of_range() {
        for k in [0u8, 4, 11, 255] {
            assert!(matches!(TopK::new(k), Err(ClientError::InvalidTopK(v)) if v == k));
        }
    }

    #[test]
    fn test_top_k_default_is_five() {
        assert_eq!(TopK::default().get(), 5);
    }

    #[test]
    fn test_top_k_from_str() {
        assert_eq!("7".parse::<TopK>().unwrap().get(), 7);
        assert!("12".parse::<TopK>().is_err());
        assert!("many".parse::<TopK>().is_err());
    }

    #[test]
    fn test_top_k_deserialize_validates() {
        assert!(serde_json::from_str::<TopK>("8").is_ok());
        assert!(serde_json::from_str::<TopK>("3").is_err());
    }

    #[test]
    fn test_submit_with_empty_fields_yields_absent_query() {
        let query = QueryInput::new().submit();
        assert_eq!(
            query,
            Query {
                query_text: None,
                query_url: None,
                top_k: TopK::default(),
            }
        );
    }

    #[test]
    fn test_submit_keeps_both_fields() {
        let mut input = QueryInput::new();
        input.set_text("Java developer who collaborates with business teams");
        input.set_url("https://example.com/jobs/42");
        input.set_top_k(TopK::new(9).unwrap());

        let query = input.submit();
        assert_eq!(
            query.query_text.as_deref(),
            Some("Java developer who collaborates with business teams")
        );
        assert_eq!(query.query_url.as_deref(), Some("https://example.com/jobs/42"));
        assert_eq!(query.top_k.get(), 9);
    }

    #[test]
    fn test_whitespace_is_not_treated_as_empty() {
        let mut input = QueryInput::new();
        input.set_text("   ");
        assert_eq!(input.submit().query_text.as_deref(), Some("   "));
    }

    #[test]
    fn test_submit_does_not_consume_form_state() {
        let mut input = QueryInput::new();
        input.set_text("analyst");
        let first = input.submit();
        input.set_text("engineer");
        let second = input.submit();
        assert_eq!(first.query_text.as_deref(), Some("analyst"));
        assert_eq!(second.query_text.as_deref(), Some("engineer"));
    }

    #[test]
    fn test_clear_resets_fields() {
        let mut input = QueryInput::new();
        input.set_text("analyst");
        input.set_top_k(TopK::new(10).unwrap());
        input.clear();
        assert_eq!(input.text(), "");
        assert_eq!(input.top_k(), TopK::default());
    }

    #[test]
    fn test_query_serializes_absent_fields_as_null() {
        let query = Query {
            query_text: Some("sales role".to_string()),
            query_url: None,
            top_k: TopK::new(6).unwrap(),
        };
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(
            body,
            json!({ "query_text": "sales role", "query_url": null, "top_k": 6 })
        );
    }
}
