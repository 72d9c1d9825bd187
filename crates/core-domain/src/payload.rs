//! Provider payload shapes, as delivered by `users.messages.get?format=full`.
//!
//! Structural fields are optional; the parser validates them and names the
//! missing one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    /// Epoch milliseconds as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<PartBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<MessagePart>>,
}

impl MessagePart {
    pub fn is_mime_type(&self, mime: &str) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(mime))
    }

    /// Last `name` header of this part, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Base64 (URL-safe alphabet from the provider) encoded content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Response of `users.messages.attachments.get`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentBody {
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_provider_shape() {
        let json = r#"{
            "id": "m1",
            "threadId": "t1",
            "snippet": "hi",
            "historyId": "42",
            "internalDate": "1704297900000",
            "labelIds": ["INBOX"],
            "sizeEstimate": 123,
            "payload": {
                "mimeType": "text/plain",
                "filename": "",
                "headers": [{"name": "Subject", "value": "Hello"}],
                "body": {"size": 5, "data": "SGVsbG8"}
            }
        }"#;
        let raw: RawMessage = serde_json::from_str(json).unwrap();
        assert_eq!(raw.thread_id.as_deref(), Some("t1"));
        assert_eq!(raw.label_ids, vec!["INBOX".to_string()]);
        let payload = raw.payload.unwrap();
        assert!(payload.is_mime_type("TEXT/PLAIN"));
        assert_eq!(payload.header("subject"), Some("Hello"));
        assert_eq!(payload.data(), Some("SGVsbG8"));
    }

    #[test]
    fn header_lookup_prefers_last_occurrence() {
        let part = MessagePart {
            headers: Some(vec![
                Header::new("Content-Type", "text/plain; charset=\"us-ascii\""),
                Header::new("content-type", "text/plain; charset=\"iso-8859-1\""),
            ]),
            ..Default::default()
        };
        assert_eq!(
            part.header("Content-Type"),
            Some("text/plain; charset=\"iso-8859-1\"")
        );
    }
}
