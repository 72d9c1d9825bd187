use chrono::{DateTime, Utc};
use mailkit_error::MailError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeSubtype {
    #[default]
    Plain,
    Html,
}

impl fmt::Display for MimeSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Html => write!(f, "html"),
        }
    }
}

impl FromStr for MimeSubtype {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            other => Err(MailError::invalid_input(format!(
                "mime subtype must be 'plain' or 'html', got '{other}'"
            ))),
        }
    }
}

/// Metadata for one attachment part. Content is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentInfo {
    pub file_name: String,
    /// Opaque reference resolved by the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64 content the provider inlined instead of handing out an id.
    #[serde(skip)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// `None` when the provider's epoch value is missing or not a number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Full decoded plain-text body, quoted replies included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_body: Option<String>,
    /// `original_body` up to the quoted reply header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(
        rename = "attachments",
        serialize_with = "serialize_attachment_names",
        skip_serializing_if = "Vec::is_empty"
    )]
    attachments: Vec<AttachmentInfo>,
}

impl Message {
    pub fn with_attachments(mut self, attachments: Vec<AttachmentInfo>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Attachment records in the order their parts appear.
    pub fn attachments(&self) -> &[AttachmentInfo] {
        &self.attachments
    }

    /// File names of all attachments, duplicates included.
    pub fn attachment_names(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .map(|a| a.file_name.as_str())
            .collect()
    }

    pub fn has_attachment(&self, file_name: &str) -> bool {
        self.attachments.iter().any(|a| a.file_name == file_name)
    }

    /// The `duplicate_index`-th attachment named `file_name`, counting from 0.
    pub fn attachment(&self, file_name: &str, duplicate_index: usize) -> Option<&AttachmentInfo> {
        self.attachments
            .iter()
            .filter(|a| a.file_name == file_name)
            .nth(duplicate_index)
    }

    /// Names that more than one attachment shares, in first-seen order.
    pub fn duplicate_attachment_names(&self) -> Vec<&str> {
        let mut dups: Vec<&str> = Vec::new();
        for (i, a) in self.attachments.iter().enumerate() {
            let name = a.file_name.as_str();
            if dups.contains(&name) {
                continue;
            }
            if self.attachments[i + 1..].iter().any(|b| b.file_name == name) {
                dups.push(name);
            }
        }
        dups
    }

    pub fn senders(&self) -> Vec<&str> {
        self.sender.as_deref().into_iter().collect()
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

fn serialize_attachment_names<S: Serializer>(
    attachments: &[AttachmentInfo],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(attachments.iter().map(|a| a.file_name.as_str()))
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_default();
        let timestamp = self
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "invalid".to_string());
        write!(
            f,
            "Message (from: {} to: {} timestamp: {timestamp} subject: {} snippet: {})",
            show(&self.sender),
            show(&self.recipient),
            show(&self.subject),
            show(&self.snippet),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    /// Defaults to the authenticated account's address when sent through a client.
    pub sender: Option<String>,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub mime_subtype: MimeSubtype,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub attachments: Vec<PathBuf>,
    /// Only set when replying inside an existing thread.
    pub thread_id: Option<String>,
}

impl SendRequest {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            ..Default::default()
        }
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn mime_subtype(mut self, mime_subtype: MimeSubtype) -> Self {
        self.mime_subtype = mime_subtype;
        self
    }

    pub fn cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    pub fn bcc(mut self, bcc: impl Into<String>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }

    pub fn attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }
}

/// Reply content; recipient, subject and thread come from the replied-to message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyRequest {
    pub body: Option<String>,
    pub mime_subtype: MimeSubtype,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub attachments: Vec<PathBuf>,
}

impl ReplyRequest {
    /// Builds the send request answering `original`.
    pub fn into_send_request(self, original: &Message) -> Result<SendRequest, MailError> {
        let recipient = original
            .sender
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| MailError::invalid_input("cannot reply: message has no sender"))?;
        Ok(SendRequest {
            sender: None,
            recipient,
            subject: original.subject.clone(),
            body: self.body,
            mime_subtype: self.mime_subtype,
            cc: self.cc,
            bcc: self.bcc,
            attachments: self.attachments,
            thread_id: original.thread_id.clone(),
        })
    }
}

/// Payload handed to the transport: `{"raw": .., "threadId": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentReceipt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, id: &str) -> AttachmentInfo {
        AttachmentInfo {
            file_name: name.to_string(),
            attachment_id: Some(id.to_string()),
            size_bytes: 10,
            mime_type: None,
            data: None,
        }
    }

    #[test]
    fn mime_subtype_rejects_unknown_values() {
        assert_eq!("plain".parse::<MimeSubtype>().unwrap(), MimeSubtype::Plain);
        assert_eq!("html".parse::<MimeSubtype>().unwrap(), MimeSubtype::Html);
        let err = "rtf".parse::<MimeSubtype>().unwrap_err();
        assert!(matches!(err, MailError::InvalidInput(_)));
    }

    #[test]
    fn attachment_lookup_by_duplicate_index() {
        let msg = Message::default().with_attachments(vec![
            attachment("report.pdf", "a1"),
            attachment("notes.txt", "a2"),
            attachment("report.pdf", "a3"),
        ]);
        assert_eq!(msg.attachment_names(), vec!["report.pdf", "notes.txt", "report.pdf"]);
        assert_eq!(
            msg.attachment("report.pdf", 1).and_then(|a| a.attachment_id.as_deref()),
            Some("a3")
        );
        assert!(msg.attachment("report.pdf", 2).is_none());
        assert!(msg.attachment("missing", 0).is_none());
        assert_eq!(msg.duplicate_attachment_names(), vec!["report.pdf"]);
    }

    #[test]
    fn serializes_attachment_names_only() {
        let msg = Message {
            id: Some("m1".into()),
            ..Default::default()
        }
        .with_attachments(vec![attachment("a.txt", "x")]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["attachments"], serde_json::json!(["a.txt"]));
        assert!(json.get("body").is_none());
    }

    #[test]
    fn reply_targets_sender_and_thread() {
        let original = Message {
            sender: Some("Alice <alice@example.com>".into()),
            subject: Some("Lunch".into()),
            thread_id: Some("t-9".into()),
            ..Default::default()
        };
        let req = ReplyRequest {
            body: Some("Sure".into()),
            ..Default::default()
        }
        .into_send_request(&original)
        .unwrap();
        assert_eq!(req.recipient, "Alice <alice@example.com>");
        assert_eq!(req.subject.as_deref(), Some("Lunch"));
        assert_eq!(req.thread_id.as_deref(), Some("t-9"));
    }

    #[test]
    fn reply_without_sender_is_invalid() {
        let err = ReplyRequest::default()
            .into_send_request(&Message::default())
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidInput(_)));
    }

    #[test]
    fn display_marks_invalid_timestamp() {
        let msg = Message {
            sender: Some("a@b.com".into()),
            ..Default::default()
        };
        assert!(msg.to_string().contains("timestamp: invalid"));
    }
}
