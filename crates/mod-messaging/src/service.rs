use std::path::{Path, PathBuf};
use std::sync::Arc;

use mailkit_domain::{Message, Profile, ReplyRequest, SendRequest, SentReceipt, Transport};
use mailkit_error::MailError;
use tracing::info;

use crate::attachments::{fetch_all_attachments, fetch_attachment, AttachmentBatch};
use crate::composer::compose;
use crate::parser::parse_message;

pub const DEFAULT_USER_ID: &str = "me";

/// Entry point tying the message model to a provider transport.
pub struct MailClient {
    transport: Option<Arc<dyn Transport>>,
    user_id: String,
    profile: Option<Profile>,
}

impl Default for MailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MailClient {
    pub fn new() -> Self {
        Self {
            transport: None,
            user_id: DEFAULT_USER_ID.to_string(),
            profile: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Attaches an authorized transport and loads the account profile.
    pub async fn init(&mut self, transport: Arc<dyn Transport>) -> Result<&Profile, MailError> {
        let profile = transport.get_profile(&self.user_id).await?;
        info!(email = %profile.email_address, user_id = %self.user_id, "mail client ready");
        self.transport = Some(transport);
        Ok(&*self.profile.insert(profile))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email_address(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.email_address.as_str())
    }

    pub fn logged_in(&self) -> bool {
        self.email_address().is_some_and(|e| !e.is_empty())
    }

    fn transport(&self) -> Result<&Arc<dyn Transport>, MailError> {
        self.transport
            .as_ref()
            .ok_or_else(|| MailError::not_initialized("no transport; call init first"))
    }

    pub async fn send(&self, mut request: SendRequest) -> Result<SentReceipt, MailError> {
        let transport = self.transport()?;
        if request.sender.as_deref().map_or(true, |s| s.trim().is_empty()) {
            request.sender = self.email_address().map(str::to_string);
        }
        let outbound = compose(&request).await?;
        let receipt = transport.send_raw_message(&outbound, &self.user_id).await?;
        info!(
            to = %request.recipient,
            id = %receipt.id,
            thread_id = receipt.thread_id.as_deref().unwrap_or(""),
            attachments = request.attachments.len(),
            "email sent"
        );
        Ok(receipt)
    }

    /// Replies to the sender of `original` inside its thread.
    pub async fn reply(
        &self,
        original: &Message,
        reply: ReplyRequest,
    ) -> Result<SentReceipt, MailError> {
        self.transport()?;
        self.send(reply.into_send_request(original)?).await
    }

    pub async fn get_message(&self, message_id: &str) -> Result<Message, MailError> {
        validate_not_empty(message_id, "message id")?;
        let raw = self
            .transport()?
            .fetch_message(message_id, &self.user_id)
            .await?;
        parse_message(&raw)
    }

    pub async fn download_attachment(
        &self,
        message: &Message,
        file_name: &str,
        dest: &Path,
        duplicate_index: usize,
    ) -> Result<PathBuf, MailError> {
        let transport = self.transport()?;
        fetch_attachment(
            transport.as_ref(),
            &self.user_id,
            message,
            file_name,
            dest,
            duplicate_index,
        )
        .await
    }

    pub async fn download_all_attachments(
        &self,
        message: &Message,
        dest: &Path,
        overwrite: bool,
    ) -> Result<AttachmentBatch, MailError> {
        let transport = self.transport()?;
        fetch_all_attachments(transport.as_ref(), &self.user_id, message, dest, overwrite).await
    }
}

fn validate_not_empty(val: &str, name: &str) -> Result<(), MailError> {
    if val.trim().is_empty() {
        return Err(MailError::invalid_input(format!("{name} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::tests::MockTransport;
    use crate::rfc822::raw_message_from_base64;

    async fn ready(transport: Arc<MockTransport>) -> MailClient {
        let mut client = MailClient::new();
        client.init(transport).await.unwrap();
        client
    }

    #[tokio::test]
    async fn operations_require_init() {
        let client = MailClient::new();
        assert!(!client.logged_in());

        let err = client.send(SendRequest::new("a@b.com")).await.unwrap_err();
        assert!(matches!(err, MailError::NotInitialized(_)));

        let err = client.get_message("m1").await.unwrap_err();
        assert!(matches!(err, MailError::NotInitialized(_)));

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never-created");
        let err = client
            .download_all_attachments(&Message::default(), &dest, true)
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NotInitialized(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn send_defaults_sender_to_account() {
        let transport = Arc::new(MockTransport::default());
        let client = ready(transport.clone()).await;
        assert!(client.logged_in());

        let receipt = client
            .send(SendRequest::new("a@b.com").subject("Hi").body("Hello"))
            .await
            .unwrap();
        assert_eq!(receipt.id, "sent-1");

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let msg = parse_message(&raw_message_from_base64(&sent[0].raw).unwrap()).unwrap();
        assert_eq!(msg.sender.as_deref(), Some("me@example.com"));
        assert_eq!(msg.recipient.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn missing_attachment_sends_nothing() {
        let transport = Arc::new(MockTransport::default());
        let client = ready(transport.clone()).await;

        let err = client
            .send(SendRequest::new("a@b.com").attachment("/no/such/file"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NotFound(ref m) if m.contains("/no/such/file")));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_reaches_caller_unchanged() {
        let transport = Arc::new(MockTransport {
            send_fails: true,
            ..Default::default()
        });
        let client = ready(transport.clone()).await;

        let err = client
            .send(SendRequest::new("a@b.com").body("Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Transport(ref m) if m.contains("503")));
        assert!(mailkit_error::ErrorResponse::from(&err).retryable);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reply_goes_to_sender_in_thread() {
        let transport = Arc::new(MockTransport::default());
        let client = ready(transport.clone()).await;
        let mut original = Message::default();
        original.sender = Some("Alice <alice@example.com>".into());
        original.subject = Some("Plans".into());
        original.thread_id = Some("t-1".into());

        let receipt = client
            .reply(
                &original,
                ReplyRequest {
                    body: Some("Works for me".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.thread_id.as_deref(), Some("t-1"));

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent[0].thread_id.as_deref(), Some("t-1"));
        let msg = parse_message(&raw_message_from_base64(&sent[0].raw).unwrap()).unwrap();
        assert_eq!(msg.recipient.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(msg.subject.as_deref(), Some("Plans"));
    }

    #[tokio::test]
    async fn get_message_parses_transport_payload() {
        let raw = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "threadId": "t1",
            "payload": {"headers": [{"name": "Subject", "value": "Fetched"}]}
        }))
        .unwrap();
        let mut transport = MockTransport::default();
        transport.messages.insert("m1".into(), raw);
        let client = ready(Arc::new(transport)).await;

        let msg = client.get_message("m1").await.unwrap();
        assert_eq!(msg.subject.as_deref(), Some("Fetched"));
        assert!(matches!(
            client.get_message("nope").await.unwrap_err(),
            MailError::NotFound(_)
        ));
        assert!(matches!(
            client.get_message(" ").await.unwrap_err(),
            MailError::InvalidInput(_)
        ));
    }
}
