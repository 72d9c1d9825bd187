use async_trait::async_trait;
use mailkit_error::MailError;

use crate::entities::{OutboundMessage, Profile, SentReceipt};
use crate::payload::RawMessage;

/// Provider-side capabilities the message model relies on.
///
/// Implementations own timeouts and cancellation; faults are returned, never retried here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_raw_message(
        &self,
        message: &OutboundMessage,
        user_id: &str,
    ) -> Result<SentReceipt, MailError>;

    /// Base64 content of one attachment.
    async fn fetch_attachment_bytes(
        &self,
        message_id: &str,
        attachment_id: &str,
        user_id: &str,
    ) -> Result<String, MailError>;

    async fn fetch_message(&self, message_id: &str, user_id: &str)
        -> Result<RawMessage, MailError>;

    async fn get_profile(&self, user_id: &str) -> Result<Profile, MailError>;
}
