use async_trait::async_trait;
use mailkit_domain::{
    AttachmentBody, OutboundMessage, Profile, RawMessage, SentReceipt, Transport,
};
use mailkit_error::MailError;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::GmailConfig;

/// Gmail REST v1 transport authorized with a bearer access token.
pub struct GmailTransport {
    config: GmailConfig,
    http: Client,
}

impl GmailTransport {
    pub fn new(config: GmailConfig) -> Result<Self, MailError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailError::internal(format!("http client: {e}")))?;
        Ok(Self { config, http })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, MailError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| MailError::invalid_input(format!("api base '{}': {e}", self.config.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| MailError::invalid_input(format!("api base '{}' cannot have a path", self.config.api_base)))?
            .extend(segments);
        Ok(url)
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, MailError> {
        debug!(url = %url, "gmail GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.config.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| MailError::transport(format!("gmail request failed: {e}")))?;
        read_response(resp).await
    }

    async fn api_post_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, MailError> {
        debug!(url = %url, "gmail POST json");
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| MailError::transport(format!("gmail request failed: {e}")))?;
        read_response(resp).await
    }
}

async fn read_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, MailError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| MailError::transport(format!("gmail read body: {e}")))?;

    if !status.is_success() {
        return Err(parse_api_error(&body, status.as_u16()));
    }

    serde_json::from_str(&body)
        .map_err(|e| MailError::transport(format!("gmail parse response: {e}")))
}

fn parse_api_error(body: &str, status: u16) -> MailError {
    #[derive(Deserialize)]
    struct GoogleErrorResp {
        error: Option<GoogleErrorDetail>,
    }
    #[derive(Deserialize)]
    struct GoogleErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let detail = serde_json::from_str::<GoogleErrorResp>(body)
        .ok()
        .and_then(|r| r.error)
        .map(|d| {
            let msg = d.message.unwrap_or_else(|| body.to_string());
            match d.status {
                Some(s) => format!("{s}: {msg}"),
                None => msg,
            }
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => MailError::auth(format!("gmail auth failed ({status}): {detail}")),
        404 => MailError::not_found(format!("gmail ({status}): {detail}")),
        _ => MailError::transport(format!("gmail error ({status}): {detail}")),
    }
}

#[async_trait]
impl Transport for GmailTransport {
    async fn send_raw_message(
        &self,
        message: &OutboundMessage,
        user_id: &str,
    ) -> Result<SentReceipt, MailError> {
        let url = self.url(&[user_id, "messages", "send"])?;
        let receipt: SentReceipt = self.api_post_json(url, message).await?;
        debug!(id = %receipt.id, "gmail message sent");
        Ok(receipt)
    }

    async fn fetch_attachment_bytes(
        &self,
        message_id: &str,
        attachment_id: &str,
        user_id: &str,
    ) -> Result<String, MailError> {
        let url = self.url(&[user_id, "messages", message_id, "attachments", attachment_id])?;
        let body: AttachmentBody = self.api_get(url, &[]).await?;
        debug!(message_id, size = body.size, "gmail attachment fetched");
        Ok(body.data)
    }

    async fn fetch_message(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> Result<RawMessage, MailError> {
        let url = self.url(&[user_id, "messages", message_id])?;
        self.api_get(url, &[("format", "full")]).await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Profile, MailError> {
        let url = self.url(&[user_id, "profile"])?;
        self.api_get(url, &[]).await
    }
}
