use std::fmt;
use std::path::Path;
use std::time::Duration;

use mailkit_error::MailError;
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct GmailConfig {
    pub access_token: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl fmt::Debug for GmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmailConfig")
            .field("access_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Token file as persisted by the OAuth flow; only the access token is used.
#[derive(Deserialize)]
struct TokenFile {
    access_token: Option<String>,
}

impl GmailConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub async fn from_token_file(path: &Path) -> Result<Self, MailError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MailError::not_initialized(format!("token file {} not found", path.display()))
            } else {
                MailError::io(format!("read {}: {e}", path.display()))
            }
        })?;
        let token: TokenFile = serde_json::from_str(&text)
            .map_err(|e| MailError::invalid_input(format!("token file {}: {e}", path.display())))?;
        let access_token = token
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                MailError::not_initialized(format!("token file {} has no access_token", path.display()))
            })?;
        Ok(Self::new(access_token))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_access_token_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"ya29.abc","refresh_token":"1//x","scope":"https://mail.google.com/","token_type":"Bearer","expiry_date":1704297900000}"#,
        )
        .unwrap();

        let cfg = GmailConfig::from_token_file(&path).await.unwrap();
        assert_eq!(cfg.access_token, "ya29.abc");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[tokio::test]
    async fn missing_token_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let err = GmailConfig::from_token_file(&dir.path().join("token.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NotInitialized(_)));

        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"refresh_token":"1//x"}"#).unwrap();
        let err = GmailConfig::from_token_file(&path).await.unwrap_err();
        assert!(matches!(err, MailError::NotInitialized(ref m) if m.contains("access_token")));
    }

    #[test]
    fn debug_output_hides_access_token() {
        let cfg = GmailConfig::new("ya29.secret");
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("ya29.secret"));
        assert!(shown.contains("<redacted>"));
        assert!(shown.contains(DEFAULT_API_BASE));
    }

    #[test]
    fn api_base_drops_trailing_slash() {
        let cfg = GmailConfig::new("t").with_api_base("http://localhost:8080/users/");
        assert_eq!(cfg.api_base, "http://localhost:8080/users");
    }
}
