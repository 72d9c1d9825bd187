use std::sync::OnceLock;

use encoding_rs::Encoding;
use mailkit_error::MailError;
use regex::Regex;

pub const DEFAULT_CHARSET: &str = "utf-8";

#[allow(clippy::expect_used)]
fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|;)\s*charset\s*=\s*(?:"([^"]+)"|([^\s;"]+))"#).expect("static charset pattern")
    })
}

/// Charset named by a `Content-Type` value, `utf-8` when there is none.
///
/// The value is returned verbatim; unknown names fail later, in [`decode_text`].
pub fn resolve_charset(content_type: &str) -> String {
    charset_re()
        .captures(content_type)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Decodes `bytes` as `charset`. Invalid sequences become U+FFFD.
pub fn decode_text(bytes: &[u8], charset: &str) -> Result<String, MailError> {
    let encoding = Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| MailError::malformed(format!("unsupported charset '{charset}'")))?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}
