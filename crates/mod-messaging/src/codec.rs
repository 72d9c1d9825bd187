use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use mailkit_error::MailError;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes provider base64: URL-safe or standard alphabet, padded or not,
/// line breaks ignored.
pub fn decode_base64(data: &str, what: &str) -> Result<Vec<u8>, MailError> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    LENIENT
        .decode(normalized)
        .map_err(|e| MailError::malformed(format!("{what}: invalid base64: {e}")))
}

pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_alphabets() {
        // 0xfb 0xff encodes to "+/8=" (standard) and "-_8=" (url-safe)
        assert_eq!(decode_base64("+/8=", "t").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("-_8", "t").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("SGVs\r\nbG8=", "t").unwrap(), b"Hello".to_vec());
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_base64("@@@", "payload.body.data").unwrap_err();
        assert!(matches!(err, MailError::MalformedPayload(ref m) if m.starts_with("payload.body.data")));
    }
}
