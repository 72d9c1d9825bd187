//! Bridge from RFC 822 text (`.eml` files, `format=raw` fetches, our own
//! composer output) to the provider payload shape the parser consumes.

use mailkit_domain::{Header, MessagePart, PartBody, RawMessage};
use mailkit_error::MailError;
use mailparse::{MailHeaderMap, ParsedMail};

use crate::codec::{decode_base64, encode_base64url};

pub fn raw_message_from_rfc822(bytes: &[u8]) -> Result<RawMessage, MailError> {
    let parsed =
        mailparse::parse_mail(bytes).map_err(|e| MailError::malformed(format!("rfc822: {e}")))?;

    let internal_date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .map(|secs| (secs * 1000).to_string());

    Ok(RawMessage {
        internal_date,
        payload: Some(convert_part(&parsed, String::new())?),
        ..Default::default()
    })
}

/// Same as [`raw_message_from_rfc822`] for the base64 `raw` field of an
/// outbound or `format=raw` message.
pub fn raw_message_from_base64(raw: &str) -> Result<RawMessage, MailError> {
    raw_message_from_rfc822(&decode_base64(raw, "raw")?)
}

fn convert_part(part: &ParsedMail<'_>, part_id: String) -> Result<MessagePart, MailError> {
    let headers = part
        .headers
        .iter()
        .map(|h| Header::new(h.get_key(), h.get_value()))
        .collect();

    let disposition = part.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned()
        .unwrap_or_default();

    let (body, parts) = if part.subparts.is_empty() {
        let mut content = part
            .get_body_raw()
            .map_err(|e| MailError::malformed(format!("rfc822 part {part_id}: {e}")))?;
        if part.ctype.mimetype.starts_with("text/") {
            strip_line_terminator(&mut content);
        }
        let body = PartBody {
            attachment_id: None,
            size: content.len() as u64,
            data: Some(encode_base64url(&content)),
        };
        (body, None)
    } else {
        let parts = part
            .subparts
            .iter()
            .enumerate()
            .map(|(i, sub)| {
                let id = if part_id.is_empty() {
                    i.to_string()
                } else {
                    format!("{part_id}.{i}")
                };
                convert_part(sub, id)
            })
            .collect::<Result<Vec<_>, _>>()?;
        (PartBody::default(), Some(parts))
    };

    Ok(MessagePart {
        part_id: Some(part_id),
        mime_type: Some(part.ctype.mimetype.clone()),
        filename: Some(filename),
        headers: Some(headers),
        body: Some(body),
        parts,
    })
}

/// Drops the one line break that ends a serialized text body.
fn strip_line_terminator(content: &mut Vec<u8>) {
    if content.ends_with(b"\r\n") {
        content.truncate(content.len() - 2);
    } else if content.ends_with(b"\n") {
        content.truncate(content.len() - 1);
    }
}
