use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mailkit_domain::{AttachmentInfo, Message, MessagePart, RawMessage};
use mailkit_error::MailError;
use tracing::debug;

use crate::charset::{decode_text, resolve_charset, DEFAULT_CHARSET};
use crate::codec::decode_base64;
use crate::quote::strip_quoted_reply;

/// Parses a `users.messages.get` JSON document.
pub fn parse_json(json: &str) -> Result<Message, MailError> {
    let raw: RawMessage = serde_json::from_str(json)
        .map_err(|e| MailError::malformed(format!("message json: {e}")))?;
    parse_message(&raw)
}

pub fn parse_message(raw: &RawMessage) -> Result<Message, MailError> {
    let payload = raw
        .payload
        .as_ref()
        .ok_or_else(|| MailError::malformed("missing field 'payload'"))?;
    let headers = top_level_headers(payload)?;

    let mut msg = Message::default();
    msg.id = raw.id.clone();
    msg.thread_id = raw.thread_id.clone();
    msg.history_id = raw.history_id.clone();
    msg.label_ids = raw.label_ids.clone();
    msg.snippet = raw.snippet.clone();
    msg.timestamp = parse_internal_date(raw.internal_date.as_deref());
    msg.sender = headers.get("FROM").cloned();
    msg.recipient = headers.get("TO").cloned();
    msg.subject = headers.get("SUBJECT").cloned();

    let mut attachments = Vec::new();
    match payload.parts.as_deref() {
        None => {
            if let Some(data) = payload.data() {
                let charset = headers
                    .get("CONTENT-TYPE")
                    .map(|ct| resolve_charset(ct))
                    .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
                set_body(&mut msg, decode_body(data, &charset, "payload.body.data")?);
            }
        }
        Some(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if let Some(text) = plain_text(part, &format!("payload.parts[{i}]"))? {
                    set_body(&mut msg, text);
                }

                if part.is_mime_type("multipart/alternative") {
                    for (j, sub) in part.parts.as_deref().unwrap_or_default().iter().enumerate() {
                        if let Some(text) = plain_text(sub, &format!("payload.parts[{i}].parts[{j}]"))? {
                            set_body(&mut msg, text);
                        }
                    }
                }

                if let Some(info) = attachment_info(part) {
                    attachments.push(info);
                }
            }
        }
    }

    debug!(
        id = msg.id.as_deref().unwrap_or(""),
        has_body = msg.body.is_some(),
        attachments = attachments.len(),
        "parsed message"
    );
    Ok(msg.with_attachments(attachments))
}

/// One pass over the top-level headers; keys uppercased, later duplicates win.
fn top_level_headers(payload: &MessagePart) -> Result<HashMap<String, String>, MailError> {
    let headers = payload
        .headers
        .as_ref()
        .ok_or_else(|| MailError::malformed("missing field 'payload.headers'"))?;
    Ok(headers
        .iter()
        .map(|h| (h.name.to_ascii_uppercase(), h.value.clone()))
        .collect())
}

fn parse_internal_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}

/// Decoded text of a `text/plain` part that carries data.
fn plain_text(part: &MessagePart, path: &str) -> Result<Option<String>, MailError> {
    if !part.is_mime_type("text/plain") {
        return Ok(None);
    }
    let Some(data) = part.data() else {
        return Ok(None);
    };
    let charset = part
        .header("Content-Type")
        .map(resolve_charset)
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
    decode_body(data, &charset, &format!("{path}.body.data")).map(Some)
}

fn decode_body(data: &str, charset: &str, path: &str) -> Result<String, MailError> {
    let bytes = decode_base64(data, path)?;
    decode_text(&bytes, charset)
}

fn set_body(msg: &mut Message, text: String) {
    msg.body = Some(strip_quoted_reply(&text));
    msg.original_body = Some(text);
}

fn attachment_info(part: &MessagePart) -> Option<AttachmentInfo> {
    let file_name = part.filename.as_deref().filter(|f| !f.is_empty())?;
    let body = part.body.clone().unwrap_or_default();
    Some(AttachmentInfo {
        file_name: file_name.to_string(),
        attachment_id: body.attachment_id,
        size_bytes: body.size,
        mime_type: part.mime_type.clone(),
        data: body.data,
    })
}
