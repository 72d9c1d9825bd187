use chrono::{DateTime, Utc};
use mailkit_domain::{Message, SentReceipt};

use crate::attachments::AttachmentBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Compact,
    Expanded,
    Full,
}

impl Format {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("full") => Self::Full,
            Some("expanded") => Self::Expanded,
            _ => Self::Compact,
        }
    }
}

pub fn format_message(msg: &Message, fmt: Format) -> String {
    match fmt {
        Format::Compact => format_message_line(msg, 200),
        Format::Expanded => {
            let mut lines = vec![format_message_line(msg, 0)];
            if let Some(ref body) = msg.body {
                lines.push(String::new());
                lines.push(body.replace('\r', ""));
            }
            lines.join("\n")
        }
        Format::Full => to_json(msg),
    }
}

pub fn format_receipt(receipt: &SentReceipt, fmt: Format) -> String {
    match fmt {
        Format::Compact | Format::Expanded => {
            let mut parts = vec![format!("sent id:{}", receipt.id)];
            if let Some(ref t) = receipt.thread_id {
                parts.push(format!("thread:{t}"));
            }
            if !receipt.label_ids.is_empty() {
                parts.push(format!("labels:{}", receipt.label_ids.join(",")));
            }
            parts.join(" ")
        }
        Format::Full => to_json(receipt),
    }
}

pub fn format_batch(batch: &AttachmentBatch, fmt: Format) -> String {
    match fmt {
        Format::Compact | Format::Expanded => {
            let mut lines: Vec<String> = Vec::with_capacity(batch.written.len() + batch.failures.len() + 1);
            lines.push(format!(
                "{} written, {} failed:",
                batch.written.len(),
                batch.failures.len()
            ));
            for name in &batch.written {
                lines.push(format!("  ok {name}"));
            }
            for f in &batch.failures {
                lines.push(format!("  FAILED {} [{}] {}", f.file_name, f.error.code(), f.error));
            }
            lines.join("\n")
        }
        Format::Full => {
            let failures: Vec<serde_json::Value> = batch
                .failures
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "file_name": f.file_name,
                        "code": f.error.code(),
                        "message": f.error.to_string(),
                    })
                })
                .collect();
            to_json(&serde_json::json!({
                "written": batch.written,
                "failures": failures,
            }))
        }
    }
}

fn format_message_line(msg: &Message, max_text: usize) -> String {
    let ts = format_timestamp(msg.timestamp);
    let sender = msg.sender.as_deref().unwrap_or("unknown");
    let text = msg.body.as_deref().or(msg.snippet.as_deref()).unwrap_or("");
    let text = if max_text > 0 { truncate(text, max_text) } else { clean_text(text) };

    let mut extras = String::new();
    if let Some(ref s) = msg.subject {
        let subj = if max_text > 0 { truncate(s, 60) } else { clean_text(s) };
        extras.push_str(&format!(" subj:{subj}"));
    }
    let names = msg.attachment_names();
    if !names.is_empty() {
        extras.push_str(&format!(" +attach[{}]", names.join(",")));
    }
    if let Some(ref t) = msg.thread_id {
        extras.push_str(&format!(" thread:{t}"));
    }

    format!(
        "  [{ts}] {sender}: {text}{extras} (id:{id})",
        id = msg.id.as_deref().unwrap_or("-"),
    )
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(dt) => dt.format("%b %d %H:%M").to_string(),
        None => "invalid date".to_string(),
    }
}

fn clean_text(s: &str) -> String {
    let clean: String = s.chars().filter(|c| *c != '\r').collect();
    clean.replace('\n', " ")
}

fn truncate(s: &str, max: usize) -> String {
    let oneline = clean_text(s);
    if oneline.chars().count() > max {
        let truncated: String = oneline.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        oneline
    }
}

fn to_json<T: serde::Serialize + ?Sized>(val: &T) -> String {
    serde_json::to_string(val).unwrap_or_else(|e| format!("serialization error: {e}"))
}
