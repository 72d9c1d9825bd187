use std::path::{Path, PathBuf};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Mailboxes, MultiPart, SinglePart};
use mailkit_domain::{MimeSubtype, OutboundMessage, SendRequest};
use mailkit_error::MailError;
use tracing::debug;

use crate::codec::encode_base64url;

/// Builds the provider payload for `request`: the formatted MIME message,
/// base64url encoded, plus the thread to reply into.
pub async fn compose(request: &SendRequest) -> Result<OutboundMessage, MailError> {
    if request.recipient.trim().is_empty() {
        return Err(MailError::invalid_input("recipient cannot be empty"));
    }
    let sender = request
        .sender
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| MailError::invalid_input("sender is required"))?;

    let files = read_attachments(&request.attachments).await?;

    let mut builder = lettre::Message::builder().from(parse_mailbox(sender, "sender")?);
    for mbox in parse_mailboxes(&request.recipient, "recipient")? {
        builder = builder.to(mbox);
    }
    if let Some(cc) = request.cc.as_deref().filter(|s| !s.trim().is_empty()) {
        for mbox in parse_mailboxes(cc, "cc")? {
            builder = builder.cc(mbox);
        }
    }
    if let Some(bcc) = request.bcc.as_deref().filter(|s| !s.trim().is_empty()) {
        for mbox in parse_mailboxes(bcc, "bcc")? {
            builder = builder.bcc(mbox);
        }
        // the provider delivers Bcc copies from the raw header
        builder = builder.keep_bcc();
    }
    if let Some(subject) = request.subject.as_deref() {
        builder = builder.subject(subject);
    }

    let body = request.body.clone().unwrap_or_default();
    let body_part = match request.mime_subtype {
        MimeSubtype::Plain => SinglePart::plain(body),
        MimeSubtype::Html => SinglePart::html(body),
    };

    let email = if files.is_empty() {
        builder
            .singlepart(body_part)
            .map_err(|e| MailError::internal(format!("email build: {e}")))?
    } else {
        let mut multi = MultiPart::mixed().singlepart(body_part);
        for file in files {
            let ct = guess_content_type(&file.path);
            multi = multi.singlepart(Attachment::new(file.name).body(file.content, ct));
        }
        builder
            .multipart(multi)
            .map_err(|e| MailError::internal(format!("email build: {e}")))?
    };

    let formatted = email.formatted();
    debug!(
        bytes = formatted.len(),
        attachments = request.attachments.len(),
        mime_subtype = %request.mime_subtype,
        "composed message"
    );

    Ok(OutboundMessage {
        raw: encode_base64url(&formatted),
        thread_id: request.thread_id.clone(),
    })
}

struct AttachmentFile {
    path: PathBuf,
    name: String,
    content: Vec<u8>,
}

async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<AttachmentFile>, MailError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let resolved = std::path::absolute(path).unwrap_or_else(|_| path.clone());
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(MailError::invalid_input(format!(
                    "attachment {} is not a file",
                    resolved.display()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MailError::not_found(format!(
                    "attachment file {} does not exist",
                    resolved.display()
                )))
            }
            Err(e) => {
                return Err(MailError::io(format!("stat {}: {e}", resolved.display())))
            }
        }

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| MailError::io(format!("read {}: {e}", resolved.display())))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();
        files.push(AttachmentFile {
            path: path.clone(),
            name,
            content,
        });
    }
    Ok(files)
}

fn parse_mailbox(value: &str, field: &str) -> Result<Mailbox, MailError> {
    value
        .trim()
        .parse()
        .map_err(|e| MailError::invalid_input(format!("invalid {field} '{value}': {e}")))
}

fn parse_mailboxes(value: &str, field: &str) -> Result<Mailboxes, MailError> {
    value
        .trim()
        .parse()
        .map_err(|e| MailError::invalid_input(format!("invalid {field} '{value}': {e}")))
}

fn guess_content_type(path: &Path) -> ContentType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "doc" | "docx" => "application/msword",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        _ => "application/octet-stream",
    };

    mime.parse().unwrap_or(ContentType::TEXT_PLAIN)
}
