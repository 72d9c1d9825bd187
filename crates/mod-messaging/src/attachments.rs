use std::path::{Path, PathBuf};

use mailkit_domain::{AttachmentInfo, Message, Transport};
use mailkit_error::MailError;
use tracing::{info, warn};

use crate::codec::decode_base64;

/// Outcome of a bulk download. One failed attachment does not stop the others.
#[derive(Debug, Default)]
pub struct AttachmentBatch {
    pub written: Vec<String>,
    pub failures: Vec<AttachmentFailure>,
}

impl AttachmentBatch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug)]
pub struct AttachmentFailure {
    pub file_name: String,
    pub error: MailError,
}

/// Downloads the `duplicate_index`-th attachment named `file_name` into `dest`.
pub async fn fetch_attachment(
    transport: &dyn Transport,
    user_id: &str,
    message: &Message,
    file_name: &str,
    dest: &Path,
    duplicate_index: usize,
) -> Result<PathBuf, MailError> {
    if !message.has_attachment(file_name) {
        return Err(MailError::not_found(format!(
            "no attachment named '{file_name}' found among {:?}",
            message.attachment_names()
        )));
    }
    let attachment = message.attachment(file_name, duplicate_index).ok_or_else(|| {
        MailError::not_found(format!(
            "no attachment named '{file_name}' with duplicate index {duplicate_index}"
        ))
    })?;

    ensure_dir(dest).await?;
    let target = dest.join(safe_file_name(file_name)?);
    let bytes = download(transport, user_id, message, attachment).await?;
    write_file(&target, &bytes).await?;

    info!(
        message_id = message.id.as_deref().unwrap_or(""),
        file_name,
        duplicate_index,
        bytes = bytes.len(),
        path = %target.display(),
        "attachment downloaded"
    );
    Ok(target)
}

/// Downloads every attachment of `message` into `dest`, one at a time.
///
/// With `overwrite == false`, shared file names fail the whole call before any
/// download, and files already present in `dest` are reported as conflicts.
pub async fn fetch_all_attachments(
    transport: &dyn Transport,
    user_id: &str,
    message: &Message,
    dest: &Path,
    overwrite: bool,
) -> Result<AttachmentBatch, MailError> {
    if !overwrite {
        let dups = message.duplicate_attachment_names();
        if !dups.is_empty() {
            return Err(MailError::conflict(format!(
                "duplicate attachment file names {dups:?}; pass overwrite=true to download them anyway"
            )));
        }
    }

    ensure_dir(dest).await?;

    let mut batch = AttachmentBatch::default();
    for attachment in message.attachments() {
        let file_name = attachment.file_name.clone();
        match fetch_one(transport, user_id, message, attachment, dest, overwrite).await {
            Ok(bytes) => {
                info!(file_name, bytes, "attachment downloaded");
                batch.written.push(file_name);
            }
            Err(error) => {
                warn!(file_name, %error, "attachment download failed");
                batch.failures.push(AttachmentFailure { file_name, error });
            }
        }
    }

    info!(
        message_id = message.id.as_deref().unwrap_or(""),
        written = batch.written.len(),
        failed = batch.failures.len(),
        "attachments downloaded"
    );
    Ok(batch)
}

async fn fetch_one(
    transport: &dyn Transport,
    user_id: &str,
    message: &Message,
    attachment: &AttachmentInfo,
    dest: &Path,
    overwrite: bool,
) -> Result<usize, MailError> {
    let target = dest.join(safe_file_name(&attachment.file_name)?);
    if !overwrite && exists(&target).await? {
        return Err(MailError::conflict(format!(
            "{} already exists",
            target.display()
        )));
    }
    let bytes = download(transport, user_id, message, attachment).await?;
    write_file(&target, &bytes).await?;
    Ok(bytes.len())
}

async fn exists(path: &Path) -> Result<bool, MailError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| MailError::io(format!("stat {}: {e}", path.display())))
}

async fn download(
    transport: &dyn Transport,
    user_id: &str,
    message: &Message,
    attachment: &AttachmentInfo,
) -> Result<Vec<u8>, MailError> {
    let what = format!("attachment '{}'", attachment.file_name);
    match (&attachment.attachment_id, &attachment.data) {
        (Some(attachment_id), _) => {
            let message_id = message
                .id
                .as_deref()
                .ok_or_else(|| MailError::malformed("message has no id to fetch attachments from"))?;
            let data = transport
                .fetch_attachment_bytes(message_id, attachment_id, user_id)
                .await?;
            decode_base64(&data, &what)
        }
        (None, Some(data)) => decode_base64(data, &what),
        (None, None) => Err(MailError::malformed(format!(
            "{what} has neither an attachment id nor inline data"
        ))),
    }
}

/// Rejects names that would escape the destination folder.
fn safe_file_name(file_name: &str) -> Result<&str, MailError> {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| *n == file_name)
        .ok_or_else(|| {
            MailError::invalid_input(format!("attachment name '{file_name}' is not a plain file name"))
        })
}

async fn ensure_dir(dest: &Path) -> Result<(), MailError> {
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(MailError::invalid_input(format!(
            "{} is a file, not a folder",
            dest.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| MailError::io(format!("mkdir {}: {e}", dest.display()))),
        Err(e) => Err(MailError::io(format!("stat {}: {e}", dest.display()))),
    }
}

async fn write_file(target: &Path, bytes: &[u8]) -> Result<(), MailError> {
    tokio::fs::write(target, bytes)
        .await
        .map_err(|e| MailError::io(format!("write {}: {e}", target.display())))
}
