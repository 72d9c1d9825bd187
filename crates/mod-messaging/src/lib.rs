//! Message model for the Gmail API: parsing provider payloads into
//! [`Message`](mailkit_domain::Message) values and composing raw MIME
//! payloads from [`SendRequest`](mailkit_domain::SendRequest)s.

pub mod attachments;
pub mod charset;
mod codec;
pub mod composer;
pub mod format;
pub mod parser;
pub mod quote;
pub mod rfc822;
mod service;

pub use attachments::{fetch_all_attachments, fetch_attachment, AttachmentBatch, AttachmentFailure};
pub use charset::{decode_text, resolve_charset};
pub use codec::{decode_base64, encode_base64url};
pub use composer::compose;
pub use parser::{parse_json, parse_message};
pub use quote::strip_quoted_reply;
pub use rfc822::{raw_message_from_base64, raw_message_from_rfc822};
pub use service::{MailClient, DEFAULT_USER_ID};
