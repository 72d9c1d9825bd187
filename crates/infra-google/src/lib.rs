mod adapter;
mod config;

pub use adapter::GmailTransport;
pub use config::{GmailConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
