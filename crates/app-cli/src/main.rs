use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mailkit_domain::{MimeSubtype, SendRequest};
use mailkit_error::{ErrorResponse, MailError};
use mailkit_gmail::{GmailConfig, GmailTransport, DEFAULT_TIMEOUT_SECS};
use mailkit_messaging::format::{format_batch, format_message, format_receipt, Format};
use mailkit_messaging::{
    parse_message, raw_message_from_rfc822, AttachmentBatch, MailClient, DEFAULT_USER_ID,
};
use tracing::{error, info};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mailkit=info")),
        )
        .compact()
        .init();
}

async fn load_gmail_config() -> Result<GmailConfig, MailError> {
    let mut config = match env::var("MAILKIT_ACCESS_TOKEN") {
        Ok(token) if !token.trim().is_empty() => GmailConfig::new(token),
        _ => {
            let path = env::var("MAILKIT_TOKEN_FILE").unwrap_or_else(|_| "token.json".to_string());
            GmailConfig::from_token_file(Path::new(&path)).await?
        }
    };

    if let Ok(base) = env::var("MAILKIT_API_BASE") {
        config = config.with_api_base(base);
    }
    let timeout = match env::var("MAILKIT_TIMEOUT_SECS") {
        Ok(v) => v
            .parse::<u64>()
            .map_err(|e| MailError::invalid_input(format!("invalid MAILKIT_TIMEOUT_SECS: {e}")))?,
        Err(_) => DEFAULT_TIMEOUT_SECS,
    };
    Ok(config.with_timeout(Duration::from_secs(timeout)))
}

async fn connect() -> Result<MailClient, MailError> {
    let config = load_gmail_config().await?;
    let transport = Arc::new(GmailTransport::new(config)?);
    let user_id = env::var("MAILKIT_USER_ID").unwrap_or_else(|_| DEFAULT_USER_ID.to_string());
    let mut client = MailClient::new().with_user_id(user_id);
    let profile = client.init(transport).await?;
    info!(email = %profile.email_address, "gmail connected");
    Ok(client)
}

/// Positional arguments plus the few `--flag [value]` options the commands take.
#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    html: bool,
    no_overwrite: bool,
    cc: Option<String>,
    bcc: Option<String>,
    attach: Vec<PathBuf>,
    index: usize,
    format: Option<String>,
}

impl Args {
    fn parse(raw: &[String]) -> Result<Self, MailError> {
        let mut args = Args::default();
        let mut iter = raw.iter();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| MailError::invalid_input(format!("{flag} needs a value")))
            };
            match arg.as_str() {
                "--html" => args.html = true,
                "--no-overwrite" => args.no_overwrite = true,
                "--cc" => args.cc = Some(value("--cc")?),
                "--bcc" => args.bcc = Some(value("--bcc")?),
                "--attach" => args.attach.push(PathBuf::from(value("--attach")?)),
                "--format" => args.format = Some(value("--format")?),
                "--index" => {
                    args.index = value("--index")?
                        .parse()
                        .map_err(|e| MailError::invalid_input(format!("invalid --index: {e}")))?
                }
                other if other.starts_with("--") => {
                    return Err(MailError::invalid_input(format!("unknown option {other}")))
                }
                other => args.positional.push(other.to_string()),
            }
        }
        Ok(args)
    }

    fn arg(&self, i: usize, name: &str) -> Result<&str, MailError> {
        self.positional
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| MailError::invalid_input(format!("missing <{name}>")))
    }

    fn fmt(&self) -> Format {
        Format::parse(self.format.as_deref())
    }
}

async fn run_send(args: &Args) -> Result<(), MailError> {
    let mut request = SendRequest::new(args.arg(0, "to")?)
        .subject(args.arg(1, "subject")?)
        .body(args.arg(2, "body")?)
        .mime_subtype(if args.html { MimeSubtype::Html } else { MimeSubtype::Plain });
    request.cc = args.cc.clone();
    request.bcc = args.bcc.clone();
    request.attachments = args.attach.clone();

    let client = connect().await?;
    let receipt = client.send(request).await?;
    println!("{}", format_receipt(&receipt, args.fmt()));
    Ok(())
}

async fn run_read(args: &Args) -> Result<(), MailError> {
    let client = connect().await?;
    let message = client.get_message(args.arg(0, "message-id")?).await?;
    println!("{}", format_message(&message, args.fmt()));
    Ok(())
}

async fn run_attachment(args: &Args) -> Result<(), MailError> {
    let client = connect().await?;
    let message = client.get_message(args.arg(0, "message-id")?).await?;
    let path = client
        .download_attachment(
            &message,
            args.arg(1, "file-name")?,
            Path::new(args.arg(2, "dir")?),
            args.index,
        )
        .await?;
    println!("{}", path.display());
    Ok(())
}

async fn run_attachments(args: &Args) -> Result<(), MailError> {
    let client = connect().await?;
    let message = client.get_message(args.arg(0, "message-id")?).await?;
    let batch = client
        .download_all_attachments(&message, Path::new(args.arg(1, "dir")?), !args.no_overwrite)
        .await?;
    println!("{}", format_batch(&batch, args.fmt()));
    match batch_error(&batch) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Summarizes a partial batch as an error of the same kind as its first failure.
fn batch_error(batch: &AttachmentBatch) -> Option<MailError> {
    let first = batch.failures.first()?;
    let msg = format!(
        "{} of {} attachment(s) failed, first {}: {}",
        batch.failures.len(),
        batch.failures.len() + batch.written.len(),
        first.file_name,
        first.error
    );
    Some(match first.error {
        MailError::InvalidInput(_) => MailError::invalid_input(msg),
        MailError::NotFound(_) => MailError::not_found(msg),
        MailError::Conflict(_) => MailError::conflict(msg),
        MailError::MalformedPayload(_) => MailError::malformed(msg),
        MailError::NotInitialized(_) => MailError::not_initialized(msg),
        MailError::Auth(_) => MailError::auth(msg),
        MailError::Transport(_) => MailError::transport(msg),
        MailError::Io(_) => MailError::io(msg),
        MailError::Internal(_) => MailError::internal(msg),
    })
}

async fn run_parse(args: &Args) -> Result<(), MailError> {
    let path = args.arg(0, "file.eml")?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MailError::io(format!("read {path}: {e}")))?;
    let message = parse_message(&raw_message_from_rfc822(&bytes)?)?;
    println!("{}", format_message(&message, args.fmt()));
    Ok(())
}

fn print_help() {
    eprintln!("mailkit: Gmail message toolkit");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  mailkit send <to> <subject> <body> [--html] [--cc X] [--bcc X] [--attach PATH]...");
    eprintln!("  mailkit read <message-id>");
    eprintln!("  mailkit attachment <message-id> <file-name> <dir> [--index N]");
    eprintln!("  mailkit attachments <message-id> <dir> [--no-overwrite]");
    eprintln!("  mailkit parse <file.eml>");
    eprintln!("  mailkit help");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --format compact|expanded|full   Output format (default: compact)");
    eprintln!();
    eprintln!("Environment variables:");
    eprintln!("  MAILKIT_ACCESS_TOKEN   OAuth access token");
    eprintln!("  MAILKIT_TOKEN_FILE     JSON token file with access_token (default: token.json)");
    eprintln!("  MAILKIT_USER_ID        Gmail user id (default: me)");
    eprintln!("  MAILKIT_API_BASE       Gmail API base URL");
    eprintln!("  MAILKIT_TIMEOUT_SECS   HTTP timeout in seconds (default: 30)");
    eprintln!("  RUST_LOG               Log level (default: mailkit=info)");
}

#[tokio::main]
async fn main() {
    init_tracing();

    let argv: Vec<String> = env::args().skip(1).collect();
    let Some((cmd, rest)) = argv.split_first() else {
        print_help();
        return;
    };

    let args = match Args::parse(rest) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", ErrorResponse::from(&e).to_compact());
            std::process::exit(2);
        }
    };

    let result = match cmd.as_str() {
        "send" => run_send(&args).await,
        "read" => run_read(&args).await,
        "attachment" => run_attachment(&args).await,
        "attachments" => run_attachments(&args).await,
        "parse" => run_parse(&args).await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        unknown => {
            eprintln!("Unknown command: {unknown}");
            eprintln!("Run `mailkit help` for usage");
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        error!(code = e.code(), "command failed");
        eprintln!("{}", ErrorResponse::from(&e).to_compact());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_positionals() {
        let args = Args::parse(&strings(&[
            "a@b.com", "Hi", "--html", "Body", "--cc", "c@d.com", "--attach", "x.pdf", "--attach",
            "y.pdf", "--index", "2",
        ]))
        .unwrap();
        assert_eq!(args.positional, vec!["a@b.com", "Hi", "Body"]);
        assert!(args.html);
        assert_eq!(args.cc.as_deref(), Some("c@d.com"));
        assert_eq!(args.attach, vec![PathBuf::from("x.pdf"), PathBuf::from("y.pdf")]);
        assert_eq!(args.index, 2);
    }

    #[test]
    fn partial_batch_keeps_failure_kind() {
        let mut batch = AttachmentBatch {
            written: vec!["a.txt".into()],
            ..Default::default()
        };
        assert!(batch_error(&batch).is_none());

        batch.failures.push(mailkit_messaging::AttachmentFailure {
            file_name: "b.txt".into(),
            error: MailError::conflict("b.txt already exists"),
        });
        let err = batch_error(&batch).unwrap();
        assert!(matches!(err, MailError::Conflict(ref m) if m.starts_with("1 of 2")));
        let line = ErrorResponse::from(&err).to_compact();
        assert!(line.starts_with("[CONFLICT]"));
        assert!(!line.contains("retryable"));
    }

    #[test]
    fn rejects_unknown_and_incomplete_options() {
        assert!(matches!(
            Args::parse(&strings(&["--bogus"])).unwrap_err(),
            MailError::InvalidInput(_)
        ));
        assert!(matches!(
            Args::parse(&strings(&["--cc"])).unwrap_err(),
            MailError::InvalidInput(ref m) if m.contains("--cc")
        ));
        let args = Args::parse(&[]).unwrap();
        assert!(args.arg(0, "to").is_err());
    }
}
