use std::sync::OnceLock;

use regex::Regex;

#[allow(clippy::expect_used)]
fn reply_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?m)^On (?:Sun|Mon|Tue|Wed|Thu|Fri|Sat), ",
            r"(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) \d+, \d{4} ",
            r"at \d+:\d+[ \x{202F}](?:AM|PM) .*? wrote:",
        ))
        .expect("static reply header pattern")
    })
}

/// Text before the first "On <date> at <time> <author> wrote:" line, with
/// trailing whitespace trimmed. Input without such a line comes back untouched.
pub fn strip_quoted_reply(text: &str) -> String {
    match reply_header_re().find(text) {
        Some(m) => text[..m.start()].trim_end().to_string(),
        None => text.to_string(),
    }
}
