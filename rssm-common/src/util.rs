//! Shared helpers for log hygiene.

/// Longest payload excerpt written to logs.
pub const LOG_EXCERPT_CHARS: usize = 200;

/// Keys and flags whose values never reach the logs.
const SENSITIVE_KEYS: &[&str] = &[
    "AWS_SECRET_ACCESS_KEY=",
    "AWS_ACCESS_KEY_ID=",
    "AWS_SESSION_TOKEN=",
    "DATABASE_URL=",
    "DB_PASSWORD=",
    "MYSQL_PWD=",
    "PGPASSWORD=",
    "API_KEY=",
    "SECRET_KEY=",
    "PASSWORD=",
    "TOKEN=",
    "SECRET=",
    "--password=",
    "--password ",
    "--token=",
    "--token ",
    "--secret=",
    "--secret ",
    "--api-key=",
    "--api-key ",
];

/// Byte length of the shell word at the start of `s`, honouring quotes and escapes.
fn shell_word_len(s: &str) -> usize {
    let mut len = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '"' || c == '\'' {
            quote = Some(c);
        } else if c.is_whitespace() {
            break;
        }
        len += c.len_utf8();
    }
    len
}

/// Mask secrets in a shell command before it is logged.
///
/// The key or flag is kept and its value becomes `***`. Quoted values are
/// masked as a whole.
pub fn mask_sensitive_command(cmd: &str) -> String {
    let mut result = cmd.to_string();

    for key in SENSITIVE_KEYS {
        let mut from = 0;
        while let Some(found) = result[from..].find(key) {
            let value_start = from + found + key.len();
            let value_end = value_start + shell_word_len(&result[value_start..]);
            if value_end == value_start {
                from = value_start;
                continue;
            }
            result.replace_range(value_start..value_end, "***");
            from = value_start + 3;
        }
    }

    result
}

/// First `max_chars` characters of `text` with a marker when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... ({} more bytes)", &text[..cut], text.len() - cut),
        None => text.to_string(),
    }
}
