//! SQL `LIKE` emulation on top of the `regex` crate.
//!
//! A LIKE pattern is translated into an anchored regex and evaluated
//! case-insensitively against the subject:
//!
//! | LIKE        | Regex        |
//! |-------------|--------------|
//! | `_`         | `.`          |
//! | `%`         | `.*`         |
//! | `<esc>_`    | `_`          |
//! | `<esc>%`    | `%`          |
//! | `<esc>`     | *(dropped)*  |
//! | metachar    | `\` metachar |
//!
//! The body is wrapped as `\A<body>\s*\z`, so trailing whitespace in the
//! subject never causes a mismatch.
//!
//! Evaluation runs on a worker thread and is abandoned once the match
//! budget ([`REGEX_TIMEOUT`] by default) runs out.

use crate::error::{LikeError, LikeResult};

use crossbeam_channel::RecvTimeoutError;
use regex::RegexBuilder;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Characters that carry meaning in regex syntax and must be neutralized.
pub const REGEX_SPECIAL_CHARS: [char; 12] =
    ['.', '$', '^', '{', '[', '(', '|', ')', '*', '+', '?', '\\'];

/// Wall-clock budget for a single match.
pub const REGEX_TIMEOUT: Duration = Duration::from_millis(1000);

/// Compiled program size cap (same as the `regex` crate default).
pub const DEFAULT_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Limits applied to one `LIKE` evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub timeout: Duration,
    pub size_limit: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            timeout: REGEX_TIMEOUT,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

impl MatchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }
}

/// Normalize an escape argument to a single character.
///
/// `None` and `""` mean no escape. Longer strings are truncated to their
/// first character.
pub fn escape_char(escape: Option<&str>) -> Option<char> {
    escape.and_then(|e| e.chars().next())
}

/// Evaluate `subject LIKE pattern ESCAPE escape` with the default limits.
///
/// # Example
///
/// ```
/// use querylike::like_match;
///
/// assert!(like_match(Some("hello world"), Some("HELLO%"), None).unwrap());
/// assert!(like_match(Some("100%"), Some(r"100\%"), Some(r"\")).unwrap());
/// assert!(!like_match(None, Some("x"), None).unwrap());
/// ```
pub fn like_match(
    subject: Option<&str>,
    pattern: Option<&str>,
    escape: Option<&str>,
) -> LikeResult<bool> {
    like_match_with(&MatchOptions::default(), subject, pattern, escape)
}

/// Evaluate `subject LIKE pattern ESCAPE escape` under explicit limits.
pub fn like_match_with(
    options: &MatchOptions,
    subject: Option<&str>,
    pattern: Option<&str>,
    escape: Option<&str>,
) -> LikeResult<bool> {
    let escape = escape_char(escape);

    let (Some(subject), Some(pattern)) = (subject, pattern) else {
        return Ok(false);
    };

    if eq_ignore_case(subject, pattern) {
        return Ok(true);
    }

    if subject.is_empty() || pattern.is_empty() {
        return Ok(false);
    }

    let regex = like_to_regex(pattern, escape);
    debug!(pattern, ?escape, %regex, "translated LIKE pattern");

    is_match_within(options, pattern, regex, subject)
}

/// Translate a LIKE pattern into the anchored regex source.
///
/// The result depends only on the arguments.
pub fn like_to_regex(pattern: &str, escape: Option<char>) -> String {
    let neutralized = escape_regex_chars(pattern, escape);

    let mut re = String::with_capacity(neutralized.len() + 8);
    re.push_str(r"\A");

    let mut prev: Option<char> = None;
    for c in neutralized.chars() {
        let escaped = escape.is_some() && prev == escape;
        match c {
            '_' => re.push(if escaped { '_' } else { '.' }),
            '%' => re.push_str(if escaped { "%" } else { ".*" }),
            c if Some(c) == escape => {}
            c => re.push(c),
        }
        prev = Some(c);
    }

    re.push_str(r"\s*\z");
    re
}

/// Prefix every regex metacharacter with `\`, leaving the escape character alone.
fn escape_regex_chars(pattern: &str, escape: Option<char>) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        if Some(c) != escape && REGEX_SPECIAL_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Ordinal comparison after simple uppercase mapping.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars().map(fold_case).eq(b.chars().map(fold_case))
}

fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

fn is_match_within(
    options: &MatchOptions,
    pattern: &str,
    regex: String,
    subject: &str,
) -> LikeResult<bool> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let subject = subject.to_owned();
    let size_limit = options.size_limit;
    let started = Instant::now();

    thread::Builder::new()
        .name("like-match".to_string())
        .spawn(move || {
            let result = RegexBuilder::new(&regex)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .size_limit(size_limit)
                .build()
                .map(|re| re.is_match(&subject));
            // Receiver is gone if the caller already timed out.
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(options.timeout) {
        Ok(result) => {
            trace!(elapsed = ?started.elapsed(), "LIKE evaluation finished");
            Ok(result?)
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                pattern,
                budget_ms = options.timeout.as_millis() as u64,
                "LIKE evaluation exceeded its budget"
            );
            Err(LikeError::PatternTimeout {
                pattern: pattern.to_string(),
                budget_ms: options.timeout.as_millis(),
            })
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(LikeError::eval("LIKE worker exited without a result"))
        }
    }
}
