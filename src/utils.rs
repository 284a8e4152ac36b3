//! Utility functions for reference handling and subject normalization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches one `<...>` delimited Message-ID, capturing the id itself.
pub(crate) static MSGID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^>]+)>").expect("valid regex"));

/// Matches one reply or tag marker anchored at the start of a subject:
/// `Re:`, `Re[2]:`, or a bracketed `[tag]`, plus any trailing whitespace.
static SUBJECT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(re(\[\d+\])?:|\[[^\]]+\])\s*").expect("valid regex"));

/// Deduplicate an id sequence, preserving first-occurrence order.
///
/// # Example
///
/// ```
/// use mailthread::utils::unique;
///
/// let ids = unique(["a", "b", "a", "c", "b"].map(String::from));
/// assert_eq!(ids, vec!["a", "b", "c"]);
/// ```
pub fn unique<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Extract Message-IDs from a raw References-style header value.
///
/// Every `<...>` delimited id is collected (oldest first), deduplicated
/// with first-occurrence order preserved. The angle brackets themselves
/// are stripped.
///
/// # Example
///
/// ```
/// use mailthread::utils::parse_references;
///
/// let refs = parse_references("<a@x.com> <b@x.com> <a@x.com>");
/// assert_eq!(refs, vec!["a@x.com", "b@x.com"]);
///
/// assert!(parse_references("").is_empty());
/// ```
pub fn parse_references(header: &str) -> Vec<String> {
    unique(
        MSGID_RE
            .captures_iter(header)
            .map(|cap| cap[1].to_string()),
    )
}

/// Strip reply and tag decoration from the start of a subject line.
///
/// Repeatedly removes a leading `Re:`, `Re[2]:`-style marker, or a
/// bracketed `[tag]` prefix (case-insensitive) until no more matches
/// remain, one anchored match per iteration. This produces the canonical
/// key used to group threads whose reference headers are missing or
/// broken.
///
/// # Example
///
/// ```
/// use mailthread::utils::normalize_subject;
///
/// assert_eq!(normalize_subject("Hello World"), "Hello World");
/// assert_eq!(normalize_subject("Re: Hello World"), "Hello World");
/// assert_eq!(normalize_subject("Re[2]: re: Hello World"), "Hello World");
/// assert_eq!(normalize_subject("[users] Re: Hello World"), "Hello World");
/// ```
pub fn normalize_subject(subject: &str) -> String {
    let mut rest = subject;
    while let Some(m) = SUBJECT_PREFIX_RE.find(rest) {
        rest = &rest[m.end()..];
    }
    rest.to_string()
}
