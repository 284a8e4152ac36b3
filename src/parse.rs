//! Adapters turning raw mail into [`Message`] records.
//!
//! The threading core never reads raw headers; these helpers sit at the
//! input boundary and produce records matching the [`Message`] contract:
//! a usable identifier, a deduplicated oldest-first reference list built
//! from References plus In-Reply-To, and a subject line. A record without
//! a usable Message-ID yields [`Error::MissingMessageId`], which callers
//! are free to skip.

use once_cell::sync::Lazy;
use regex::bytes;
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::utils::{parse_references, MSGID_RE};

/// Matches an mbox `From ` separator line, e.g.
/// `From user@example.com Thu Jan  7 12:55:58 2010`.
static MBOX_DELIMITER_RE: Lazy<bytes::Regex> = Lazy::new(|| {
    bytes::Regex::new(r"(?m)^From \S+ +\w{3} \w{3} +\d+ \d{2}:\d{2}:\d{2} \d{4}[^\n]*\n")
        .expect("valid regex")
});

/// Header metadata carried as the payload of a parsed message.
///
/// The threading algorithm never looks at this; it exists so callers can
/// render or post-sort threads without re-parsing the source archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Sender address from the From header.
    pub from: Option<String>,
    /// Date header as an RFC 3339 string.
    pub date: Option<String>,
}

/// Build a [`Message`] from a raw RFC-822 message.
///
/// Extracts the Message-ID, the References chain (deduplicated, oldest
/// first) with the In-Reply-To id appended if not already present, and
/// the subject (`"No subject"` when absent). `index` records the
/// message's position in its source archive.
///
/// # Errors
///
/// Returns [`Error::MissingMessageId`] if no `<...>` delimited Message-ID
/// can be found; such records cannot participate in threading.
pub fn message_from_rfc822(raw: &[u8], index: Option<usize>) -> Result<Message<Envelope>> {
    let parsed = mail_parser::MessageParser::default()
        .parse(raw)
        .ok_or(Error::MissingMessageId)?;

    let message_id = match parsed.message_id() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => parsed
            .header_raw("Message-ID")
            .and_then(|raw| MSGID_RE.captures(raw))
            .map(|cap| cap[1].to_string())
            .ok_or(Error::MissingMessageId)?,
    };

    let mut references = parsed
        .header_raw("References")
        .map(parse_references)
        .unwrap_or_default();
    if let Some(reply) = parsed
        .header_raw("In-Reply-To")
        .and_then(|raw| MSGID_RE.captures(raw))
        .map(|cap| cap[1].to_string())
    {
        if !references.contains(&reply) {
            references.push(reply);
        }
    }

    let subject = parsed.subject().unwrap_or("No subject").to_string();
    let envelope = Envelope {
        from: parsed
            .from()
            .and_then(|addr| addr.first())
            .and_then(|a| a.address())
            .map(|s| s.to_string()),
        date: parsed.date().map(|d| d.to_rfc3339()),
    };

    let mut msg = Message::new(message_id, subject)
        .with_references(references)
        .with_payload(envelope);
    msg.index = index;
    Ok(msg)
}

/// Parse a Unix mbox archive into threadable messages.
///
/// Splits the archive on `From ` separator lines and parses each entry.
/// Records without a usable Message-ID are skipped (and logged), matching
/// how real archives are consumed: a handful of malformed entries must
/// not abort the run. Message indices count every entry, skipped or not.
pub fn parse_mbox(data: &[u8]) -> Vec<Message<Envelope>> {
    let starts: Vec<(usize, usize)> = MBOX_DELIMITER_RE
        .find_iter(data)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut messages = Vec::with_capacity(starts.len());
    for (idx, &(_, body_start)) in starts.iter().enumerate() {
        let body_end = starts
            .get(idx + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(data.len());
        match message_from_rfc822(&data[body_start..body_end], Some(idx)) {
            Ok(msg) => messages.push(msg),
            Err(err) => debug!(index = idx, %err, "skipping unthreadable mbox entry"),
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_rfc822() {
        let raw = b"Subject: random\r\n\
Message-ID: <message1@example.com>\r\n\
References: <ref1@example.com> <ref2@example.com> <ref1@example.com>\r\n\
In-Reply-To: <reply@example.com>\r\n\
From: Someone <someone@example.com>\r\n\
Date: Thu, 07 Jan 2010 12:55:58 +0000\r\n\
\r\n\
Body.\r\n";

        let msg = message_from_rfc822(raw, Some(3)).unwrap();
        assert_eq!(msg.message_id, "message1@example.com");
        assert_eq!(msg.subject, "random");
        assert_eq!(
            msg.references,
            vec!["ref1@example.com", "ref2@example.com", "reply@example.com"]
        );
        assert_eq!(msg.index, Some(3));

        let envelope = msg.payload.unwrap();
        assert_eq!(envelope.from.as_deref(), Some("someone@example.com"));
        assert!(envelope.date.is_some());
    }

    #[test]
    fn test_message_from_rfc822_in_reply_to_already_referenced() {
        let raw = b"Subject: random\r\n\
Message-ID: <message1@example.com>\r\n\
References: <ref1@example.com> <ref2@example.com>\r\n\
In-Reply-To: <ref2@example.com>\r\n\
\r\n\
Body.\r\n";

        let msg = message_from_rfc822(raw, None).unwrap();
        assert_eq!(msg.references, vec!["ref1@example.com", "ref2@example.com"]);
    }

    #[test]
    fn test_message_from_rfc822_missing_id() {
        let raw = b"Subject: random\r\n\r\nBody.\r\n";
        assert_eq!(
            message_from_rfc822(raw, None).unwrap_err(),
            Error::MissingMessageId
        );
    }

    #[test]
    fn test_message_from_rfc822_missing_subject() {
        let raw = b"Message-ID: <message1@example.com>\r\n\r\nBody.\r\n";
        let msg = message_from_rfc822(raw, None).unwrap();
        assert_eq!(msg.subject, "No subject");
    }

    #[test]
    fn test_parse_mbox() {
        let data = b"From alice@example.com Thu Jan  7 12:55:58 2010\n\
Subject: Hello\n\
Message-ID: <one@example.com>\n\
\n\
First body.\n\
From - Thu Sep  3 12:58:15 2015\n\
Subject: Re: Hello\n\
Message-ID: <two@example.com>\n\
In-Reply-To: <one@example.com>\n\
\n\
Second body.\n";

        let messages = parse_mbox(data);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_id, "one@example.com");
        assert_eq!(messages[0].index, Some(0));
        assert_eq!(messages[1].message_id, "two@example.com");
        assert_eq!(messages[1].references, vec!["one@example.com"]);
        assert_eq!(messages[1].index, Some(1));
    }

    #[test]
    fn test_parse_mbox_skips_malformed_entries() {
        let data = b"From alice@example.com Thu Jan  7 12:55:58 2010\n\
Subject: No id here\n\
\n\
Body.\n\
From bob@example.com Thu Jan  7 13:00:00 2010\n\
Subject: Fine\n\
Message-ID: <ok@example.com>\n\
\n\
Body.\n";

        let messages = parse_mbox(data);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id, "ok@example.com");
        // Indices still count the skipped entry.
        assert_eq!(messages[0].index, Some(1));
    }

    #[test]
    fn test_parse_mbox_empty() {
        assert!(parse_mbox(b"").is_empty());
        assert!(parse_mbox(b"not an mbox at all\n").is_empty());
    }
}
