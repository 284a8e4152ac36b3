//! # mailthread
//!
//! A library for reconstructing conversation trees ("threads") from a flat
//! collection of email-like messages, using only identifier-reference
//! metadata, per the algorithm described at
//! <http://www.jwz.org/doc/threading.html>.
//!
//! ## Design Philosophy
//!
//! The core is a pure, synchronous graph transformation:
//! - **No I/O**: callers supply already-parsed [`Message`] records and get
//!   back a [`Forest`] of linked containers for their own rendering and
//!   sorting. Thin adapters in [`parse`] cover the common mbox/RFC-822 case.
//! - **No timestamps**: threading relies exclusively on declared reference
//!   chains (plus an optional subject-based merge); presentation order is
//!   the caller's concern via [`sort_threads`].
//! - **Arena-backed trees**: containers live in an arena addressed by
//!   copyable [`ContainerId`] handles, so parent back-references are plain
//!   indices and deep reply chains never recurse.
//!
//! ## Example
//!
//! ```rust
//! use mailthread::{thread, Message};
//!
//! let messages: Vec<Message> = vec![
//!     Message::new("a@example.com", "Meeting notes"),
//!     Message::new("b@example.com", "Re: Meeting notes")
//!         .with_references(["a@example.com"]),
//! ];
//!
//! let forest = thread(messages, true);
//! assert_eq!(forest.len(), 1);
//!
//! let root = forest.roots()[0];
//! assert_eq!(forest.message(root).unwrap().subject, "Meeting notes");
//! assert_eq!(forest.size(root), 2);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod algorithm;
pub mod container;
pub mod error;
pub mod message;
pub mod parse;
pub mod utils;

pub use algorithm::{prune_container, sort_threads, thread};
pub use container::{Container, ContainerId, Forest, Outline};
pub use error::{Error, Result};
pub use message::Message;
