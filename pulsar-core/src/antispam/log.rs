// File: src/antispam/log.rs

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};

use pulsar_common::models::{MessageAttachment, MessageEvent};

/// SHA-512 digest of a message's attachment filenames followed by its text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 64]);

impl Fingerprint {
    pub fn compute(content: &str, attachments: &[MessageAttachment]) -> Self {
        let mut sha = Sha512::new();
        for attachment in attachments {
            sha.update(attachment.filename.as_bytes());
        }
        sha.update(content.as_bytes());

        let mut digest = [0u8; 64];
        digest.copy_from_slice(&sha.finalize());
        Self(digest)
    }

    pub fn of_message(message: &MessageEvent) -> Self {
        Self::compute(&message.content, &message.attachments)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first few bytes are plenty to tell entries apart in logs.
        write!(f, "Fingerprint({}..)", hex::encode(&self.0[..6]))
    }
}

/// One observed message, as kept in the recent-message ring.
///
/// Everything except `consumed` is fixed at creation. `consumed` flips once,
/// when remediation acts on the entry, and excludes it from later matches.
#[derive(Debug)]
pub struct LogEntry {
    pub message_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub fingerprint: Fingerprint,
    consumed: AtomicBool,
}

impl LogEntry {
    pub fn new(message: &MessageEvent, fingerprint: Fingerprint) -> Self {
        Self {
            message_id: message.message_id.clone(),
            channel_id: message.channel_id.clone(),
            author_id: message.author_id.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            fingerprint,
            consumed: AtomicBool::new(false),
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    /// Flag the entry as acted upon. Returns true only for the call that
    /// actually flipped it.
    pub fn mark_consumed(&self) -> bool {
        !self.consumed.swap(true, Ordering::AcqRel)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

impl Clone for LogEntry {
    fn clone(&self) -> Self {
        Self {
            message_id: self.message_id.clone(),
            channel_id: self.channel_id.clone(),
            author_id: self.author_id.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp,
            fingerprint: self.fingerprint,
            consumed: AtomicBool::new(self.is_consumed()),
        }
    }
}
