//! Response classification.
//!
//! Every HTTP response is mapped to a [`Verdict`] by [`classify_response`]
//! before any body byte is read. The fetch loop only ever branches on these
//! enums.

use std::fmt;

/// Content type some object stores send for uploads that never received a
/// real content type. The body is not a usable image.
pub const STORAGE_PLACEHOLDER_CONTENT_TYPE: &str = "multerS3.AUTO_CONTENT_TYPE";

/// Why an attempt failed in a way worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientKind {
    /// Non-2xx status other than the rate-limit codes.
    HttpStatus(u16),
    /// The storage backend returned its placeholder content type.
    StoragePlaceholder,
    /// The response is not an image.
    NotAnImage(String),
    /// Declared or received size below the acceptance floor.
    Undersized(u64),
    /// Connection, TLS or timeout failure.
    Network(String),
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientKind::HttpStatus(code) => write!(f, "HTTP {}", code),
            TransientKind::StoragePlaceholder => write!(f, "storage placeholder content type"),
            TransientKind::NotAnImage(ct) if ct.is_empty() => write!(f, "missing content type"),
            TransientKind::NotAnImage(ct) => write!(f, "not an image ({})", ct),
            TransientKind::Undersized(len) => write!(f, "undersized body ({} bytes)", len),
            TransientKind::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

/// Classification of a response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    RateLimited,
    Transient(TransientKind),
}

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Transient(TransientKind),
    /// 429 or 403; the next attempt also waits a penalty.
    RateLimited,
    /// Not worth retrying (bad URI).
    Permanent(String),
    /// The artifact could not be written locally. Says nothing about the
    /// source.
    Storage(String),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }

    /// Whether another attempt could change the result.
    pub fn is_final(&self) -> bool {
        matches!(self, AttemptOutcome::Permanent(_) | AttemptOutcome::Storage(_))
    }
}

impl From<Verdict> for AttemptOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accept => AttemptOutcome::Success,
            Verdict::RateLimited => AttemptOutcome::RateLimited,
            Verdict::Transient(kind) => AttemptOutcome::Transient(kind),
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "success"),
            AttemptOutcome::Transient(kind) => write!(f, "{}", kind),
            AttemptOutcome::RateLimited => write!(f, "rate limited"),
            AttemptOutcome::Permanent(msg) => write!(f, "permanent failure: {}", msg),
            AttemptOutcome::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

/// Classify a response head.
///
/// A body must be strictly larger than `floor` bytes to be accepted.
/// `content_length` is the declared length, if any; a declared length of
/// zero is treated as unknown.
pub fn classify_response(
    status: u16,
    content_type: Option<&str>,
    content_length: Option<u64>,
    floor: u64,
) -> Verdict {
    if status == 429 || status == 403 {
        return Verdict::RateLimited;
    }
    if !(200..300).contains(&status) {
        return Verdict::Transient(TransientKind::HttpStatus(status));
    }

    let content_type = content_type.unwrap_or("").trim();
    if content_type == STORAGE_PLACEHOLDER_CONTENT_TYPE {
        return Verdict::Transient(TransientKind::StoragePlaceholder);
    }
    if !content_type.to_ascii_lowercase().starts_with("image/") {
        return Verdict::Transient(TransientKind::NotAnImage(content_type.to_string()));
    }

    match content_length {
        Some(len) if len > 0 && len <= floor => Verdict::Transient(TransientKind::Undersized(len)),
        _ => Verdict::Accept,
    }
}
