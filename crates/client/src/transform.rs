//! Host header rewriting for forwarded traffic
//!
//! Requests arriving through the tunnel carry the public hostname in their
//! `Host` header. Each forwarding connection pushes its inbound bytes through
//! a [`HeaderHostTransformer`] so the local service sees its own hostname
//! instead.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use local_tunnel_common::constants::DEFAULT_LOCAL_HOST;

static HOST_HEADER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\r\nHost: )\S+").expect("Invalid regex"));

/// One-shot, order-preserving rewriter for the `Host` header value.
///
/// Only the first chunk is ever inspected: HTTP framing on a freshly
/// established forwarding connection puts the request head in the first chunk
/// in practice. After that first chunk the transformer is a pure pass-through,
/// even if the chunk contained no `Host` header at all — a header split
/// across a chunk boundary is a known, accepted limitation.
#[derive(Debug)]
pub struct HeaderHostTransformer {
    host: String,
    replaced: bool,
}

impl HeaderHostTransformer {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            replaced: false,
        }
    }

    /// Process one inbound chunk, rewriting the first `Host` header value on
    /// the first chunk and passing everything else through untouched.
    pub fn transform<'a>(&mut self, chunk: &'a [u8]) -> Cow<'a, [u8]> {
        if self.replaced {
            return Cow::Borrowed(chunk);
        }
        self.replaced = true;

        let text = String::from_utf8_lossy(chunk);
        match HOST_HEADER_REGEX.replace(&text, |caps: &Captures<'_>| {
            format!("{}{}", &caps[1], self.host)
        }) {
            Cow::Owned(rewritten) => Cow::Owned(rewritten.into_bytes()),
            // No match: hand the original bytes through untouched
            Cow::Borrowed(_) => Cow::Borrowed(chunk),
        }
    }
}

impl Default for HeaderHostTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_HOST)
    }
}
