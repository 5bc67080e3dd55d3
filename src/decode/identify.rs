//! Content-based file type identification.
//!
//! Uses `infer` for magic-based detection. Detection alone is not a
//! positive signal: a `TypePolicy` decides which detected types count as a
//! recovered payload, so the same sniffer serves both the discovery
//! allow-list and the archive extraction prefix rules.

use tracing::debug;

/// Capability to classify raw bytes into a mime label.
pub trait TypeSniffer: Send + Sync {
    fn identify(&self, data: &[u8]) -> Option<String>;
}

/// Production sniffer backed by the `infer` magic database.
pub struct InferSniffer;

impl TypeSniffer for InferSniffer {
    fn identify(&self, data: &[u8]) -> Option<String> {
        let kind = infer::get(data)?;
        debug!(
            mime = kind.mime_type(),
            extension = kind.extension(),
            "content identified"
        );
        Some(kind.mime_type().to_string())
    }
}

/// Which detected types count as a positive match.
#[derive(Debug, Clone, Default)]
pub struct TypePolicy {
    allow_exact: Vec<String>,
    allow_prefixes: Vec<String>,
    deny: Vec<String>,
}

impl TypePolicy {
    /// Exact-match allow-list, as used by the discovery engine.
    pub fn exact(allow: Vec<String>) -> Self {
        Self {
            allow_exact: allow,
            ..Self::default()
        }
    }

    /// Prefix allow-list with a deny-list of specific noise types, as used
    /// by the archive extraction phase.
    pub fn prefixes(allow_prefixes: Vec<String>, deny: Vec<String>) -> Self {
        Self {
            allow_prefixes,
            deny,
            ..Self::default()
        }
    }

    pub fn permits(&self, mime: &str) -> bool {
        if self.deny.iter().any(|d| d == mime) {
            return false;
        }
        self.allow_exact.iter().any(|a| a == mime)
            || self.allow_prefixes.iter().any(|p| mime.starts_with(p.as_str()))
    }
}
