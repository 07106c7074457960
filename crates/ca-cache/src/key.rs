//! Content-addressed cache keys

use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of generated artifact, used as the key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Base64-encoded image
    Image,
    /// Story text
    Story,
}

impl ArtifactKind {
    /// Key prefix tag
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Story => "story",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// `<tag>:<lowercase hex sha256 of the prompt>`
#[must_use]
pub fn cache_key(kind: ArtifactKind, prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    format!("{}:{}", kind.tag(), hex::encode(digest))
}
