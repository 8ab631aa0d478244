use flame_tree_protocol::SharedStr;

/// Canonical identity of a call site within one build.
///
/// For path-identified input this is the upstream frame id; for
/// link-identified input it is the node id. Equal keys are the same call
/// site and are always merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(SharedStr);

impl NodeKey {
    /// Build a key from a raw identity field. Empty or whitespace-only
    /// values are not identities; anything else is kept byte for byte.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(SharedStr::from(raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::borrow::Borrow<str> for NodeKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}
