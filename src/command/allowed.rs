//! Whitelist of commands a client may have relayed

use std::collections::HashSet;

/// Case-insensitive set of relayable command verbs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedCommands {
    verbs: HashSet<String>,
}

impl AllowedCommands {
    /// Build from configured verbs; blank entries are ignored
    pub fn new<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let verbs = verbs
            .into_iter()
            .map(|v| v.as_ref().trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
            .collect();
        Self { verbs }
    }

    /// Whether `verb` (in any case) is on the whitelist
    #[must_use]
    pub fn is_allowed(&self, verb: &str) -> bool {
        self.verbs.contains(&verb.to_ascii_uppercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}
