use serde::{Deserialize, Serialize};

/// Ordered list of DNS suffixes appended to unqualified lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchPath(Vec<String>);

impl SearchPath {
    pub fn new(domains: Vec<String>) -> Self {
        Self(domains)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names to try, in order, when resolving `name`.
    ///
    /// A name with a trailing dot is already qualified and yields only itself.
    /// Otherwise the bare name comes first, followed by one candidate per suffix.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if name.ends_with('.') {
            return vec![name.to_string()];
        }
        let mut out = Vec::with_capacity(self.0.len() + 1);
        out.push(name.to_string());
        for suffix in &self.0 {
            let suffix = suffix.trim_matches('.');
            if suffix.is_empty() {
                continue;
            }
            out.push(format!("{name}.{suffix}"));
        }
        out
    }
}

impl From<Vec<String>> for SearchPath {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}
