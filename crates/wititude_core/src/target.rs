//! Target identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Opaque name of a trackable physical object.
///
/// Stable while the object is tracked and reused across recognition
/// episodes of the same object. Cloning is a refcount bump.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(Arc<str>);

impl TargetId {
    /// Creates an identifier.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TargetId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for TargetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TargetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(TargetId::from("bottle"), 1);
        assert_eq!(map.get("bottle"), Some(&1));
        assert_eq!(map.get("firetruck"), None);
    }

    #[test]
    fn test_clone_shares_storage() {
        let a = TargetId::new("bottle");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "bottle");
    }
}
