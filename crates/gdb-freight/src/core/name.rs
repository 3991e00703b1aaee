//! Qualified data-object names.
//!
//! Enterprise stores qualify object names with a schema prefix
//! (`DATABASE.OWNER.NAME`); file-based stores use bare names. The local name
//! (the part after the last dot) is the match key across catalogs and is
//! always compared case-insensitively. Prefixes are kept for addressing but
//! never participate in matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A data object's full catalog identifier, decomposed into schema prefix and
/// local name.
///
/// Invariant: `qualified() == prefix + local_name`. The prefix retains its
/// trailing dot (e.g. `"GIS.OWNER."`) or is empty for unqualified names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    prefix: String,
    local: String,
}

impl QualifiedName {
    /// Parse a qualified name, splitting at the last dot.
    ///
    /// `"GIS.OWNER.roads"` → prefix `"GIS.OWNER."`, local `"roads"`;
    /// `"roads"` → empty prefix, local `"roads"`.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rfind('.') {
            Some(i) => Self {
                prefix: qualified[..=i].to_string(),
                local: qualified[i + 1..].to_string(),
            },
            None => Self {
                prefix: String::new(),
                local: qualified.to_string(),
            },
        }
    }

    /// Build from an already-separated prefix and local name.
    pub fn new(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            local: local.into(),
        }
    }

    /// Schema prefix including its trailing dot, empty for unqualified names.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local name without the schema prefix.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Full catalog identifier (`prefix + local`).
    pub fn qualified(&self) -> String {
        format!("{}{}", self.prefix, self.local)
    }

    /// Case-insensitive local-name match.
    pub fn matches_local(&self, local: &str) -> bool {
        self.local.eq_ignore_ascii_case(local)
    }

    /// Case-insensitive full-name match.
    pub fn matches_qualified(&self, qualified: &str) -> bool {
        self.qualified().eq_ignore_ascii_case(qualified)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.local)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enterprise_name() {
        let n = QualifiedName::parse("GIS.OWNER.roads");
        assert_eq!(n.prefix(), "GIS.OWNER.");
        assert_eq!(n.local(), "roads");
        assert_eq!(n.qualified(), "GIS.OWNER.roads");
    }

    #[test]
    fn test_parse_bare_name() {
        let n = QualifiedName::parse("roads");
        assert_eq!(n.prefix(), "");
        assert_eq!(n.local(), "roads");
        assert_eq!(n.qualified(), "roads");
    }

    #[test]
    fn test_parse_single_level_prefix() {
        let n = QualifiedName::parse("GIS.roads");
        assert_eq!(n.prefix(), "GIS.");
        assert_eq!(n.local(), "roads");
    }

    #[test]
    fn test_local_match_is_case_insensitive() {
        let n = QualifiedName::parse("GIS.ROADS");
        assert!(n.matches_local("roads"));
        assert!(n.matches_local("Roads"));
        assert!(!n.matches_local("rails"));
    }

    #[test]
    fn test_qualified_match_is_case_insensitive() {
        let n = QualifiedName::parse("GIS.Roads");
        assert!(n.matches_qualified("gis.roads"));
        assert!(!n.matches_qualified("other.roads"));
    }

    #[test]
    fn test_qualified_roundtrip_invariant() {
        for raw in ["GIS.OWNER.parcels", "parcels", "a.b"] {
            let n = QualifiedName::parse(raw);
            assert_eq!(n.qualified(), format!("{}{}", n.prefix(), n.local()));
            assert_eq!(n.qualified(), raw);
        }
    }
}
