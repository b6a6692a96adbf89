//! ACL pattern compilation and matching utilities.
//!
//! A pattern is either an exact method name (`Biz/Check`) or a glob where
//! `*` stands for any run of characters, `/` included (`Biz/*`, `Biz*`,
//! `*/Logging`). Matching is anchored at both ends.
//!
//! A pattern without `/` may also match the bare method segment, the part
//! after the last `/`: `Check` admits `Biz/Check` but not `Biz/CheckAll`.

use crate::error::{HubError, Result};

/// Compiled method-match rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPattern {
    raw: String,
    kind: PatternKind,
    /// No `/` in the source text.
    bare: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    Exact,
    Glob {
        prefix: String,
        inner: Vec<String>, // literals between stars, in order
        suffix: String,
    },
}

impl MethodPattern {
    /// Compile one pattern. Empty patterns and patterns carrying whitespace
    /// or control characters are rejected.
    pub fn compile(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(HubError::ConfigInvalid("empty method pattern".into()));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(HubError::ConfigInvalid(format!(
                "invalid method pattern: {raw:?} (whitespace/control characters)"
            )));
        }

        let bare = !raw.contains('/');
        if !raw.contains('*') {
            return Ok(Self { raw: raw.to_string(), kind: PatternKind::Exact, bare });
        }

        let mut parts: Vec<String> = raw.split('*').map(str::to_string).collect();
        // split on '*' always yields at least two parts when a star is present
        let suffix = parts.pop().unwrap_or_default();
        let prefix = if parts.is_empty() { String::new() } else { parts.remove(0) };
        let inner = parts.into_iter().filter(|p| !p.is_empty()).collect();

        Ok(Self {
            raw: raw.to_string(),
            kind: PatternKind::Glob { prefix, inner, suffix },
            bare,
        })
    }

    /// Source text of the pattern.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, method: &str) -> bool {
        if self.matches_text(method) {
            return true;
        }
        match method.rsplit_once('/') {
            Some((_, name)) if self.bare => self.matches_text(name),
            _ => false,
        }
    }

    fn matches_text(&self, method: &str) -> bool {
        match &self.kind {
            PatternKind::Exact => self.raw == method,
            PatternKind::Glob { prefix, inner, suffix } => {
                if method.len() < prefix.len() + suffix.len() {
                    return false;
                }
                if !method.starts_with(prefix.as_str()) || !method.ends_with(suffix.as_str()) {
                    return false;
                }

                // leftmost placement of each literal keeps the most room for the rest
                let mut rest = &method[prefix.len()..method.len() - suffix.len()];
                for lit in inner {
                    match rest.find(lit.as_str()) {
                        Some(at) => rest = &rest[at + lit.len()..],
                        None => return false,
                    }
                }
                true
            }
        }
    }
}

pub fn compile_patterns(raw: &[String]) -> Result<Vec<MethodPattern>> {
    let mut out = Vec::with_capacity(raw.len());
    for s in raw {
        out.push(MethodPattern::compile(s)?);
    }
    Ok(out)
}

/// Existential check: order of the rules never changes the outcome.
pub fn is_method_allowed(rules: &[MethodPattern], method: &str) -> bool {
    rules.iter().any(|r| r.matches(method))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pat(s: &str) -> MethodPattern {
        MethodPattern::compile(s).unwrap()
    }

    #[test]
    fn exact_match_is_anchored() {
        let p = pat("Biz/Check");
        assert!(p.matches("Biz/Check"));
        assert!(!p.matches("Biz/CheckAll"));
        assert!(!p.matches("xBiz/Check"));
    }

    #[test]
    fn bare_name_matches_method_segment() {
        let p = pat("Check");
        assert!(p.matches("Check"));
        assert!(p.matches("Biz/Check"));
        assert!(p.matches("main.Biz/Check"));
        assert!(!p.matches("Biz/CheckAll"));
        assert!(!p.matches("Check/Biz"));
        assert!(pat("Ch*").matches("Biz/Check"));
    }

    #[test]
    fn qualified_name_never_matches_segment_only() {
        assert!(!pat("Biz/Check").matches("Check"));
        assert!(!pat("Other/Check").matches("Biz/Check"));
    }

    #[test]
    fn star_crosses_separator() {
        assert!(pat("Biz*").matches("Biz/Check"));
        assert!(pat("Biz/*").matches("Biz/Add"));
        assert!(pat("*/Logging").matches("Admin/Logging"));
        assert!(pat("*").matches(""));
        assert!(!pat("Biz/*").matches("Admin/Logging"));
    }

    #[test]
    fn inner_literals_must_appear_in_order() {
        let p = pat("A*mid*Z");
        assert!(p.matches("A-mid-Z"));
        assert!(p.matches("AmidZ"));
        assert!(!p.matches("AZ"));
        assert!(!pat("ab*ba").matches("aba"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(MethodPattern::compile("").is_err());
        assert!(MethodPattern::compile("Biz Check").is_err());
        assert!(MethodPattern::compile("Biz\n").is_err());
    }
}
