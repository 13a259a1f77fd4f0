//! Branch and tag whitelists.

use regex::Regex;
use rustc_hash::FxHashSet;

/// Characters that make a whitelist entry a regex.
const METACHARACTERS: &[char] = &[
    '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$', '\\',
];

/// Literal names plus regex patterns.
///
/// An entry without any regex metacharacter is an exact name; every other
/// entry is a pattern matched anywhere in the name (anchor it with `^...$`
/// for an exact match). An empty whitelist lets everything through.
#[derive(Debug, Default)]
pub struct Whitelist {
    literals: FxHashSet<String>,
    patterns: Vec<Regex>,
}

impl Whitelist {
    /// Compile whitelist entries. On failure, returns the offending entry.
    pub fn new(entries: &[String]) -> Result<Self, (String, regex::Error)> {
        let mut whitelist = Self::default();
        for entry in entries {
            if !entry.contains(METACHARACTERS) {
                whitelist.literals.insert(entry.clone());
            } else {
                let pattern = Regex::new(entry).map_err(|err| (entry.clone(), err))?;
                whitelist.patterns.push(pattern);
            }
        }
        Ok(whitelist)
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }

    pub fn allows(&self, name: &str) -> bool {
        self.is_empty()
            || self.literals.contains(name)
            || self.patterns.iter().any(|p| p.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist(entries: &[&str]) -> Whitelist {
        let entries: Vec<String> = entries.iter().map(|s| s.to_string()).collect();
        Whitelist::new(&entries).unwrap()
    }

    #[test]
    fn test_empty_allows_everything() {
        let w = whitelist(&[]);
        assert!(w.is_empty());
        assert!(w.allows("anything"));
    }

    #[test]
    fn test_literal_is_exact() {
        let w = whitelist(&["main", "included"]);
        assert!(w.allows("main"));
        assert!(w.allows("included"));
        assert!(!w.allows("main-old"));
        assert!(!w.allows("ignored"));
    }

    #[test]
    fn test_branch_name_punctuation_is_literal() {
        let w = whitelist(&["feature-x", "fix#12", "a&b~c"]);
        assert!(w.allows("feature-x"));
        assert!(!w.allows("old-feature-x2"));
        assert!(w.allows("fix#12"));
        assert!(!w.allows("fix#123"));
        assert!(w.allows("a&b~c"));
        assert!(w.patterns.is_empty());
    }

    #[test]
    fn test_pattern_uses_search() {
        let w = whitelist(&["^v[0-9]+.[0-9]+$"]);
        assert!(w.allows("v1.0"));
        assert!(!w.allows("v1.0-dev"));

        let w = whitelist(&["feature/.+"]);
        assert!(w.allows("robpol86/feature/x"));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let (entry, _) = Whitelist::new(&["release-(".to_string()]).unwrap_err();
        assert_eq!(entry, "release-(");
    }
}
