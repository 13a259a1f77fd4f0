//! Loose version parsing for tag and branch names.
//!
//! Accepts `1`, `v1.2`, `V1.2.3.4`, `v2.0rc1`, `1.0-beta.2` and the like:
//! up to four numeric components followed by an optional suffix.

use regex::Regex;
use smallvec::SmallVec;
use std::{cmp::Ordering, sync::OnceLock};

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[vV]?(\d+)\.?(\d+)?\.?(\d+)?\.?(\d+)?([\w.+-]*)$").unwrap()
    })
}

/// A parsed version name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseVersion {
    numbers: SmallVec<[u64; 4]>,
    suffix: String,
}

impl LooseVersion {
    /// Parse a ref name, `None` if it does not look like a version.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = version_regex().captures(name)?;
        let numbers = (1..=4)
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str().parse::<u64>().ok())
            .collect::<Option<SmallVec<[u64; 4]>>>()?;
        let suffix = caps.get(5).map_or("", |m| m.as_str()).to_owned();
        Some(Self { numbers, suffix })
    }

    fn number(&self, index: usize) -> u64 {
        self.numbers.get(index).copied().unwrap_or(0)
    }

    /// Order greatest version first.
    ///
    /// Missing components count as zero. For equal numbers a bare release
    /// (`v1.0`) comes before any suffixed one (`v1.0rc1`), and suffixes
    /// compare lexically among themselves.
    pub fn cmp_greatest_first(&self, other: &Self) -> Ordering {
        (0..4)
            .map(|i| other.number(i).cmp(&self.number(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (self.suffix.is_empty(), other.suffix.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => self.suffix.cmp(&other.suffix),
            })
    }
}

/// Compare two ref names greatest version first.
///
/// Parseable names come before non-parseable ones, which stay in lexical
/// order among themselves.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (LooseVersion::parse(a), LooseVersion::parse(b)) {
        (Some(va), Some(vb)) => va.cmp_greatest_first(&vb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        names.sort_by(|a, b| compare_names(a, b));
        names
    }

    #[test]
    fn test_parse_accepts_common_shapes() {
        assert!(LooseVersion::parse("1").is_some());
        assert!(LooseVersion::parse("v1.2").is_some());
        assert!(LooseVersion::parse("V1.2.3.4").is_some());
        assert!(LooseVersion::parse("v2.0rc1").is_some());
        assert!(LooseVersion::parse("1.0-beta.2").is_some());
    }

    #[test]
    fn test_parse_rejects_branch_names() {
        assert!(LooseVersion::parse("main").is_none());
        assert!(LooseVersion::parse("feature/x").is_none());
        assert!(LooseVersion::parse("").is_none());
    }

    #[test]
    fn test_greatest_first() {
        assert_eq!(
            sorted(&["v1.0", "v10.0", "v2.1", "v2.0"]),
            vec!["v10.0", "v2.1", "v2.0", "v1.0"]
        );
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare_names("v2", "v2.0.0"), Ordering::Equal);
        assert_eq!(sorted(&["v2", "v2.0.1"]), vec!["v2.0.1", "v2"]);
    }

    #[test]
    fn test_release_before_suffixed() {
        assert_eq!(sorted(&["v1.0rc1", "v1.0"]), vec!["v1.0", "v1.0rc1"]);
    }

    #[test]
    fn test_non_parseable_after_parseable_in_lexical_order() {
        assert_eq!(
            sorted(&["zeta", "main", "v0.1", "alpha"]),
            vec!["v0.1", "alpha", "main", "zeta"]
        );
    }
}
