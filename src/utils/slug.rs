//! Ref name to directory slug conversion.
//!
//! Every version is published under `<destination>/<slug>/`, so the slug has
//! to be one safe path segment and one safe URL segment at the same time.

use rustc_hash::FxHashSet;

/// Directory names the renderer writes its own assets into.
pub const RESERVED_DIRS: &[&str] = &["_static", "_sources", "_images", "_downloads", "_modules"];

/// Character that stands in for anything unsafe.
const ESCAPE: char = '_';

/// Convert a ref name into a single safe path segment.
///
/// Non-ASCII text is transliterated first, then everything outside
/// `[A-Za-z0-9._-]` becomes `_`.
///
/// ```ignore
/// assert_eq!(sanitize_ref("robpol86/feature"), "robpol86_feature");
/// ```
pub fn sanitize_ref(name: &str) -> String {
    let ascii = deunicode::deunicode(name.trim());
    let slug: String = ascii
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                ESCAPE
            }
        })
        .collect();

    // "", "." and ".." are not usable as a directory
    if slug.chars().all(|c| c == '.') {
        slug.replace('.', "_") + "_"
    } else {
        slug
    }
}

/// Assign unique slugs to names, in the given order.
///
/// `taken` holds entries already present where the slugs will live (the
/// root version's top-level output); they count as claimed, like
/// [`RESERVED_DIRS`]. The first name claiming a slug keeps it; later ones get
/// `_` appended until they are unique. Uniqueness is checked
/// case-insensitively so two versions never share a directory on
/// case-insensitive filesystems.
pub fn assign_unique<'a>(
    names: impl IntoIterator<Item = &'a str>,
    taken: &[String],
) -> Vec<String> {
    let mut taken: FxHashSet<String> = RESERVED_DIRS
        .iter()
        .copied()
        .chain(taken.iter().map(String::as_str))
        .map(str::to_ascii_lowercase)
        .collect();

    names
        .into_iter()
        .map(|name| {
            let mut slug = sanitize_ref(name);
            while !taken.insert(slug.to_ascii_lowercase()) {
                slug.push(ESCAPE);
            }
            slug
        })
        .collect()
}
