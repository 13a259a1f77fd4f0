//! Relative links between version trees.
//!
//! All math is lexical over document ids (`/`-separated, no extension).
//!
//! | From | Depth | Target | Href |
//! |------|-------|--------|------|
//! | root copy `a/b` | 1 | `v2/a/b` | `../v2/a/b.html` |
//! | tree `v1`, `a/b` | 1 | `v2/a/b` | `../../v2/a/b.html` |
//! | tree `v1`, `a/b` | 1 | itself | `b.html` |

/// Number of directories between a page and its tree root.
#[inline]
pub fn depth(pagename: &str) -> usize {
    pagename.matches('/').count()
}

/// Prefix climbing from `pagename` to the destination root.
pub fn to_destination_root(pagename: &str, from_root_copy: bool) -> String {
    let mut prefix = "../".repeat(depth(pagename));
    if !from_root_copy {
        prefix.push_str("../");
    }
    prefix
}

/// Link from `pagename` to document `doc` in the tree at `root_dir`.
pub fn version_href(pagename: &str, from_root_copy: bool, root_dir: &str, doc: &str) -> String {
    format!(
        "{}{}/{}.html",
        to_destination_root(pagename, from_root_copy),
        encode_segment(root_dir),
        encode_path(doc)
    )
}

/// Link from a page to itself.
pub fn self_href(pagename: &str) -> String {
    let basename = pagename.rsplit('/').next().unwrap_or(pagename);
    format!("{}.html", encode_segment(basename))
}

/// Link from `pagename` to a file relative to its own tree root.
pub fn tree_href(pagename: &str, file: &str) -> String {
    format!("{}{}", "../".repeat(depth(pagename)), file)
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn encode_path(path: &str) -> String {
    path.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Resolve `href` against the directory of `from` (both destination-relative).
    fn resolve(from: &str, href: &str) -> String {
        let mut parts: Vec<&str> = from.split('/').collect();
        parts.pop();
        for segment in href.split('/') {
            match segment {
                ".." => {
                    parts.pop();
                }
                s => parts.push(s),
            }
        }
        parts.join("/")
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth("index"), 0);
        assert_eq!(depth("a/b/c"), 2);
    }

    #[test]
    fn test_version_href() {
        assert_eq!(version_href("index", true, "v2", "index"), "v2/index.html");
        assert_eq!(version_href("index", false, "v2", "index"), "../v2/index.html");
        assert_eq!(version_href("a/b", true, "v2", "a/b"), "../v2/a/b.html");
        assert_eq!(version_href("a/b", false, "v2", "a/b"), "../../v2/a/b.html");
    }

    #[test]
    fn test_self_href() {
        assert_eq!(self_href("index"), "index.html");
        assert_eq!(self_href("a/b"), "b.html");
    }

    #[test]
    fn test_hrefs_are_url_encoded() {
        assert_eq!(
            version_href("index", false, "feature#1", "my page"),
            "../feature%231/my%20page.html"
        );
    }

    #[test]
    fn test_links_round_trip() {
        for page in ["index", "a/b", "a/b/c/d"] {
            let there = version_href(page, false, "v2", page);
            assert_eq!(resolve(&format!("v1/{page}.html"), &there), format!("v2/{page}.html"));

            let back = version_href(page, false, "v1", page);
            assert_eq!(resolve(&format!("v2/{page}.html"), &back), format!("v1/{page}.html"));

            let from_root = version_href(page, true, "v1", page);
            assert_eq!(resolve(&format!("{page}.html"), &from_root), format!("v1/{page}.html"));

            let own = self_href(page);
            assert_eq!(resolve(&format!("v1/{page}.html"), &own), format!("v1/{page}.html"));
        }
    }

    #[test]
    fn test_tree_href() {
        assert_eq!(tree_href("index", "_static/banner.css"), "_static/banner.css");
        assert_eq!(tree_href("a/b", "_static/banner.css"), "../_static/banner.css");
    }
}
