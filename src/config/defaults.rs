//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use super::super::MissingPage;

    pub fn sources() -> Vec<String> {
        vec!["docs".into(), ".".into()]
    }

    pub fn conf_file() -> String {
        "conf.py".into()
    }

    pub fn main_doc() -> String {
        "index".into()
    }

    pub fn command() -> Vec<String> {
        vec!["sphinx-build".into(), "-b".into(), "html".into()]
    }

    pub fn remote() -> String {
        "origin".into()
    }

    pub fn missing_page() -> MissingPage {
        MissingPage::default()
    }

    pub fn nav_id() -> String {
        "versions".into()
    }
}

// ============================================================================
// [versions] Section Defaults
// ============================================================================

pub mod versions {
    pub fn root_ref() -> String {
        "main".into()
    }
}
