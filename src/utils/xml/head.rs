use anyhow::Result;
use quick_xml::events::BytesStart;

use super::common::{XmlWriter, attr_value, is_tag, write_empty_elem};

/// Whether `elem` is `<link rel="stylesheet" href="{href}">`.
pub fn is_stylesheet_link(elem: &BytesStart<'_>, href: &str) -> bool {
    is_tag(elem.name().as_ref(), "link")
        && attr_value(elem, "rel").is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"))
        && attr_value(elem, "href").is_some_and(|h| h == href)
}

/// Write `<link rel="stylesheet">` before the closing `</head>`.
pub fn write_stylesheet_link(writer: &mut XmlWriter, href: &str) -> Result<()> {
    write_empty_elem(
        writer,
        "link",
        &[("rel", "stylesheet"), ("href", href), ("type", "text/css")],
    )
}
