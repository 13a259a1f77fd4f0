use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

use super::common::{XmlWriter, attr_value, create_xml_reader, is_tag, write_anchor};
use super::head::{is_stylesheet_link, write_stylesheet_link};

/// One entry of the version navigation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub name: String,
    pub href: String,
    pub current: bool,
}

/// Stale-version banner content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// "the development version of P" or "an old version of P"
    pub message: String,
    pub main_name: String,
    pub main_href: String,
}

/// Everything injected into one page.
#[derive(Debug, Clone, Copy)]
pub struct PageInjection<'a> {
    /// Id of the element receiving the navigation list
    pub nav_id: &'a str,
    pub nav: &'a [NavItem],
    pub banner: Option<&'a Banner>,
    /// Banner stylesheet href, linked from `<head>` once
    pub stylesheet: Option<&'a str>,
}

#[derive(Default)]
struct State {
    nav_done: bool,
    stylesheet_seen: bool,
}

/// Inject the navigation list, banner and banner stylesheet into a page.
///
/// - nav: inside the element with id `nav_id`, or a new list before `</body>`
/// - banner: right after `<body>`
/// - stylesheet: before `</head>` unless the page already links it
///
/// # Errors
/// When the page cannot be parsed; callers keep the page unchanged.
pub fn inject_page(content: &[u8], page: &PageInjection<'_>) -> Result<Vec<u8>> {
    let mut writer = XmlWriter::new(Cursor::new(Vec::with_capacity(content.len() + 1024)));
    let mut reader = create_xml_reader(content);
    let mut state = State::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) => handle_start(&elem, &mut writer, page, &mut state)?,
            Ok(Event::Empty(elem)) => handle_empty(&elem, &mut writer, page, &mut state)?,
            Ok(Event::End(elem)) => handle_end(&elem, &mut writer, page, &mut state)?,
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => anyhow::bail!(
                "HTML parse error at position {}: {:?}",
                reader.error_position(),
                e
            ),
        }
    }

    Ok(writer.into_inner().into_inner())
}

fn is_nav_target(elem: &BytesStart<'_>, page: &PageInjection<'_>, state: &State) -> bool {
    !state.nav_done && attr_value(elem, "id").is_some_and(|id| id == page.nav_id)
}

fn handle_start(
    elem: &BytesStart<'_>,
    writer: &mut XmlWriter,
    page: &PageInjection<'_>,
    state: &mut State,
) -> Result<()> {
    if page.stylesheet.is_some_and(|href| is_stylesheet_link(elem, href)) {
        state.stylesheet_seen = true;
    }
    let nav_target = is_nav_target(elem, page, state);
    writer.write_event(Event::Start(elem.clone()))?;

    if is_tag(elem.name().as_ref(), "body")
        && let Some(banner) = page.banner
    {
        write_banner(writer, banner)?;
    }
    if nav_target {
        write_nav_items(writer, page.nav)?;
        state.nav_done = true;
    }
    Ok(())
}

/// `<ul id="versions"/>` is expanded into an open/close pair around the list.
fn handle_empty(
    elem: &BytesStart<'_>,
    writer: &mut XmlWriter,
    page: &PageInjection<'_>,
    state: &mut State,
) -> Result<()> {
    if page.stylesheet.is_some_and(|href| is_stylesheet_link(elem, href)) {
        state.stylesheet_seen = true;
    }
    if !is_nav_target(elem, page, state) {
        writer.write_event(Event::Empty(elem.clone()))?;
        return Ok(());
    }

    writer.write_event(Event::Start(elem.clone()))?;
    write_nav_items(writer, page.nav)?;
    writer.write_event(Event::End(elem.to_end()))?;
    state.nav_done = true;
    Ok(())
}

fn handle_end(
    elem: &BytesEnd<'_>,
    writer: &mut XmlWriter,
    page: &PageInjection<'_>,
    state: &mut State,
) -> Result<()> {
    let name = elem.name();
    if is_tag(name.as_ref(), "head")
        && let Some(href) = page.stylesheet
        && !state.stylesheet_seen
    {
        write_stylesheet_link(writer, href)?;
        state.stylesheet_seen = true;
    } else if is_tag(name.as_ref(), "body") && !state.nav_done {
        let mut list = BytesStart::new("ul");
        list.push_attribute(("id", page.nav_id));
        writer.write_event(Event::Start(list))?;
        write_nav_items(writer, page.nav)?;
        writer.write_event(Event::End(BytesEnd::new("ul")))?;
        state.nav_done = true;
    }
    writer.write_event(Event::End(elem.clone()))?;
    Ok(())
}

fn write_nav_items(writer: &mut XmlWriter, nav: &[NavItem]) -> Result<()> {
    for item in nav {
        let mut li = BytesStart::new("li");
        if item.current {
            li.push_attribute(("class", "current"));
        }
        writer.write_event(Event::Start(li))?;
        write_anchor(writer, &item.href, &item.name)?;
        writer.write_event(Event::End(BytesEnd::new("li")))?;
    }
    Ok(())
}

/// `<div class="verdocs-banner"><p>Warning: This document is for ... </p></div>`
fn write_banner(writer: &mut XmlWriter, banner: &Banner) -> Result<()> {
    let mut div = BytesStart::new("div");
    div.push_attribute(("class", "verdocs-banner"));
    writer.write_event(Event::Start(div))?;
    writer.write_event(Event::Start(BytesStart::new("p")))?;

    let text = format!("Warning: This document is for {}. The main version is ", banner.message);
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    write_anchor(writer, &banner.main_href, &banner.main_name)?;
    writer.write_event(Event::Text(BytesText::new(".")))?;

    writer.write_event(Event::End(BytesEnd::new("p")))?;
    writer.write_event(Event::End(BytesEnd::new("div")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"/><title>T</title></head>
<body><div class="body">Hello &amp; welcome</div><ul id="versions"></ul></body></html>"#;

    fn nav() -> Vec<NavItem> {
        vec![
            NavItem {
                name: "main".into(),
                href: "index.html".into(),
                current: true,
            },
            NavItem {
                name: "v1.0".into(),
                href: "../v1.0/index.html".into(),
                current: false,
            },
        ]
    }

    fn nav_only(nav: &[NavItem]) -> PageInjection<'_> {
        PageInjection {
            nav_id: "versions",
            nav,
            banner: None,
            stylesheet: None,
        }
    }

    fn banner() -> Banner {
        Banner {
            message: "an old version of Proj".into(),
            main_name: "main".into(),
            main_href: "../main/index.html".into(),
        }
    }

    fn inject(html: &str, page: &PageInjection<'_>) -> String {
        String::from_utf8(inject_page(html.as_bytes(), page).unwrap()).unwrap()
    }

    #[test]
    fn test_nav_into_target_element() {
        let nav = nav();
        let page = nav_only(&nav);
        let out = inject(PAGE, &page);
        assert!(out.contains(
            r#"<ul id="versions"><li class="current"><a href="index.html">main</a></li><li><a href="../v1.0/index.html">v1.0</a></li></ul>"#
        ));
        assert!(out.contains("Hello &amp; welcome"));
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert_eq!(out.matches("<li").count(), 2);
    }

    #[test]
    fn test_nav_into_self_closed_element() {
        let nav = nav();
        let page = nav_only(&nav);
        let out = inject(r#"<html><body><div id="versions"/></body></html>"#, &page);
        assert!(out.contains(r#"<div id="versions"><li class="current">"#));
        assert!(out.contains("</li></div></body>"));
    }

    #[test]
    fn test_nav_appended_without_target() {
        let nav = nav();
        let page = nav_only(&nav);
        let out = inject("<html><body><p>x</p></body></html>", &page);
        assert!(out.ends_with(r#"<p>x</p><ul id="versions"><li class="current"><a href="index.html">main</a></li><li><a href="../v1.0/index.html">v1.0</a></li></ul></body></html>"#));
    }

    #[test]
    fn test_banner_and_stylesheet() {
        let nav = nav();
        let banner = banner();
        let page = PageInjection {
            nav_id: "versions",
            nav: &nav,
            banner: Some(&banner),
            stylesheet: Some("_static/banner.css"),
        };
        let out = inject(PAGE, &page);
        assert!(out.contains(
            r#"<body><div class="verdocs-banner"><p>Warning: This document is for an old version of Proj. The main version is <a href="../main/index.html">main</a>.</p></div>"#
        ));
        assert!(out.contains(
            r#"<link rel="stylesheet" href="_static/banner.css" type="text/css"/></head>"#
        ));
    }

    #[test]
    fn test_stylesheet_not_duplicated() {
        let nav = nav();
        let page = PageInjection {
            nav_id: "versions",
            nav: &nav,
            banner: None,
            stylesheet: Some("_static/banner.css"),
        };
        let html = r#"<html><head><link rel="stylesheet" href="_static/banner.css"></head><body></body></html>"#;
        let out = inject(html, &page);
        assert_eq!(out.matches("banner.css").count(), 1);
    }

    #[test]
    fn test_uppercase_tags() {
        let nav = nav();
        let banner = banner();
        let page = PageInjection {
            banner: Some(&banner),
            ..nav_only(&nav)
        };
        let out = inject("<HTML><BODY><P>x</P></BODY></HTML>", &page);
        assert!(out.contains("<BODY><div class=\"verdocs-banner\">"));
        assert!(out.contains(r#"<ul id="versions">"#));
    }
}
