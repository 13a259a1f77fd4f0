//! HTML rewriting for published pages.

pub mod common;
pub mod head;
pub mod link;
pub mod processor;

pub use processor::{Banner, NavItem, PageInjection, inject_page};
