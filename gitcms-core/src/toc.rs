//! Nested table of contents from a markdown document's headings.

use std::collections::HashMap;

use comrak::nodes::{AstNode, NodeValue};
use comrak::{parse_document, Arena, Options};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    /// In-document link to the heading, e.g. `#getting-started`.
    pub anchor: String,
    pub children: Vec<TocEntry>,
}

/// Build the table of contents for `body`.
///
/// Only headings that sit directly in the document are listed; headings inside
/// block quotes or list items are not. A heading is nested under the closest
/// preceding heading of a shallower level; headings with no shallower
/// predecessor are top-level entries.
pub fn extract_toc(body: &str) -> Vec<TocEntry> {
    let arena = Arena::new();
    let options = Options::default();
    let root = parse_document(&arena, body, &options);

    let mut slugger = Slugger::default();
    let mut headings = Vec::new();
    for node in root.children() {
        let level = match node.data.borrow().value {
            NodeValue::Heading(ref heading) => heading.level,
            _ => continue,
        };
        let mut title = String::new();
        collect_title(node, &mut title);
        let anchor = format!("#{}", slugger.slug(&title));
        headings.push((
            level,
            TocEntry {
                title,
                anchor,
                children: Vec::new(),
            },
        ));
    }
    nest(headings)
}

/// Concatenate text and inline-code leaves; emphasis, strong and link
/// wrappers contribute their text, images and raw HTML contribute nothing.
fn collect_title<'a>(node: &'a AstNode<'a>, title: &mut String) {
    for child in node.children() {
        match child.data.borrow().value {
            NodeValue::Text(ref text) => title.push_str(text),
            NodeValue::Code(ref code) => title.push_str(&code.literal),
            NodeValue::Image(_) | NodeValue::HtmlInline(_) => {}
            _ => collect_title(child, title),
        }
    }
}

fn nest(headings: Vec<(u8, TocEntry)>) -> Vec<TocEntry> {
    let mut roots = Vec::new();
    let mut open: Vec<(u8, TocEntry)> = Vec::new();
    for (level, entry) in headings {
        while open.last().is_some_and(|(top, _)| *top >= level) {
            close_last(&mut open, &mut roots);
        }
        open.push((level, entry));
    }
    while !open.is_empty() {
        close_last(&mut open, &mut roots);
    }
    roots
}

fn close_last(open: &mut Vec<(u8, TocEntry)>, roots: &mut Vec<TocEntry>) {
    if let Some((_, entry)) = open.pop() {
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(entry),
            None => roots.push(entry),
        }
    }
}

/// GitHub-style heading slugs, de-duplicated with `-1`, `-2`, ... suffixes.
#[derive(Default)]
struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    fn slug(&mut self, text: &str) -> String {
        let base: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .map(|c| if c == ' ' { '-' } else { c })
            .collect();

        let mut slug = base.clone();
        while self.occurrences.contains_key(&slug) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{base}-{count}");
        }
        self.occurrences.insert(slug.clone(), 0);
        slug
    }
}
