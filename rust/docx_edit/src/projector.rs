//! Projects the document body of an identity-bearing package onto an
//! addressable HTML preview.

use crate::error::{Error, Result};
use crate::ident::{ElementId, IdPrefix, ParagraphIdentity};
use crate::identity::IdentityMap;
use crate::package::Package;
use crate::wordml::{heading_level, ListKind, Numbering, StyleSheet, Vocabulary};
use crate::xml::{XmlDocument, XmlElement};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Projection {
    pub html: String,
    pub css: String,
    /// Emitted top-level elements; a list wrapper counts once.
    pub element_count: usize,
}

pub fn project(package_bytes: &[u8], identities: &IdentityMap) -> Result<Projection> {
    let package = Package::from_bytes(package_bytes)?;
    let doc = XmlDocument::parse(package.document_part()?)?;
    let vocab = Vocabulary::from_root(&doc.root);
    let body = doc
        .root
        .elements()
        .find(|e| vocab.is(e, "body"))
        .ok_or_else(|| Error::MalformedPackage("document has no body".into()))?;

    let mut projector = Projector {
        vocab: &vocab,
        styles: StyleSheet::from_package(&package)?,
        numbering: Numbering::from_package(&package)?,
        identities,
        position: 0,
        table_index: 0,
        blocks: Vec::new(),
        list: None,
        element_count: 0,
    };
    for child in body.elements() {
        projector.visit(child);
    }
    projector.flush_list();

    debug!(
        elements = projector.element_count,
        paragraphs = projector.position,
        "projected document body"
    );
    Ok(Projection {
        html: page(&projector.blocks.join("\n")),
        css: DEFAULT_CSS.to_string(),
        element_count: projector.element_count,
    })
}

struct PendingList {
    kind: ListKind,
    items: Vec<String>,
}

struct Projector<'a> {
    vocab: &'a Vocabulary,
    styles: StyleSheet,
    numbering: Numbering,
    identities: &'a IdentityMap,
    position: usize,
    table_index: usize,
    blocks: Vec<String>,
    list: Option<PendingList>,
    element_count: usize,
}

impl Projector<'_> {
    fn visit(&mut self, el: &XmlElement) {
        if self.vocab.is(el, "p") {
            self.paragraph(el);
        } else if self.vocab.is(el, "tbl") {
            self.flush_list();
            let html = self.table(el);
            self.emit(html);
            self.position += self.vocab.count_paragraphs(el);
        } else {
            // Not rendered, but its paragraphs still occupy positions.
            self.position += self.vocab.count_paragraphs(el);
        }
    }

    fn identity_at(&self, position: usize, p: &XmlElement) -> ParagraphIdentity {
        if let Some(id) = self.identities.get(position) {
            return id.clone();
        }
        match self.vocab.paragraph_identity(p) {
            Some(own) => ParagraphIdentity::parse_lenient(own),
            None => ParagraphIdentity::mint(),
        }
    }

    fn paragraph(&mut self, p: &XmlElement) {
        let position = self.position;
        self.position += self.vocab.count_paragraphs(p);

        let content: String = self
            .vocab
            .runs(p)
            .into_iter()
            .map(|r| self.run_html(r))
            .collect();
        if content.trim().is_empty() {
            self.flush_list();
            return;
        }

        let identity = self.identity_at(position, p);
        let style_name = self.styles.paragraph_style_name(self.vocab.style_id(p));
        let class = css_class(style_name.as_deref());

        if let Some(level) = style_name.as_deref().and_then(heading_level) {
            self.flush_list();
            let id = ElementId::for_paragraph(IdPrefix::Paragraph, &identity);
            self.emit(format!(r#"<h{level} id="{id}" class="{class}">{content}</h{level}>"#));
            return;
        }

        if let Some((num_id, ilvl)) = self.vocab.numbering(p) {
            let kind = self.numbering.kind(num_id, ilvl);
            if self.list.as_ref().is_some_and(|l| l.kind != kind) {
                self.flush_list();
            }
            let id = ElementId::for_paragraph(IdPrefix::ListItem, &identity);
            let item = format!(r#"<li id="{id}" class="list-item">{content}</li>"#);
            self.list
                .get_or_insert_with(|| PendingList {
                    kind,
                    items: Vec::new(),
                })
                .items
                .push(item);
            return;
        }

        self.flush_list();
        let id = ElementId::for_paragraph(IdPrefix::Paragraph, &identity);
        self.emit(format!(r#"<p id="{id}" class="{class}">{content}</p>"#));
    }

    fn run_html(&self, run: &XmlElement) -> String {
        let text = self.vocab.run_text(run);
        if text.is_empty() {
            return String::new();
        }
        let format = self.vocab.run_format(run);
        let mut out = escape_text(&text);
        if format.bold {
            out = format!("<strong>{out}</strong>");
        }
        if format.italic {
            out = format!("<em>{out}</em>");
        }
        if format.underline {
            out = format!("<u>{out}</u>");
        }
        out
    }

    fn table(&mut self, tbl: &XmlElement) -> String {
        let t = self.table_index;
        self.table_index += 1;

        let mut rows = String::new();
        for (r, tr) in tbl.elements().filter(|e| self.vocab.is(e, "tr")).enumerate() {
            let mut cells = String::new();
            for (c, tc) in tr.elements().filter(|e| self.vocab.is(e, "tc")).enumerate() {
                let lines: Vec<String> = tc
                    .elements()
                    .filter(|e| self.vocab.is(e, "p"))
                    .map(|p| self.vocab.paragraph_plain_text(p))
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| escape_text(&s))
                    .collect();
                let tag = if r == 0 { "th" } else { "td" };
                cells.push_str(&format!(
                    r#"<{tag} id="td-{t}-{r}-{c}">{}</{tag}>"#,
                    lines.join("<br>")
                ));
            }
            rows.push_str(&format!(r#"<tr id="tr-{t}-{r}">{cells}</tr>"#));
        }
        format!(r#"<table id="tbl-{t}" class="table">{rows}</table>"#)
    }

    fn flush_list(&mut self) {
        let Some(list) = self.list.take() else {
            return;
        };
        let (tag, class) = match list.kind {
            ListKind::Bullet => ("ul", "bullet-list"),
            ListKind::Ordered => ("ol", "numbered-list"),
        };
        let id = ElementId::fresh(IdPrefix::List);
        let items = list.items.concat();
        self.emit(format!(r#"<{tag} id="{id}" class="{class}">{items}</{tag}>"#));
    }

    fn emit(&mut self, html: String) {
        self.blocks.push(html);
        self.element_count += 1;
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// CSS class for a style name: lower-case, runs of other characters
/// collapsed to `-`.
pub fn css_class(style_name: Option<&str>) -> String {
    let Some(name) = style_name else {
        return "normal".to_string();
    };
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "normal".to_string()
    } else {
        trimmed.to_string()
    }
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" href="styles.css">
    <title>Document Preview</title>
</head>
<body>
{body}
</body>
</html>"#
    )
}

pub const DEFAULT_CSS: &str = r#"body {
    font-family: Calibri, "Segoe UI", Arial, sans-serif;
    font-size: 11pt;
    line-height: 1.5;
    max-width: 8.5in;
    margin: 0 auto;
    padding: 1in;
    color: #1f1f1f;
}

p {
    margin: 0 0 8pt 0;
}

h1, h2, h3, h4, h5, h6 {
    margin: 12pt 0 6pt 0;
    line-height: 1.2;
}

h1 { font-size: 20pt; }
h2 { font-size: 16pt; }
h3 { font-size: 14pt; }
h4 { font-size: 12pt; }
h5 { font-size: 11pt; }
h6 { font-size: 11pt; font-style: italic; }

.title {
    font-size: 26pt;
}

.bullet-list,
.numbered-list {
    margin: 0 0 8pt 0;
    padding-left: 40px;
}

.list-item {
    margin: 0;
}

.table {
    border-collapse: collapse;
    margin: 0 0 8pt 0;
}

.table th,
.table td {
    border: 1px solid #d9d9d9;
    padding: 4px 6px;
    vertical-align: top;
}

.table th {
    background: #f5f5f5;
    text-align: left;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_tree::HtmlTree;
    use crate::identity::assign_identities;
    use crate::test_support::{docx, heading, list_item, paragraph, styled_run, table};
    use std::collections::HashSet;

    fn projected(blocks: &[String]) -> (IdentityMap, Projection) {
        let assigned = assign_identities(&docx(blocks)).unwrap();
        let projection = project(&assigned.bytes, &assigned.identities).unwrap();
        (assigned.identities, projection)
    }

    #[test]
    fn plain_paragraphs_get_paragraph_ids() {
        let (ids, out) = projected(&[paragraph("one"), paragraph("two"), paragraph("three")]);
        assert_eq!(out.element_count, 3);
        for (_, id) in ids.iter() {
            assert!(out.html.contains(&format!(r#"<p id="p-{id}" class="normal">"#)));
        }
        assert!(out.html.starts_with("<!DOCTYPE html>"));
        assert!(out.css.contains(".bullet-list"));
    }

    #[test]
    fn headings_and_inline_formatting() {
        let bold = format!(
            "<w:p>{}{}</w:p>",
            styled_run("plain ", ""),
            styled_run("a<b", "<w:b/><w:i/><w:u w:val=\"single\"/>")
        );
        let (ids, out) = projected(&[heading(2, "Title"), bold]);
        let h = ids.get(0).unwrap();
        assert!(out
            .html
            .contains(&format!(r#"<h2 id="p-{h}" class="heading-2">Title</h2>"#)));
        assert!(out.html.contains("plain <u><em><strong>a&lt;b</strong></em></u>"));
    }

    #[test]
    fn empty_paragraphs_consume_a_position() {
        let (ids, out) = projected(&[paragraph(""), paragraph("second")]);
        assert_eq!(out.element_count, 1);
        let second = ids.get(1).unwrap();
        assert!(out.html.contains(&format!(r#"id="p-{second}""#)));
        assert!(!out.html.contains(&format!(r#"id="p-{}""#, ids.get(0).unwrap())));
    }

    #[test]
    fn consecutive_list_items_share_one_wrapper() {
        let (ids, out) = projected(&[
            list_item(1, "a"),
            list_item(1, "b"),
            paragraph("after"),
            list_item(2, "first"),
        ]);
        assert_eq!(out.element_count, 3);
        assert_eq!(out.html.matches("<ul id=\"list-").count(), 1);
        assert_eq!(out.html.matches("<ol id=\"list-").count(), 1);
        let a = ids.get(0).unwrap();
        assert!(out
            .html
            .contains(&format!(r#"<li id="li-{a}" class="list-item">a</li>"#)));
    }

    #[test]
    fn tables_use_positional_ids_and_keep_later_paragraph_ids() {
        let (ids, out) = projected(&[table(&[&["h1", "h2"], &["x & y", ""]]), paragraph("after")]);
        assert!(out.html.contains(r#"<table id="tbl-0" class="table">"#));
        assert!(out.html.contains(r#"<tr id="tr-0-1">"#));
        assert!(out.html.contains(r#"<th id="td-0-0-1">h2</th>"#));
        assert!(out.html.contains(r#"<td id="td-0-1-0">x &amp; y</td>"#));
        assert!(out.html.contains(r#"<td id="td-0-1-1"></td>"#));
        // Four cell paragraphs precede the trailing one.
        let after = ids.get(4).unwrap();
        assert!(out.html.contains(&format!(r#"<p id="p-{after}""#)));
        assert_eq!(out.element_count, 2);
    }

    #[test]
    fn ids_are_unique_and_stable_across_runs() {
        let assigned = assign_identities(&docx(&[
            heading(1, "Title"),
            list_item(1, "a"),
            list_item(1, "b"),
            table(&[&["h1", "h2"], &["x", "y"]]),
            paragraph("between"),
            list_item(2, "one"),
            heading(2, "End"),
        ]))
        .unwrap();
        let first = project(&assigned.bytes, &assigned.identities).unwrap();
        let second = project(&assigned.bytes, &assigned.identities).unwrap();

        let ids = HtmlTree::parse(&first.html).ids();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "{ids:?}");

        let stable = |html: &str| -> Vec<String> {
            HtmlTree::parse(html)
                .ids()
                .into_iter()
                .filter(|id| !id.starts_with("list-"))
                .collect()
        };
        assert_eq!(stable(&first.html), stable(&second.html));
        assert_eq!(first.element_count, second.element_count);
        assert_eq!(ids.iter().filter(|id| id.starts_with("list-")).count(), 2);
    }

    #[test]
    fn css_classes_from_style_names() {
        assert_eq!(css_class(None), "normal");
        assert_eq!(css_class(Some("Heading 1")), "heading-1");
        assert_eq!(css_class(Some("List  Paragraph!")), "list-paragraph");
    }
}
