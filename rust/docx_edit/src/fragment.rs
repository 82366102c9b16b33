//! HTML fragments flattened into WordprocessingML paragraphs.

use crate::html_tree::{context_for, parse_nodes};
use crate::ident::ElementId;
use crate::wordml::Vocabulary;
use crate::xml::{XmlElement, XmlNode};
use markup5ever_rcdom::{Handle, NodeData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text { text: String, style: RunStyle },
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Normal,
    Heading(u8),
    ListItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Paragraph {
    pub kind: BlockKind,
    /// `id` attribute of the block element the paragraph came from.
    pub id: Option<ElementId>,
    pub segments: Vec<Segment>,
}

impl Paragraph {
    fn new(kind: BlockKind, id: Option<ElementId>) -> Self {
        Self {
            kind,
            id,
            segments: Vec::new(),
        }
    }

    /// `w:r` elements for the paragraph's segments.
    pub fn runs(&self, vocab: &Vocabulary) -> Vec<XmlElement> {
        segment_runs(vocab, &self.segments)
    }
}

#[derive(Default)]
struct BuildCtx {
    paragraphs: Vec<Paragraph>,
    current: Option<Paragraph>,
    bold_depth: u32,
    italic_depth: u32,
    underline_depth: u32,
    in_li: bool,
}

impl BuildCtx {
    fn style(&self) -> RunStyle {
        RunStyle {
            bold: self.bold_depth > 0,
            italic: self.italic_depth > 0,
            underline: self.underline_depth > 0,
        }
    }

    fn flush(&mut self) {
        let Some(mut p) = self.current.take() else {
            return;
        };
        while let Some(Segment::Text { text, .. }) = p.segments.first() {
            if text.trim().is_empty() {
                p.segments.remove(0);
            } else {
                break;
            }
        }
        while let Some(Segment::Text { text, .. }) = p.segments.last() {
            if text.trim().is_empty() {
                p.segments.pop();
            } else {
                break;
            }
        }
        if let Some(Segment::Text { text, .. }) = p.segments.first_mut() {
            *text = text.trim_start().to_string();
        }
        if let Some(Segment::Text { text, .. }) = p.segments.last_mut() {
            *text = text.trim_end().to_string();
        }
        if !p.segments.is_empty() {
            self.paragraphs.push(p);
        }
    }

    fn start_new_paragraph(&mut self, kind: BlockKind, id: Option<ElementId>) {
        self.flush();
        self.current = Some(Paragraph::new(kind, id));
    }

    fn current(&mut self) -> &mut Paragraph {
        self.current
            .get_or_insert_with(|| Paragraph::new(BlockKind::Normal, None))
    }

    fn emit_text(&mut self, raw: &str) {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return;
        }
        let style = self.style();
        let current = self.current();
        match current.segments.last_mut() {
            Some(Segment::Text { text: prev, style: s }) if *s == style => {
                if prev.ends_with(' ') && text.starts_with(' ') {
                    prev.push_str(&text[1..]);
                } else {
                    prev.push_str(&text);
                }
            }
            _ => current.segments.push(Segment::Text { text, style }),
        }
    }

    fn walk_children(&mut self, node: &Handle) {
        for c in node.children.borrow().iter() {
            self.walk(c);
        }
    }

    fn walk(&mut self, node: &Handle) {
        let (tag, id) = match &node.data {
            NodeData::Text { contents } => {
                self.emit_text(&contents.borrow());
                return;
            }
            NodeData::Element { name, attrs, .. } => {
                let id = attrs
                    .borrow()
                    .iter()
                    .find(|a| &*a.name.local == "id")
                    .map(|a| ElementId::from(a.value.to_string()));
                (name.local.to_string().to_ascii_lowercase(), id)
            }
            _ => return,
        };

        match tag.as_str() {
            "script" | "style" | "template" => {}
            "br" => self.current().segments.push(Segment::Break),
            "p" | "div" if self.in_li => {
                self.walk_children(node);
                self.emit_text(" ");
            }
            "p" | "div" | "blockquote" | "pre" | "td" | "th" | "dt" | "dd" => {
                self.block(node, BlockKind::Normal, id);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse().unwrap_or(1);
                self.block(node, BlockKind::Heading(level), id);
            }
            "li" => {
                let was = std::mem::replace(&mut self.in_li, true);
                self.block(node, BlockKind::ListItem, id);
                self.in_li = was;
            }
            "strong" | "b" => {
                self.bold_depth += 1;
                self.walk_children(node);
                self.bold_depth -= 1;
            }
            "em" | "i" => {
                self.italic_depth += 1;
                self.walk_children(node);
                self.italic_depth -= 1;
            }
            "u" => {
                self.underline_depth += 1;
                self.walk_children(node);
                self.underline_depth -= 1;
            }
            _ => self.walk_children(node),
        }
    }

    fn block(&mut self, node: &Handle, kind: BlockKind, id: Option<ElementId>) {
        self.start_new_paragraph(kind, id);
        self.walk_children(node);
        self.flush();
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

/// Flattens an HTML fragment into paragraphs. Inline content outside any
/// block element forms a paragraph of its own.
pub(crate) fn paragraphs_from_html(content: &str) -> Vec<Paragraph> {
    let mut ctx = BuildCtx::default();
    for node in parse_nodes(content, context_for(content)) {
        ctx.walk(&node);
    }
    ctx.flush();
    ctx.paragraphs
}

pub(crate) fn segment_runs(vocab: &Vocabulary, segments: &[Segment]) -> Vec<XmlElement> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        match seg {
            Segment::Break => {
                out.push(XmlElement::new(vocab.w("r")).with_child(XmlElement::new(vocab.w("br"))));
            }
            Segment::Text { text, style } => {
                if text.is_empty() {
                    continue;
                }
                let mut run = XmlElement::new(vocab.w("r"));
                if *style != RunStyle::default() {
                    let mut rpr = XmlElement::new(vocab.w("rPr"));
                    if style.bold {
                        rpr = rpr.with_child(XmlElement::new(vocab.w("b")));
                    }
                    if style.italic {
                        rpr = rpr.with_child(XmlElement::new(vocab.w("i")));
                    }
                    if style.underline {
                        rpr = rpr.with_child(XmlElement::new(vocab.w("u")).with_attr(vocab.w("val"), "single"));
                    }
                    run = run.with_child(rpr);
                }
                let mut t = XmlElement::new(vocab.w("t")).with_attr("xml:space", "preserve");
                t.children.push(XmlNode::Text(text.clone()));
                out.push(run.with_child(t));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn text(p: &Paragraph) -> String {
        p.segments
            .iter()
            .map(|s| match s {
                Segment::Text { text, .. } => text.as_str(),
                Segment::Break => "\n",
            })
            .collect()
    }

    #[test]
    fn blocks_become_paragraphs() {
        let ps = paragraphs_from_html(
            r#"<h2 id="p-0000ABCD">Title</h2><p>one
               two</p><ul><li>item <p>nested</p></li></ul>"#,
        );
        assert_eq!(ps.len(), 3);
        assert_eq!(ps[0].kind, BlockKind::Heading(2));
        assert_eq!(ps[0].id.as_ref().unwrap().as_str(), "p-0000ABCD");
        assert_eq!(text(&ps[1]), "one two");
        assert_eq!(ps[2].kind, BlockKind::ListItem);
        assert_eq!(text(&ps[2]), "item nested");
    }

    #[test]
    fn inline_formatting_and_breaks() {
        let ps = paragraphs_from_html("<p>a <strong>b <em>c</em></strong><br><u>d</u></p>");
        assert_eq!(ps.len(), 1);
        let segs = &ps[0].segments;
        assert_eq!(
            segs[1],
            Segment::Text {
                text: "b ".into(),
                style: RunStyle { bold: true, ..Default::default() }
            }
        );
        assert_eq!(
            segs[2],
            Segment::Text {
                text: "c".into(),
                style: RunStyle { bold: true, italic: true, underline: false }
            }
        );
        assert_eq!(segs[3], Segment::Break);
    }

    #[test]
    fn bare_text_is_one_paragraph() {
        let ps = paragraphs_from_html("  New text  ");
        assert_eq!(ps.len(), 1);
        assert_eq!(ps[0].kind, BlockKind::Normal);
        assert_eq!(text(&ps[0]), "New text");
        assert!(paragraphs_from_html("<p>  </p>").is_empty());
    }

    #[test]
    fn leading_table_cells_become_paragraphs() {
        let ps = paragraphs_from_html("<tr><td>a</td><th>b</th></tr>");
        assert_eq!(ps.iter().map(text).collect::<Vec<_>>(), vec!["a", "b"]);
        let ps = paragraphs_from_html("<td>x</td><td>y</td>");
        assert_eq!(ps.len(), 2);
    }

    #[test]
    fn builds_wordml_runs() {
        let root = XmlDocument::parse(
            br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#,
        )
        .unwrap()
        .root;
        let vocab = Vocabulary::from_root(&root);
        let ps = paragraphs_from_html("<p><b>x</b> &amp; y</p>");
        let runs = ps[0].runs(&vocab);
        assert_eq!(runs.len(), 2);
        assert!(runs[0].child("w:rPr").unwrap().child("w:b").is_some());
        assert_eq!(vocab.run_text(&runs[1]), " & y");
        assert!(runs[1].child("w:rPr").is_none());
    }
}
