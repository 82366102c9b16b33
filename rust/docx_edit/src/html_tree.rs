//! The HTML preview as an addressable tree over an `RcDom`.

use crate::engine::{AddressableTree, Placement};
use crate::error::{Error, Result};
use crate::ident::{ElementId, IdPrefix};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{ns, parse_document, parse_fragment};
use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};
use std::cell::RefCell;
use std::rc::Rc;

pub struct HtmlTree {
    dom: RcDom,
}

impl HtmlTree {
    pub fn parse(html: &str) -> Self {
        Self {
            dom: parse_document(RcDom::default(), Default::default()).one(html),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for c in self.dom.document.children.borrow().iter() {
            serialize_node(&mut out, c);
            if matches!(c.data, NodeData::Doctype { .. }) {
                out.push('\n');
            }
        }
        out
    }

    /// Parent and child index of the element whose `id` equals `target`.
    fn locate(&self, target: &ElementId) -> Option<(Handle, usize)> {
        fn walk(node: &Handle, id: &str) -> Option<(Handle, usize)> {
            for (i, c) in node.children.borrow().iter().enumerate() {
                if attr(c, "id").as_deref() == Some(id) {
                    return Some((node.clone(), i));
                }
                if let Some(found) = walk(c, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.dom.document, target.as_str())
    }

    fn require(&self, target: &ElementId) -> Result<(Handle, usize)> {
        self.locate(target)
            .ok_or_else(|| Error::TargetNotFound(target.to_string()))
    }

    pub fn contains(&self, target: &ElementId) -> bool {
        self.locate(target).is_some()
    }

    /// Every `id` attribute in document order.
    pub fn ids(&self) -> Vec<String> {
        fn walk(node: &Handle, out: &mut Vec<String>) {
            if let Some(id) = attr(node, "id") {
                out.push(id);
            }
            for c in node.children.borrow().iter() {
                walk(c, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.dom.document, &mut out);
        out
    }

    pub fn tag_of(&self, target: &ElementId) -> Option<String> {
        let (parent, i) = self.locate(target)?;
        let node = parent.children.borrow().get(i).cloned()?;
        tag(&node)
    }

    pub fn text_of(&self, target: &ElementId) -> Option<String> {
        let (parent, i) = self.locate(target)?;
        let node = parent.children.borrow().get(i).cloned()?;
        Some(text_content(&node))
    }

    /// Ids of the element children of `target`, in order.
    pub fn child_ids(&self, target: &ElementId) -> Option<Vec<String>> {
        let (parent, i) = self.locate(target)?;
        let node = parent.children.borrow().get(i).cloned()?;
        let ids = node
            .children
            .borrow()
            .iter()
            .filter_map(|c| attr(c, "id"))
            .collect();
        Some(ids)
    }
}

impl AddressableTree for HtmlTree {
    fn replace(&mut self, target: &ElementId, content: &str) -> Result<()> {
        let (parent, i) = self.require(target)?;
        let Some(node) = parent.children.borrow().get(i).cloned() else {
            return Err(Error::TargetNotFound(target.to_string()));
        };

        let context = tag(&node).unwrap_or_else(|| "body".to_string());
        let mut fragment = fragment_nodes(content, &context);
        if is_paragraph_tag(&context) {
            fragment = merge_blocks(fragment);
        } else if let [only] = fragment.as_slice() {
            if tag(only).as_deref() == Some(context.as_str()) {
                fragment = take_children(only);
            }
        }

        for old in node.children.borrow_mut().drain(..) {
            old.parent.set(None);
        }
        for new in &fragment {
            new.parent.set(Some(Rc::downgrade(&node)));
        }
        node.children.borrow_mut().extend(fragment);
        Ok(())
    }

    fn insert(&mut self, target: &ElementId, placement: Placement, content: &str) -> Result<()> {
        let (parent, i) = self.require(target)?;
        let context = tag(&parent)
            .filter(|t| t != "html")
            .unwrap_or_else(|| "body".to_string());
        let fragment: Vec<Handle> = fragment_nodes(content, &context)
            .into_iter()
            .filter(|n| !is_blank_text(n))
            .collect();

        for new in &fragment {
            new.parent.set(Some(Rc::downgrade(&parent)));
        }
        let at = match placement {
            Placement::Before => i,
            Placement::After => i + 1,
        };
        parent.children.borrow_mut().splice(at..at, fragment);
        Ok(())
    }

    fn delete(&mut self, target: &ElementId) -> Result<()> {
        let (parent, i) = self.require(target)?;
        let removed = parent.children.borrow_mut().remove(i);
        removed.parent.set(None);
        Ok(())
    }
}

/// Parses `content` as the children of a `context` element, detaches the
/// resulting nodes and gives every addressable element without an `id` a
/// fresh one.
fn fragment_nodes(content: &str, context: &str) -> Vec<Handle> {
    let nodes = parse_nodes(content, context);
    for n in &nodes {
        assign_missing_ids(n);
    }
    nodes
}

/// HTML5 fragment parse of `content` inside a `context` element.
pub(crate) fn parse_nodes(content: &str, context: &str) -> Vec<Handle> {
    let name = QualName::new(None, ns!(html), LocalName::from(context));
    let dom = parse_fragment(RcDom::default(), Default::default(), name, Vec::new(), false)
        .one(content);
    let root = dom.document.children.borrow().first().cloned();
    root.map(|r| take_children(&r)).unwrap_or_default()
}

/// Context element a free-standing fragment is parsed in. Table rows and
/// cells are only kept inside a table section or a row.
pub(crate) fn context_for(content: &str) -> &'static str {
    let Some(rest) = content.trim_start().strip_prefix('<') else {
        return "body";
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match name.as_str() {
        "tr" => "tbody",
        "td" | "th" => "tr",
        "tbody" | "thead" | "tfoot" | "caption" | "colgroup" => "table",
        _ => "body",
    }
}

/// Content with every addressable element stamped with an `id`.
pub(crate) fn stamp_fragment(content: &str) -> String {
    let mut out = String::new();
    for n in fragment_nodes(content, context_for(content)) {
        serialize_node(&mut out, &n);
    }
    out
}

/// Folds block content into inline content for a paragraph-like target.
/// Each block keeps its inline children, blocks are separated by `<br>`
/// and the ids of folded blocks go with them. The package merges the same
/// blocks into one paragraph, so neither side gains an id the other lacks.
fn merge_blocks(nodes: Vec<Handle>) -> Vec<Handle> {
    let mut lines = Vec::new();
    let mut loose = Vec::new();
    fold_blocks(nodes, &mut lines, &mut loose);
    push_line(&mut lines, loose);

    let mut out = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            out.push(element("br"));
        }
        out.extend(line);
    }
    out
}

fn fold_blocks(nodes: Vec<Handle>, lines: &mut Vec<Vec<Handle>>, loose: &mut Vec<Handle>) {
    for n in nodes {
        if tag(&n).is_some_and(|t| is_block_tag(&t)) {
            push_line(lines, std::mem::take(loose));
            let mut inner = Vec::new();
            fold_blocks(take_children(&n), lines, &mut inner);
            push_line(lines, inner);
        } else {
            loose.push(n);
        }
    }
}

fn push_line(lines: &mut Vec<Vec<Handle>>, line: Vec<Handle>) {
    if !line.iter().all(is_blank_text) {
        lines.push(line);
    }
}

fn element(name: &str) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn assign_missing_ids(node: &Handle) {
    if let NodeData::Element { name, attrs, .. } = &node.data {
        let has_id = attrs.borrow().iter().any(|a| &*a.name.local == "id");
        if !has_id {
            if let Some(prefix) = IdPrefix::for_tag(&name.local) {
                attrs.borrow_mut().push(Attribute {
                    name: QualName::new(None, Namespace::from(""), LocalName::from("id")),
                    value: StrTendril::from_slice(ElementId::fresh(prefix).as_str()),
                });
            }
        }
    }
    for c in node.children.borrow().iter() {
        assign_missing_ids(c);
    }
}

fn take_children(node: &Handle) -> Vec<Handle> {
    let children: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for c in &children {
        c.parent.set(None);
    }
    children
}

fn tag(h: &Handle) -> Option<String> {
    match &h.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

fn attr(h: &Handle, key: &str) -> Option<String> {
    match &h.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Tags the package holds as a single paragraph.
fn is_paragraph_tag(tag: &str) -> bool {
    matches!(tag, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li")
}

fn is_block_tag(tag: &str) -> bool {
    is_paragraph_tag(tag)
        || matches!(
            tag,
            "div" | "blockquote" | "pre" | "ul" | "ol" | "dl" | "dt" | "dd" | "table" | "thead"
                | "tbody" | "tfoot" | "tr" | "td" | "th"
        )
}

fn is_blank_text(h: &Handle) -> bool {
    match &h.data {
        NodeData::Text { contents } => contents.borrow().trim().is_empty(),
        _ => false,
    }
}

fn text_content(h: &Handle) -> String {
    let mut out = String::new();
    fn walk(h: &Handle, out: &mut String) {
        if let NodeData::Text { contents } = &h.data {
            out.push_str(&contents.borrow());
        }
        for c in h.children.borrow().iter() {
            walk(c, out);
        }
    }
    walk(h, &mut out);
    out
}

fn esc_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn esc_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn serialize_node(out: &mut String, node: &Handle) {
    match &node.data {
        NodeData::Document => {
            for c in node.children.borrow().iter() {
                serialize_node(out, c);
            }
        }
        NodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text { contents } => out.push_str(&esc_text(&contents.borrow())),
        NodeData::Comment { contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        }
        NodeData::ProcessingInstruction { .. } => {}
        NodeData::Element { name, attrs, .. } => {
            let tag = &*name.local;
            out.push('<');
            out.push_str(tag);
            for a in attrs.borrow().iter() {
                out.push(' ');
                out.push_str(&a.name.local);
                out.push_str("=\"");
                out.push_str(&esc_attr(&a.value));
                out.push('"');
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            for c in node.children.borrow().iter() {
                match &c.data {
                    NodeData::Text { contents } if is_raw_text(tag) => {
                        out.push_str(&contents.borrow())
                    }
                    _ => serialize_node(out, c),
                }
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
