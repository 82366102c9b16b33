//! Owned, mutable XML element tree for package parts.
//!
//! Names are kept as qualified strings (`w:p`, `w14:paraId`) exactly as they
//! appear in the part, so serialization reproduces the source prefixes.

use crate::error::{Error, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map(|(_, l)| l).unwrap_or(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated character data of the whole subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        fn walk(el: &XmlElement, out: &mut String) {
            for c in &el.children {
                match c {
                    XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                    XmlNode::Element(e) => walk(e, out),
                    XmlNode::Comment(_) => {}
                }
            }
        }
        walk(self, &mut out);
        out
    }

    /// Child-index path (into `children`) of the first descendant, in
    /// document order, matching `pred`.
    pub fn find_path(&self, pred: &impl Fn(&XmlElement) -> bool) -> Option<Vec<usize>> {
        for (i, c) in self.children.iter().enumerate() {
            if let XmlNode::Element(e) = c {
                if pred(e) {
                    return Some(vec![i]);
                }
                if let Some(mut rest) = e.find_path(pred) {
                    rest.insert(0, i);
                    return Some(rest);
                }
            }
        }
        None
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&XmlElement> {
        let mut cur = self;
        for &i in path {
            cur = match cur.children.get(i) {
                Some(XmlNode::Element(e)) => e,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut cur = self;
        for &i in path {
            cur = match cur.children.get_mut(i) {
                Some(XmlNode::Element(e)) => e,
                _ => return None,
            };
        }
        Some(cur)
    }
}

/// A parsed part: optional declaration plus the root element.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub has_decl: bool,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn parse(input: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(input)
            .map_err(|e| Error::MalformedPackage(format!("part is not UTF-8: {e}")))?;
        let mut reader = Reader::from_str(text);

        let mut has_decl = false;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Decl(_) => has_decl = true,
                Event::Start(e) => stack.push(start_element(&e)?),
                Event::Empty(e) => {
                    let el = start_element(&e)?;
                    attach(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| Error::MalformedPackage("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, el);
                }
                Event::Text(t) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(t.unescape()?.into_owned()));
                    }
                }
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let s = String::from_utf8_lossy(&c).into_owned();
                        parent.children.push(XmlNode::CData(s));
                    }
                }
                Event::Comment(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let s = String::from_utf8_lossy(&c).into_owned();
                        parent.children.push(XmlNode::Comment(s));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::MalformedPackage("unclosed element".into()));
        }
        let root = root.ok_or_else(|| Error::MalformedPackage("no root element".into()))?;
        Ok(Self { has_decl, root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        if self.has_decl {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut el = XmlElement::new(name);
    for a in e.attributes() {
        let a = a?;
        let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
        let value = a.unescape_value()?.into_owned();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => *root = Some(el),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for c in &el.children {
        match c {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            XmlNode::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            XmlNode::Comment(t) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}
