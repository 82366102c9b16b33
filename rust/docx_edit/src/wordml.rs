//! WordprocessingML vocabulary: namespace prefixes, paragraphs, runs,
//! styles and numbering definitions.

use crate::error::Result;
use crate::package::{Package, NUMBERING_PART, STYLES_PART};
use crate::xml::{XmlDocument, XmlElement, XmlNode};
use std::collections::HashMap;

pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_W14: &str = "http://schemas.microsoft.com/office/word/2010/wordml";

/// Prefixes a part binds to the main and 2010 wordml namespaces.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    w: String,
    w14: String,
    w14_declared: bool,
}

impl Vocabulary {
    pub fn from_root(root: &XmlElement) -> Self {
        let bound = |ns: &str| {
            root.attrs
                .iter()
                .find(|(k, v)| v == ns && k.starts_with("xmlns:"))
                .map(|(k, _)| k["xmlns:".len()..].to_string())
        };
        let w14 = bound(NS_W14);
        Self {
            w: bound(NS_W).unwrap_or_else(|| "w".to_string()),
            w14_declared: w14.is_some(),
            w14: w14.unwrap_or_else(|| "w14".to_string()),
        }
    }

    /// Declares the 2010 wordml namespace on `root` when the part lacks it.
    pub fn declare_w14(&mut self, root: &mut XmlElement) {
        if !self.w14_declared {
            root.set_attr(format!("xmlns:{}", self.w14), NS_W14);
            self.w14_declared = true;
        }
    }

    pub fn w(&self, local: &str) -> String {
        format!("{}:{}", self.w, local)
    }

    pub fn is(&self, el: &XmlElement, local: &str) -> bool {
        el.prefix() == Some(self.w.as_str()) && el.local_name() == local
    }

    pub fn para_id_attr(&self) -> String {
        format!("{}:paraId", self.w14)
    }

    pub fn text_id_attr(&self) -> String {
        format!("{}:textId", self.w14)
    }

    pub fn val<'a>(&self, el: &'a XmlElement) -> Option<&'a str> {
        el.attr(&self.w("val"))
    }

    fn child<'a>(&self, el: &'a XmlElement, local: &str) -> Option<&'a XmlElement> {
        el.elements().find(|c| self.is(c, local))
    }

    pub fn paragraph_identity<'a>(&self, p: &'a XmlElement) -> Option<&'a str> {
        p.attr(&self.para_id_attr()).filter(|v| !v.is_empty())
    }

    pub fn properties<'a>(&self, p: &'a XmlElement) -> Option<&'a XmlElement> {
        self.child(p, "pPr")
    }

    pub fn style_id<'a>(&self, p: &'a XmlElement) -> Option<&'a str> {
        let style = self.child(self.properties(p)?, "pStyle")?;
        self.val(style)
    }

    /// `(numId, ilvl)` of a paragraph's own numbering properties.
    pub fn numbering<'a>(&self, p: &'a XmlElement) -> Option<(&'a str, &'a str)> {
        let num_pr = self.child(self.properties(p)?, "numPr")?;
        let num_id = self.child(num_pr, "numId").and_then(|e| self.val(e)).unwrap_or("0");
        let ilvl = self.child(num_pr, "ilvl").and_then(|e| self.val(e)).unwrap_or("0");
        Some((num_id, ilvl))
    }

    pub fn has_numbering(&self, p: &XmlElement) -> bool {
        self.properties(p)
            .map(|ppr| self.child(ppr, "numPr").is_some())
            .unwrap_or(false)
    }

    /// Runs of a paragraph: direct `w:r` children plus runs wrapped in
    /// hyperlinks, insertions and smart tags.
    pub fn runs<'a>(&self, p: &'a XmlElement) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        for c in p.elements() {
            if self.is(c, "r") {
                out.push(c);
            } else if self.is(c, "hyperlink") || self.is(c, "ins") || self.is(c, "smartTag") {
                out.extend(c.elements().filter(|r| self.is(r, "r")));
            }
        }
        out
    }

    pub fn run_text(&self, run: &XmlElement) -> String {
        let mut out = String::new();
        for c in run.elements() {
            match c.local_name() {
                "t" if self.is(c, "t") => out.push_str(&c.text()),
                "tab" if self.is(c, "tab") => out.push('\t'),
                "br" | "cr" if c.prefix() == Some(self.w.as_str()) => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    pub fn run_format(&self, run: &XmlElement) -> RunFormat {
        let Some(rpr) = self.child(run, "rPr") else {
            return RunFormat::default();
        };
        let toggle = |local: &str| {
            self.child(rpr, local)
                .map(|e| !matches!(self.val(e), Some("0" | "false" | "off")))
                .unwrap_or(false)
        };
        RunFormat {
            bold: toggle("b"),
            italic: toggle("i"),
            underline: self
                .child(rpr, "u")
                .map(|e| self.val(e) != Some("none"))
                .unwrap_or(false),
        }
    }

    pub fn paragraph_plain_text(&self, p: &XmlElement) -> String {
        self.runs(p).iter().map(|r| self.run_text(r)).collect()
    }

    /// Number of paragraphs in the subtree rooted at `el`, `el` included.
    pub fn count_paragraphs(&self, el: &XmlElement) -> usize {
        let own = usize::from(self.is(el, "p"));
        own + el.elements().map(|c| self.count_paragraphs(c)).sum::<usize>()
    }

    /// Visits every paragraph of the subtree in document order.
    pub fn for_each_paragraph_mut(&self, el: &mut XmlElement, f: &mut impl FnMut(&mut XmlElement)) {
        if self.is(el, "p") {
            f(el);
        }
        for c in el.children.iter_mut() {
            if let XmlNode::Element(e) = c {
                self.for_each_paragraph_mut(e, f);
            }
        }
    }

    pub fn for_each_paragraph<'a>(&self, el: &'a XmlElement, f: &mut impl FnMut(&'a XmlElement)) {
        if self.is(el, "p") {
            f(el);
        }
        for c in el.elements() {
            self.for_each_paragraph(c, f);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// Paragraph style names from `word/styles.xml`.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleSheet {
    pub fn from_package(package: &Package) -> Result<Self> {
        let Some(bytes) = package.part(STYLES_PART) else {
            return Ok(Self::default());
        };
        let doc = XmlDocument::parse(bytes)?;
        let vocab = Vocabulary::from_root(&doc.root);

        let mut sheet = Self::default();
        for style in doc.root.elements().filter(|e| vocab.is(e, "style")) {
            if style.attr(&vocab.w("type")) != Some("paragraph") {
                continue;
            }
            let Some(id) = style.attr(&vocab.w("styleId")) else {
                continue;
            };
            let name = vocab
                .child(style, "name")
                .and_then(|n| vocab.val(n))
                .map(ui_name)
                .unwrap_or_else(|| id.to_string());
            if matches!(style.attr(&vocab.w("default")), Some("1" | "true" | "on")) {
                sheet.default_paragraph = Some(id.to_string());
            }
            sheet.names.insert(id.to_string(), name);
        }
        Ok(sheet)
    }

    /// Display name of the paragraph's style; unstyled paragraphs take the
    /// default paragraph style.
    pub fn paragraph_style_name(&self, style_id: Option<&str>) -> Option<String> {
        let id = style_id.or(self.default_paragraph.as_deref())?;
        Some(self.names.get(id).cloned().unwrap_or_else(|| id.to_string()))
    }

    /// Style id whose display name is `name`, if the sheet defines one.
    pub fn style_id_for(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| id.as_str())
    }
}

/// Built-in style names are stored lower-case ("heading 1"); the UI shows
/// them capitalised ("Heading 1").
fn ui_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Heading level encoded by a style name such as `Heading 2`.
pub fn heading_level(style_name: &str) -> Option<u8> {
    let rest = style_name.strip_prefix("Heading")?;
    let level: u8 = rest.split_whitespace().last()?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered,
}

/// Resolves `numId`/`ilvl` pairs to a list kind through `word/numbering.xml`.
#[derive(Debug, Clone, Default)]
pub struct Numbering {
    num_to_abstract: HashMap<String, String>,
    formats: HashMap<(String, String), String>,
}

impl Numbering {
    pub fn from_package(package: &Package) -> Result<Self> {
        let Some(bytes) = package.part(NUMBERING_PART) else {
            return Ok(Self::default());
        };
        let doc = XmlDocument::parse(bytes)?;
        let vocab = Vocabulary::from_root(&doc.root);

        let mut out = Self::default();
        for el in doc.root.elements() {
            if vocab.is(el, "abstractNum") {
                let Some(abs_id) = el.attr(&vocab.w("abstractNumId")) else {
                    continue;
                };
                for lvl in el.elements().filter(|e| vocab.is(e, "lvl")) {
                    let ilvl = lvl.attr(&vocab.w("ilvl")).unwrap_or("0");
                    if let Some(fmt) = vocab.child(lvl, "numFmt").and_then(|f| vocab.val(f)) {
                        out.formats
                            .insert((abs_id.to_string(), ilvl.to_string()), fmt.to_string());
                    }
                }
            } else if vocab.is(el, "num") {
                let num_id = el.attr(&vocab.w("numId"));
                let abs = vocab.child(el, "abstractNumId").and_then(|a| vocab.val(a));
                if let (Some(num_id), Some(abs)) = (num_id, abs) {
                    out.num_to_abstract.insert(num_id.to_string(), abs.to_string());
                }
            }
        }
        Ok(out)
    }

    pub fn kind(&self, num_id: &str, ilvl: &str) -> ListKind {
        let format = self
            .num_to_abstract
            .get(num_id)
            .and_then(|abs| self.formats.get(&(abs.clone(), ilvl.to_string())));
        match format.map(String::as_str) {
            None | Some("bullet") | Some("none") => ListKind::Bullet,
            Some(_) => ListKind::Ordered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> XmlElement {
        XmlDocument::parse(xml.as_bytes()).unwrap().root
    }

    #[test]
    fn resolves_bound_prefixes() {
        let root = parse(&format!(r#"<x:document xmlns:x="{NS_W}" xmlns:n="{NS_W14}"/>"#));
        let vocab = Vocabulary::from_root(&root);
        assert_eq!(vocab.w("p"), "x:p");
        assert_eq!(vocab.para_id_attr(), "n:paraId");
    }

    #[test]
    fn declares_missing_w14() {
        let mut root = parse(&format!(r#"<w:document xmlns:w="{NS_W}"/>"#));
        let mut vocab = Vocabulary::from_root(&root);
        vocab.declare_w14(&mut root);
        vocab.declare_w14(&mut root);
        assert_eq!(root.attr("xmlns:w14"), Some(NS_W14));
        assert_eq!(root.attrs.len(), 2);
    }

    #[test]
    fn reads_run_text_and_format() {
        let p = parse(&format!(
            r#"<w:p xmlns:w="{NS_W}"><w:r><w:rPr><w:b/><w:i w:val="0"/><w:u w:val="single"/></w:rPr><w:t>a</w:t><w:tab/><w:t>b</w:t></w:r><w:hyperlink><w:r><w:t>c</w:t></w:r></w:hyperlink></w:p>"#
        ));
        let vocab = Vocabulary::from_root(&p);
        let runs = vocab.runs(&p);
        assert_eq!(runs.len(), 2);
        assert_eq!(vocab.run_text(runs[0]), "a\tb");
        let fmt = vocab.run_format(runs[0]);
        assert!(fmt.bold && !fmt.italic && fmt.underline);
        assert_eq!(vocab.paragraph_plain_text(&p), "a\tbc");
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading_level("Heading 1"), Some(1));
        assert_eq!(heading_level("Heading 6"), Some(6));
        assert_eq!(heading_level("Heading 7"), None);
        assert_eq!(heading_level("Heading"), None);
        assert_eq!(heading_level("Normal"), None);
        assert_eq!(ui_name("heading 2"), "Heading 2");
    }
}
