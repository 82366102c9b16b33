//! The package's document part as an addressable tree of paragraphs.
//!
//! Only `p-` and `li-` targets are addressable: the token is matched against
//! `w14:paraId` and the prefix must be the one the preview gives that
//! paragraph. Every other prefix is reported as unsupported.

use crate::engine::{AddressableTree, Placement};
use crate::error::{Error, Result};
use crate::fragment::{paragraphs_from_html, segment_runs, BlockKind, Paragraph, Segment};
use crate::ident::{ElementId, IdPrefix, ParagraphIdentity};
use crate::package::{Package, DOCUMENT_PART};
use crate::wordml::{heading_level, StyleSheet, Vocabulary};
use crate::xml::{XmlDocument, XmlElement, XmlNode};
use tracing::debug;

pub struct DocxTree {
    package: Package,
    document: XmlDocument,
    vocab: Vocabulary,
    styles: StyleSheet,
}

impl DocxTree {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        let document = XmlDocument::parse(package.document_part()?)?;
        let vocab = Vocabulary::from_root(&document.root);
        let styles = StyleSheet::from_package(&package)?;
        Ok(Self {
            package,
            document,
            vocab,
            styles,
        })
    }

    /// Serializes the edited document part back into the package.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.package.set_part(DOCUMENT_PART, self.document.to_bytes()?);
        self.package.to_bytes()
    }

    /// Paragraph identities in document order.
    pub fn identities(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.vocab.for_each_paragraph(&self.document.root, &mut |p| {
            if let Some(id) = self.vocab.paragraph_identity(p) {
                out.push(id.to_string());
            }
        });
        out
    }

    pub fn paragraph_text(&self, identity: &str) -> Option<String> {
        let path = self.path_of(identity)?;
        let p = self.document.root.element_at(&path)?;
        Some(self.vocab.paragraph_plain_text(p))
    }

    fn path_of(&self, identity: &str) -> Option<Vec<usize>> {
        let vocab = &self.vocab;
        self.document
            .root
            .find_path(&|e: &XmlElement| vocab.is(e, "p") && vocab.paragraph_identity(e) == Some(identity))
    }

    /// Prefix the preview gives a paragraph: numbered paragraphs that are
    /// not headings are list items.
    fn preview_prefix(&self, p: &XmlElement) -> IdPrefix {
        let heading = self
            .styles
            .paragraph_style_name(self.vocab.style_id(p))
            .as_deref()
            .and_then(heading_level)
            .is_some();
        if !heading && self.vocab.numbering(p).is_some() {
            IdPrefix::ListItem
        } else {
            IdPrefix::Paragraph
        }
    }

    /// Path to the paragraph a `p-`/`li-` target names.
    fn require(&self, target: &ElementId) -> Result<Vec<usize>> {
        let prefix = match target.prefix() {
            Some(prefix @ (IdPrefix::Paragraph | IdPrefix::ListItem)) => prefix,
            _ => return Err(Error::UnsupportedTarget(target.to_string())),
        };
        target
            .token()
            .and_then(|token| self.path_of(token))
            .filter(|path| {
                self.document
                    .root
                    .element_at(path)
                    .is_some_and(|p| self.preview_prefix(p) == prefix)
            })
            .ok_or_else(|| Error::TargetNotFound(target.to_string()))
    }

    fn paragraph_mut(&mut self, path: &[usize]) -> Result<&mut XmlElement> {
        self.document
            .root
            .element_at_mut(path)
            .ok_or_else(|| Error::MalformedPackage("paragraph path went stale".into()))
    }

    fn parent_mut(&mut self, path: &[usize]) -> Result<(&mut XmlElement, usize)> {
        let (index, parent_path) = path
            .split_last()
            .ok_or_else(|| Error::MalformedPackage("paragraph at document root".into()))?;
        let parent = self.paragraph_mut(parent_path)?;
        Ok((parent, *index))
    }

    /// New `w:p` for one fragment paragraph, next to `target`.
    fn build_paragraph(&self, fragment: &Paragraph, target: &XmlElement) -> XmlElement {
        let identity = fragment
            .id
            .as_ref()
            .and_then(ElementId::paragraph_identity)
            .unwrap_or_else(ParagraphIdentity::mint);

        let mut p = XmlElement::new(self.vocab.w("p"))
            .with_attr(self.vocab.para_id_attr(), identity.as_str())
            .with_attr(self.vocab.text_id_attr(), ParagraphIdentity::mint().as_str());

        match fragment.kind {
            BlockKind::Heading(level) => {
                let fallback = format!("Heading{level}");
                let style = self
                    .styles
                    .style_id_for(&format!("Heading {level}"))
                    .unwrap_or(fallback.as_str());
                let ppr = XmlElement::new(self.vocab.w("pPr")).with_child(
                    XmlElement::new(self.vocab.w("pStyle")).with_attr(self.vocab.w("val"), style),
                );
                p = p.with_child(ppr);
            }
            BlockKind::ListItem if self.vocab.has_numbering(target) => {
                if let Some(ppr) = self.vocab.properties(target) {
                    p = p.with_child(ppr.clone());
                }
            }
            BlockKind::ListItem | BlockKind::Normal => {}
        }

        for run in fragment.runs(&self.vocab) {
            p = p.with_child(run);
        }
        p
    }
}

impl AddressableTree for DocxTree {
    fn supports(&self, target: &ElementId) -> bool {
        matches!(
            target.prefix(),
            Some(IdPrefix::Paragraph | IdPrefix::ListItem)
        )
    }

    /// Keeps the paragraph's properties and identity; every fragment block
    /// lands in the one paragraph, separated by breaks.
    fn replace(&mut self, target: &ElementId, content: &str) -> Result<()> {
        let path = self.require(target)?;
        let mut segments = Vec::new();
        for (i, para) in paragraphs_from_html(content).into_iter().enumerate() {
            if i > 0 {
                segments.push(Segment::Break);
            }
            segments.extend(para.segments);
        }
        let runs = segment_runs(&self.vocab, &segments);

        let vocab = self.vocab.clone();
        let p = self.paragraph_mut(&path)?;
        p.children
            .retain(|c| matches!(c, XmlNode::Element(e) if vocab.is(e, "pPr")));
        p.children.extend(runs.into_iter().map(XmlNode::Element));
        debug!(%target, "replaced paragraph content");
        Ok(())
    }

    fn insert(&mut self, target: &ElementId, placement: Placement, content: &str) -> Result<()> {
        let path = self.require(target)?;
        let target_el = self.paragraph_mut(&path)?.clone();
        let new: Vec<XmlNode> = paragraphs_from_html(content)
            .iter()
            .map(|frag| XmlNode::Element(self.build_paragraph(frag, &target_el)))
            .collect();
        if new.is_empty() {
            return Ok(());
        }

        self.vocab.declare_w14(&mut self.document.root);

        let count = new.len();
        let (parent, index) = self.parent_mut(&path)?;
        let at = match placement {
            Placement::Before => index,
            Placement::After => index + 1,
        };
        parent.children.splice(at..at, new);
        debug!(%target, count, "inserted paragraphs");
        Ok(())
    }

    fn delete(&mut self, target: &ElementId) -> Result<()> {
        let path = self.require(target)?;
        let vocab = self.vocab.clone();
        let (parent, index) = self.parent_mut(&path)?;
        parent.children.remove(index);

        // A table cell must keep at least one paragraph.
        if vocab.is(parent, "tc") && !parent.elements().any(|e| vocab.is(e, "p")) {
            parent.children.push(XmlNode::Element(
                XmlElement::new(vocab.w("p"))
                    .with_attr(vocab.para_id_attr(), ParagraphIdentity::mint().as_str())
                    .with_attr(vocab.text_id_attr(), ParagraphIdentity::mint().as_str()),
            ));
        }
        debug!(%target, "deleted paragraph");
        Ok(())
    }
}
