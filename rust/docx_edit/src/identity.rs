//! Gives every paragraph of a package a persistent `w14:paraId`.

use crate::error::Result;
use crate::ident::ParagraphIdentity;
use crate::package::{Package, DOCUMENT_PART};
use crate::wordml::Vocabulary;
use crate::xml::XmlDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Paragraph position (0-based, document order, table paragraphs included)
/// to identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap(BTreeMap<usize, ParagraphIdentity>);

impl IdentityMap {
    pub fn get(&self, position: usize) -> Option<&ParagraphIdentity> {
        self.0.get(&position)
    }

    pub fn insert(&mut self, position: usize, identity: ParagraphIdentity) {
        self.0.insert(position, identity);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ParagraphIdentity)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

#[derive(Debug, Clone)]
pub struct AssignedPackage {
    pub bytes: Vec<u8>,
    pub identities: IdentityMap,
    /// How many paragraphs received a freshly minted identity.
    pub minted: usize,
}

/// Identities already present in the package; paragraphs without one are
/// absent from the map.
pub fn extract_identities(package_bytes: &[u8]) -> Result<IdentityMap> {
    let package = Package::from_bytes(package_bytes)?;
    let doc = XmlDocument::parse(package.document_part()?)?;
    let vocab = Vocabulary::from_root(&doc.root);

    let mut map = IdentityMap::default();
    let mut position = 0;
    vocab.for_each_paragraph(&doc.root, &mut |p| {
        if let Some(id) = vocab.paragraph_identity(p) {
            map.insert(position, ParagraphIdentity::parse_lenient(id));
        }
        position += 1;
    });
    Ok(map)
}

/// Returns the package with an identity on every paragraph, plus the
/// position mapping. Existing identities are kept verbatim.
pub fn assign_identities(package_bytes: &[u8]) -> Result<AssignedPackage> {
    let mut package = Package::from_bytes(package_bytes)?;
    let mut doc = XmlDocument::parse(package.document_part()?)?;
    let mut vocab = Vocabulary::from_root(&doc.root);
    let para_id = vocab.para_id_attr();
    let text_id = vocab.text_id_attr();

    let mut identities = IdentityMap::default();
    let mut position = 0;
    let mut minted = 0;
    vocab.for_each_paragraph_mut(&mut doc.root, &mut |p| {
        let identity = match p.attr(&para_id).filter(|v| !v.is_empty()) {
            Some(existing) => ParagraphIdentity::parse_lenient(existing),
            None => {
                let fresh = ParagraphIdentity::mint();
                p.set_attr(para_id.as_str(), fresh.as_str());
                if p.attr(&text_id).is_none() {
                    p.set_attr(text_id.as_str(), ParagraphIdentity::mint().as_str());
                }
                minted += 1;
                fresh
            }
        };
        identities.insert(position, identity);
        position += 1;
    });

    debug!(paragraphs = position, minted, "assigned paragraph identities");
    if minted == 0 {
        return Ok(AssignedPackage {
            bytes: package_bytes.to_vec(),
            identities,
            minted,
        });
    }

    vocab.declare_w14(&mut doc.root);
    package.set_part(DOCUMENT_PART, doc.to_bytes()?);
    Ok(AssignedPackage {
        bytes: package.to_bytes()?,
        identities,
        minted,
    })
}

/// Reads `input`, writes the identity-bearing package to `output`.
/// `input` itself is never modified.
pub fn assign_identities_to_file(input: &Path, output: &Path) -> Result<IdentityMap> {
    let mut bytes = Vec::new();
    File::open(input)?.read_to_end(&mut bytes)?;
    let assigned = assign_identities(&bytes)?;
    File::create(output)?.write_all(&assigned.bytes)?;
    Ok(assigned.identities)
}
