//! The package container: an ordered set of named parts in a ZIP archive.

use crate::error::{Error, Result};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const NUMBERING_PART: &str = "word/numbering.xml";

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
    stored: bool,
    is_dir: bool,
}

/// In-memory copy of every entry of a package, in archive order.
#[derive(Debug, Clone)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::MalformedPackage(format!("not a zip container: {e}")))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::MalformedPackage(format!("unreadable entry #{i}: {e}")))?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            parts.push(Part {
                name: file.name().to_string(),
                data,
                stored: file.compression() == CompressionMethod::Stored,
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// The main document part; its absence makes the package unusable.
    pub fn document_part(&self) -> Result<&[u8]> {
        self.part(DOCUMENT_PART)
            .ok_or_else(|| Error::MalformedPackage(format!("missing {DOCUMENT_PART}")))
    }

    /// Replaces an existing part in place, or appends a new one.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(p) => p.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
                stored: false,
                is_dir: false,
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for part in &self.parts {
            let method = if part.stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let opts = SimpleFileOptions::default().compression_method(method);
            if part.is_dir {
                zip.add_directory(part.name.as_str(), opts)?;
                continue;
            }
            zip.start_file(part.name.as_str(), opts)?;
            zip.write_all(&part.data)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", opts).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file(DOCUMENT_PART, opts).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn keeps_parts_in_order_and_replaces_in_place() {
        let mut pkg = Package::from_bytes(&sample()).unwrap();
        pkg.set_part(DOCUMENT_PART, b"<w:document>x</w:document>".to_vec());

        let again = Package::from_bytes(&pkg.to_bytes().unwrap()).unwrap();
        let names: Vec<&str> = again.parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["[Content_Types].xml", DOCUMENT_PART]);
        assert_eq!(again.part("[Content_Types].xml").unwrap(), b"<Types/>");
        assert_eq!(again.document_part().unwrap(), b"<w:document>x</w:document>");
    }

    #[test]
    fn entry_data_is_read_in_full() {
        let body = vec![b'x'; 70_000];
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default()).unwrap();
        zip.write_all(&body).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let pkg = Package::from_bytes(&bytes).unwrap();
        assert_eq!(pkg.document_part().unwrap(), body.as_slice());
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = Package::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, Error::MalformedPackage(_)));
    }

    #[test]
    fn missing_document_part_is_malformed() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let pkg = Package::from_bytes(&bytes).unwrap();
        assert!(matches!(pkg.document_part(), Err(Error::MalformedPackage(_))));
    }
}
