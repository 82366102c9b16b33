use thiserror::Error;

/// Failures surfaced by the conversion and update core.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not a readable document package, or lacks its main part.
    #[error("malformed package: {0}")]
    MalformedPackage(String),

    /// A raw update record failed validation; nothing from the batch was applied.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// The tree representation cannot address this kind of target.
    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
