//! Addressable editing of `.docx` documents through an HTML preview.
//!
//! A package is first given a persistent identity on every paragraph
//! ([`assign_identities`]), then projected to HTML whose elements carry those
//! identities ([`project`]). Structured commands ([`validate`]) can then be
//! applied to the preview ([`apply_to_html`]) and replayed onto the package
//! ([`apply_to_package`]).

mod command;
mod docx_tree;
mod dual;
mod engine;
mod error;
mod fragment;
mod html_tree;
mod ident;
mod identity;
mod package;
mod projector;
mod wordml;
mod xml;

#[cfg(test)]
mod test_support;

pub use command::{validate, validate_records, UpdateCommand, UpdateKind};
pub use docx_tree::DocxTree;
pub use dual::{apply_to_html, apply_to_package, export, preview, stamp_identifiers, PackageUpdate};
pub use engine::{
    apply_batch, AddressableTree, BatchReport, CommandOutcome, FailurePolicy, Outcome, Placement,
    SkipReason,
};
pub use error::{Error, Result};
pub use html_tree::HtmlTree;
pub use ident::{ElementId, IdPrefix, ParagraphIdentity};
pub use identity::{
    assign_identities, assign_identities_to_file, extract_identities, AssignedPackage, IdentityMap,
};
pub use package::Package;
pub use projector::{css_class, project, Projection, DEFAULT_CSS};
