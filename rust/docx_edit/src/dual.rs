//! Routes one validated batch to both representations.
//!
//! The preview applies a batch with [`FailurePolicy::Abort`]; the package
//! replays it with [`FailurePolicy::SkipAndContinue`]. Stamping identifiers
//! into the content first makes both sides create the same identities.

use crate::command::UpdateCommand;
use crate::docx_tree::DocxTree;
use crate::engine::{apply_batch, BatchReport, FailurePolicy};
use crate::error::Result;
use crate::html_tree::{stamp_fragment, HtmlTree};

#[derive(Debug, Clone)]
pub struct PackageUpdate {
    pub bytes: Vec<u8>,
    pub report: BatchReport,
}

/// New commands whose content carries an `id` on every addressable
/// element. Identifiers already present are kept.
pub fn stamp_identifiers(commands: &[UpdateCommand]) -> Vec<UpdateCommand> {
    commands
        .iter()
        .map(|c| match c.content() {
            Some(content) => c.with_content(stamp_fragment(content)),
            None => c.clone(),
        })
        .collect()
}

/// Fails with `TargetNotFound` on the first missing target; the remaining
/// commands are not attempted and no document is returned.
pub fn apply_to_html(html: &str, commands: &[UpdateCommand]) -> Result<String> {
    let mut tree = HtmlTree::parse(html);
    apply_batch(&mut tree, commands, FailurePolicy::Abort)?;
    Ok(tree.to_html())
}

/// Missing and unsupported targets are skipped and reported; the package
/// is written regardless.
pub fn apply_to_package(package_bytes: &[u8], commands: &[UpdateCommand]) -> Result<PackageUpdate> {
    let mut tree = DocxTree::from_bytes(package_bytes)?;
    let report = apply_batch(&mut tree, commands, FailurePolicy::SkipAndContinue)?;
    Ok(PackageUpdate {
        bytes: tree.into_bytes()?,
        report,
    })
}

/// Stamps `commands` and applies them to the preview. Returns the updated
/// preview together with the stamped batch, which is what history records.
pub fn preview(html: &str, commands: &[UpdateCommand]) -> Result<(String, Vec<UpdateCommand>)> {
    let stamped = stamp_identifiers(commands);
    let html = apply_to_html(html, &stamped)?;
    Ok((html, stamped))
}

/// Replays a recorded history onto the identity-bearing base package.
pub fn export(base_package: &[u8], history: &[UpdateCommand]) -> Result<PackageUpdate> {
    apply_to_package(base_package, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::UpdateKind;
    use crate::ident::ElementId;
    use crate::identity::assign_identities;
    use crate::projector::project;
    use crate::test_support::{docx, paragraph, table};
    use crate::Error;

    #[test]
    fn preview_and_export_agree_on_new_identities() {
        let assigned = assign_identities(&docx(&[paragraph("a"), paragraph("b")])).unwrap();
        let html = project(&assigned.bytes, &assigned.identities).unwrap().html;
        let first = assigned.identities.get(0).unwrap();

        let batch = vec![UpdateCommand::new(
            UpdateKind::InsertAfter,
            format!("p-{first}"),
            Some("<p>inserted</p>"),
        )
        .unwrap()];
        let (html, stamped) = preview(&html, &batch).unwrap();
        let new_id = HtmlTree::parse(&html).ids()[1].clone();
        assert!(stamped[0].content().unwrap().contains(&new_id));

        let out = export(&assigned.bytes, &stamped).unwrap();
        assert!(out.report.is_complete());
        let tree = DocxTree::from_bytes(&out.bytes).unwrap();
        let token = ElementId::from(new_id).token().unwrap().to_string();
        assert_eq!(tree.identities()[1], token);
        assert_eq!(tree.paragraph_text(&token).as_deref(), Some("inserted"));
    }

    #[test]
    fn multi_block_replace_leaves_matching_ids_on_both_sides() {
        let assigned = assign_identities(&docx(&[paragraph("a"), paragraph("b")])).unwrap();
        let html = project(&assigned.bytes, &assigned.identities).unwrap().html;
        let first = assigned.identities.get(0).unwrap().to_string();

        let batch = vec![UpdateCommand::new(
            UpdateKind::Replace,
            format!("p-{first}"),
            Some("<p>one</p><p>two</p>"),
        )
        .unwrap()];
        let (html, stamped) = preview(&html, &batch).unwrap();
        let out = export(&assigned.bytes, &stamped).unwrap();
        assert!(out.report.is_complete());

        let tree = DocxTree::from_bytes(&out.bytes).unwrap();
        let package_ids: Vec<String> = tree.identities().iter().map(|t| format!("p-{t}")).collect();
        assert_eq!(HtmlTree::parse(&html).ids(), package_ids);
        assert_eq!(tree.paragraph_text(&first).as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn html_aborts_where_package_skips() {
        let assigned = assign_identities(&docx(&[table(&[&["x"]]), paragraph("b")])).unwrap();
        let html = project(&assigned.bytes, &assigned.identities).unwrap().html;
        let b = assigned.identities.get(1).unwrap();

        let batch = vec![
            UpdateCommand::new(UpdateKind::Replace, "td-0-0-0", Some("y")).unwrap(),
            UpdateCommand::new(UpdateKind::Delete, "p-00000000", None).unwrap(),
            UpdateCommand::new(UpdateKind::Replace, format!("p-{b}"), Some("<p>B</p>")).unwrap(),
        ];

        let err = apply_to_html(&html, &batch).unwrap_err();
        assert!(matches!(err, Error::TargetNotFound(_)));

        let out = apply_to_package(&assigned.bytes, &batch).unwrap();
        assert_eq!(out.report.applied(), 1);
        assert_eq!(out.report.skipped().count(), 2);
        let tree = DocxTree::from_bytes(&out.bytes).unwrap();
        assert_eq!(tree.paragraph_text(b.as_str()).as_deref(), Some("B"));
    }
}
