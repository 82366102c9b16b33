//! Applies ordered command batches to any tree that can be addressed by
//! element identifier.

use crate::command::{UpdateCommand, UpdateKind};
use crate::error::{Error, Result};
use crate::ident::ElementId;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// A document representation exposing "find by identifier, splice here".
///
/// Implementations return [`Error::TargetNotFound`] when no node carries the
/// target identifier; the engine decides what that means for the batch.
pub trait AddressableTree {
    /// Whether this representation can address `target` at all.
    fn supports(&self, _target: &ElementId) -> bool {
        true
    }

    /// Discards the target's content and parses `content` in its place.
    /// The target keeps its own identifier and tag.
    fn replace(&mut self, target: &ElementId, content: &str) -> Result<()>;

    /// Splices the parsed fragment next to the target, in authored order.
    fn insert(&mut self, target: &ElementId, placement: Placement, content: &str) -> Result<()>;

    /// Removes the target and its subtree.
    fn delete(&mut self, target: &ElementId) -> Result<()>;
}

/// What the engine does when a command cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the call; commands already applied stay applied.
    Abort,
    /// Record the skip and continue with the next command.
    SkipAndContinue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TargetNotFound,
    UnsupportedTarget,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::TargetNotFound => "target not found",
            SkipReason::UnsupportedTarget => "unsupported target",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Position of the command in its batch.
    pub index: usize,
    pub kind: UpdateKind,
    pub target: ElementId,
    pub outcome: Outcome,
}

/// Per-command results of one batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<CommandOutcome>,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == Outcome::Applied)
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&CommandOutcome, SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o.outcome {
            Outcome::Skipped(reason) => Some((o, reason)),
            Outcome::Applied => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.skipped().next().is_none()
    }

    /// Appends another batch's outcomes, renumbering them after this one's.
    pub fn extend(&mut self, other: BatchReport) {
        let offset = self.outcomes.len();
        self.outcomes.extend(other.outcomes.into_iter().map(|mut o| {
            o.index += offset;
            o
        }));
    }
}

fn apply_one<T: AddressableTree + ?Sized>(tree: &mut T, command: &UpdateCommand) -> Result<()> {
    let target = command.target();
    if !tree.supports(target) {
        return Err(Error::UnsupportedTarget(target.to_string()));
    }
    let content = command.content().unwrap_or_default();
    match command.kind() {
        UpdateKind::Replace => tree.replace(target, content),
        UpdateKind::InsertBefore => tree.insert(target, Placement::Before, content),
        UpdateKind::InsertAfter => tree.insert(target, Placement::After, content),
        UpdateKind::Delete => tree.delete(target),
    }
}

/// Applies `commands` in order. Missing and unsupported targets follow
/// `policy`; any other failure ends the batch with an error.
pub fn apply_batch<T: AddressableTree + ?Sized>(
    tree: &mut T,
    commands: &[UpdateCommand],
    policy: FailurePolicy,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for (index, command) in commands.iter().enumerate() {
        let outcome = match apply_one(tree, command) {
            Ok(()) => {
                debug!(index, kind = %command.kind(), target = %command.target(), "applied update");
                Outcome::Applied
            }
            Err(err @ (Error::TargetNotFound(_) | Error::UnsupportedTarget(_))) => {
                if policy == FailurePolicy::Abort {
                    return Err(err);
                }
                let reason = match err {
                    Error::TargetNotFound(_) => SkipReason::TargetNotFound,
                    _ => SkipReason::UnsupportedTarget,
                };
                warn!(index, kind = %command.kind(), target = %command.target(), %reason, "skipped update");
                Outcome::Skipped(reason)
            }
            Err(err) => return Err(err),
        };
        report.outcomes.push(CommandOutcome {
            index,
            kind: command.kind(),
            target: command.target().clone(),
            outcome,
        });
    }

    info!(
        total = commands.len(),
        applied = report.applied(),
        skipped = commands.len() - report.applied(),
        "update batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat list of `(id, content)` nodes.
    #[derive(Default)]
    struct ListTree {
        nodes: Vec<(String, String)>,
    }

    impl ListTree {
        fn of(ids: &[&str]) -> Self {
            Self {
                nodes: ids.iter().map(|id| (id.to_string(), String::new())).collect(),
            }
        }

        fn ids(&self) -> Vec<&str> {
            self.nodes.iter().map(|(id, _)| id.as_str()).collect()
        }

        fn position(&self, target: &ElementId) -> Result<usize> {
            self.nodes
                .iter()
                .position(|(id, _)| id == target.as_str())
                .ok_or_else(|| Error::TargetNotFound(target.to_string()))
        }
    }

    impl AddressableTree for ListTree {
        fn supports(&self, target: &ElementId) -> bool {
            !target.is_table_addressed()
        }

        fn replace(&mut self, target: &ElementId, content: &str) -> Result<()> {
            let i = self.position(target)?;
            self.nodes[i].1 = content.to_string();
            Ok(())
        }

        fn insert(&mut self, target: &ElementId, placement: Placement, content: &str) -> Result<()> {
            let i = self.position(target)?;
            let at = match placement {
                Placement::Before => i,
                Placement::After => i + 1,
            };
            let new: Vec<(String, String)> = content
                .split(',')
                .map(|id| (id.to_string(), String::new()))
                .collect();
            self.nodes.splice(at..at, new);
            Ok(())
        }

        fn delete(&mut self, target: &ElementId) -> Result<()> {
            let i = self.position(target)?;
            self.nodes.remove(i);
            Ok(())
        }
    }

    fn cmd(kind: UpdateKind, target: &str, content: &str) -> UpdateCommand {
        UpdateCommand::new(kind, target, Some(content)).unwrap()
    }

    #[test]
    fn applies_in_order_and_keeps_fragment_order() {
        let mut tree = ListTree::of(&["p-T"]);
        let report = apply_batch(
            &mut tree,
            &[
                cmd(UpdateKind::InsertBefore, "p-T", "p-A,p-B"),
                cmd(UpdateKind::InsertAfter, "p-B", "p-C"),
                cmd(UpdateKind::Replace, "p-T", "new"),
            ],
            FailurePolicy::Abort,
        )
        .unwrap();
        assert_eq!(tree.ids(), vec!["p-A", "p-B", "p-C", "p-T"]);
        assert_eq!(tree.nodes[3].1, "new");
        assert_eq!(report.applied(), 3);
        assert!(report.is_complete());
    }

    #[test]
    fn abort_stops_at_first_missing_target() {
        let mut tree = ListTree::of(&["p-1", "p-2"]);
        let err = apply_batch(
            &mut tree,
            &[
                cmd(UpdateKind::Delete, "p-1", ""),
                cmd(UpdateKind::Delete, "p-1", ""),
                cmd(UpdateKind::Delete, "p-2", ""),
            ],
            FailurePolicy::Abort,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TargetNotFound(ref id) if id == "p-1"));
        // The first delete stays applied, the third was never attempted.
        assert_eq!(tree.ids(), vec!["p-2"]);
    }

    #[test]
    fn skip_policy_records_and_continues() {
        let mut tree = ListTree::of(&["p-1", "p-2"]);
        let report = apply_batch(
            &mut tree,
            &[
                cmd(UpdateKind::Replace, "td-0-0-0", "x"),
                cmd(UpdateKind::Delete, "p-9", ""),
                cmd(UpdateKind::Delete, "p-2", ""),
            ],
            FailurePolicy::SkipAndContinue,
        )
        .unwrap();
        assert_eq!(tree.ids(), vec!["p-1"]);
        let skipped: Vec<(usize, SkipReason)> =
            report.skipped().map(|(o, r)| (o.index, r)).collect();
        assert_eq!(
            skipped,
            vec![(0, SkipReason::UnsupportedTarget), (1, SkipReason::TargetNotFound)]
        );
        assert_eq!(report.applied(), 1);
    }

    #[test]
    fn extending_reports_renumbers_outcomes() {
        let mut tree = ListTree::of(&["p-1"]);
        let mut first = apply_batch(
            &mut tree,
            &[cmd(UpdateKind::Replace, "p-1", "a")],
            FailurePolicy::SkipAndContinue,
        )
        .unwrap();
        let second = apply_batch(
            &mut tree,
            &[cmd(UpdateKind::Delete, "p-7", "")],
            FailurePolicy::SkipAndContinue,
        )
        .unwrap();
        first.extend(second);
        assert_eq!(first.outcomes[1].index, 1);
        assert!(!first.is_complete());
    }
}
