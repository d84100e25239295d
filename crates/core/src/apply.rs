use crate::planner::{is_occupied, PlannedAction, RenameCandidate, RenamePlan};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    WouldRename { from: PathBuf, to: PathBuf },
    Unchanged { path: PathBuf },
    SkippedCollision { from: PathBuf, to: PathBuf },
    Failed { from: PathBuf, to: PathBuf, error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplyResult {
    pub dry_run: bool,
    pub considered: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<RenameOutcome>,
}

impl ApplyResult {
    fn record(&mut self, outcome: RenameOutcome) {
        match &outcome {
            RenameOutcome::Renamed { .. } => self.renamed += 1,
            RenameOutcome::Unchanged { .. } => self.unchanged += 1,
            RenameOutcome::SkippedCollision { .. } => self.skipped += 1,
            RenameOutcome::Failed { .. } => self.failed += 1,
            RenameOutcome::WouldRename { .. } => {}
        }
        self.outcomes.push(outcome);
    }
}

/// Walks the plan in order. Collisions are re-checked against the disk at
/// rename time, and a failed rename never stops the remaining entries.
pub fn apply_plan(plan: &RenamePlan, dry_run: bool) -> ApplyResult {
    let mut result = ApplyResult {
        dry_run,
        considered: plan.candidates.len(),
        ..ApplyResult::default()
    };

    for candidate in &plan.candidates {
        let outcome = if dry_run {
            preview(candidate)
        } else {
            rename_one(candidate)
        };
        result.record(outcome);
    }

    info!(
        directory = %plan.directory.display(),
        dry_run,
        considered = result.considered,
        renamed = result.renamed,
        unchanged = result.unchanged,
        skipped = result.skipped,
        failed = result.failed,
        "リネーム処理完了"
    );
    result
}

fn preview(candidate: &RenameCandidate) -> RenameOutcome {
    let from = candidate.original_path.clone();
    let to = candidate.target_path.clone();
    match candidate.action {
        PlannedAction::Unchanged => RenameOutcome::Unchanged { path: from },
        PlannedAction::SkipCollision => RenameOutcome::SkippedCollision { from, to },
        PlannedAction::Rename => RenameOutcome::WouldRename { from, to },
    }
}

fn rename_one(candidate: &RenameCandidate) -> RenameOutcome {
    let from = candidate.original_path.clone();
    let to = candidate.target_path.clone();

    if candidate.action == PlannedAction::Unchanged {
        return RenameOutcome::Unchanged { path: from };
    }
    if is_occupied(&to, &from) {
        return RenameOutcome::SkippedCollision { from, to };
    }

    // An existing `to` that is not occupied is `from` under another spelling.
    let moved = if to.exists() {
        fs::rename(&from, &to)
    } else {
        move_without_replace(&from, &to)
    };
    match moved {
        Ok(()) => RenameOutcome::Renamed { from, to },
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            RenameOutcome::SkippedCollision { from, to }
        }
        Err(err) => {
            warn!(from = %from.display(), to = %to.display(), "リネームに失敗しました: {err}");
            RenameOutcome::Failed {
                from,
                to,
                error: err.to_string(),
            }
        }
    }
}

/// Links `to` and then unlinks `from`, so a file that appears at `to` after
/// planning is never replaced. Filesystems without hard links get a plain
/// rename.
fn move_without_replace(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {
            if let Err(err) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(err);
            }
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(err),
        Err(_) => fs::rename(from, to),
    }
}
