use crate::discovery::discover;
use crate::media::{MediaFile, MediaFormat};
use crate::metadata::{DateSource, ResolvedDate};
use crate::naming::{sequence_in_name, target_file_name};
use crate::resolver::DateResolver;
use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What to do when a computed target name is already taken on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Leave the source untouched.
    #[default]
    Skip,
    /// Scan forward past the group size for the first free sequence number.
    NextFree,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Rename,
    Unchanged,
    SkipCollision,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub directory: PathBuf,
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub format: MediaFormat,
    pub date: NaiveDateTime,
    pub date_source: DateSource,
    pub warning: Option<String>,
    pub day_key: String,
    pub sequence: usize,
    pub action: PlannedAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenameStats {
    pub media_files: usize,
    pub days: usize,
    pub to_rename: usize,
    pub unchanged: usize,
    pub collisions: usize,
    pub fallback_dates: usize,
    pub warnings: usize,
}

/// Rename plan for a single directory. Sequencing never spans directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub directory: PathBuf,
    pub candidates: Vec<RenameCandidate>,
    pub stats: RenameStats,
}

pub fn generate_plan(options: &PlanOptions, resolver: &DateResolver) -> Result<RenamePlan> {
    let files = discover(&options.directory, false)?;
    Ok(plan_files(
        &options.directory,
        files,
        resolver,
        options.collision_policy,
    ))
}

/// Groups `files` by capture day, orders each day by full timestamp and
/// numbers them 1..N across photos and videos alike. Equal timestamps keep
/// the number an already-named file carries, then `files` order.
pub fn plan_files(
    directory: &Path,
    files: Vec<MediaFile>,
    resolver: &DateResolver,
    policy: CollisionPolicy,
) -> RenamePlan {
    let mut stats = RenameStats {
        media_files: files.len(),
        ..RenameStats::default()
    };

    let mut by_day = BTreeMap::<String, Vec<(MediaFile, ResolvedDate)>>::new();
    for file in files {
        let resolved = resolver.resolve(&file.path);
        if let Some(warning) = resolved.warning.as_deref() {
            warn!(path = %file.path.display(), "{warning}");
            stats.warnings += 1;
        }
        if resolved.source.is_fallback() {
            stats.fallback_dates += 1;
        }
        by_day
            .entry(resolved.day_key())
            .or_default()
            .push((file, resolved));
    }
    stats.days = by_day.len();

    let mut reserved = HashSet::<PathBuf>::new();
    let mut candidates = Vec::with_capacity(stats.media_files);

    for (day_key, mut members) in by_day {
        members.sort_by_key(|(file, resolved)| {
            let existing = sequence_in_name(&file.file_name(), &day_key);
            (resolved.date, existing.unwrap_or(usize::MAX))
        });
        let group_len = members.len();

        for (index, (file, resolved)) in members.into_iter().enumerate() {
            let extension = file.original_extension();
            let mut sequence = index + 1;
            let name = target_file_name(&day_key, file.format, sequence, &extension);
            let mut target_path = file.path.with_file_name(&name);

            let action = if file.file_name() == name {
                stats.unchanged += 1;
                PlannedAction::Unchanged
            } else if !is_occupied(&target_path, &file.path) {
                stats.to_rename += 1;
                PlannedAction::Rename
            } else {
                match policy {
                    CollisionPolicy::Skip => {
                        stats.collisions += 1;
                        PlannedAction::SkipCollision
                    }
                    CollisionPolicy::NextFree => {
                        let (next_sequence, next_path) =
                            next_free(&file, &day_key, group_len, &extension, &reserved);
                        sequence = next_sequence;
                        target_path = next_path;
                        stats.to_rename += 1;
                        PlannedAction::Rename
                    }
                }
            };
            reserved.insert(target_path.clone());

            candidates.push(RenameCandidate {
                original_path: file.path,
                target_path,
                format: file.format,
                date: resolved.date,
                date_source: resolved.source,
                warning: resolved.warning,
                day_key: day_key.clone(),
                sequence,
                action,
            });
        }
    }

    info!(
        directory = %directory.display(),
        files = stats.media_files,
        days = stats.days,
        to_rename = stats.to_rename,
        unchanged = stats.unchanged,
        collisions = stats.collisions,
        "リネーム計画を作成"
    );

    RenamePlan {
        directory: directory.to_path_buf(),
        candidates,
        stats,
    }
}

fn next_free(
    file: &MediaFile,
    day_key: &str,
    group_len: usize,
    extension: &str,
    reserved: &HashSet<PathBuf>,
) -> (usize, PathBuf) {
    let mut sequence = group_len + 1;
    loop {
        let candidate =
            file.path
                .with_file_name(target_file_name(day_key, file.format, sequence, extension));
        if !reserved.contains(&candidate) && !is_occupied(&candidate, &file.path) {
            return (sequence, candidate);
        }
        sequence += 1;
    }
}

/// True when something other than `source` already sits at `target`.
pub(crate) fn is_occupied(target: &Path, source: &Path) -> bool {
    if target == source || !target.exists() {
        return false;
    }
    match (fs::canonicalize(target), fs::canonicalize(source)) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}
