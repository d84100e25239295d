use crate::apply::{apply_plan, ApplyResult};
use crate::discovery::directories_with_media;
use crate::planner::{generate_plan, CollisionPolicy, PlanOptions, RenamePlan};
use crate::resolver::DateResolver;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub dry_run: bool,
    pub recursive: bool,
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub plan: RenamePlan,
    pub result: ApplyResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryError {
    pub directory: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub root_missing: bool,
    pub dry_run: bool,
    pub batches: Vec<BatchReport>,
    pub errors: Vec<DirectoryError>,
}

impl RunReport {
    pub fn total_considered(&self) -> usize {
        self.batches.iter().map(|b| b.result.considered).sum()
    }

    pub fn total_renamed(&self) -> usize {
        self.batches.iter().map(|b| b.result.renamed).sum()
    }
}

/// Plans and applies renames for `root`, or for every directory below it
/// holding media when `recursive` is set. Each directory is its own batch.
pub fn rename_media(options: &RunOptions, resolver: &DateResolver) -> Result<RunReport> {
    let mut report = RunReport {
        root: options.root.clone(),
        root_missing: false,
        dry_run: options.dry_run,
        batches: Vec::new(),
        errors: Vec::new(),
    };

    if !options.root.is_dir() {
        warn!(root = %options.root.display(), "フォルダが存在しません");
        report.root_missing = true;
        return Ok(report);
    }

    let directories = if options.recursive {
        let tree = directories_with_media(&options.root);
        report
            .errors
            .extend(tree.unreadable.into_iter().map(|entry| DirectoryError {
                directory: entry.path,
                error: entry.error,
            }));
        tree.directories
    } else {
        vec![options.root.clone()]
    };

    for directory in directories {
        let plan_options = PlanOptions {
            directory: directory.clone(),
            collision_policy: options.collision_policy,
        };
        match generate_plan(&plan_options, resolver) {
            Ok(plan) => {
                let result = apply_plan(&plan, options.dry_run);
                report.batches.push(BatchReport { plan, result });
            }
            Err(err) => {
                warn!(directory = %directory.display(), "{err:#}");
                report.errors.push(DirectoryError {
                    directory,
                    error: format!("{err:#}"),
                });
            }
        }
    }

    Ok(report)
}
