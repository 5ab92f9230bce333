use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::config::RunOptions;
use crate::discovery::ImageFile;
use crate::errors::{error_chain, SegBatchError};
use crate::job::{Job, JobOptions, JobOutcome};
use crate::paths::{map_output, OutputLayout};

/// Jobs ready for dispatch plus the inputs rejected while planning.
///
/// Every discovered file ends up in exactly one of the two lists.
#[derive(Debug, Default)]
pub struct JobPlan {
    pub jobs: Vec<Job>,
    pub rejected: Vec<(PathBuf, JobOutcome)>,
}

impl JobPlan {
    pub(crate) fn len(&self) -> usize {
        self.jobs.len() + self.rejected.len()
    }
}

/// Map every file to its output path, in discovery order.
///
/// The first file to claim an output path keeps it. Later files mapping to the same
/// path are rejected with an `OutputCollision` failure instead of overwriting it.
pub fn plan_jobs(
    files: &[ImageFile],
    input_root: &Path,
    output_root: &Path,
    options: &RunOptions,
) -> JobPlan {
    let layout = OutputLayout::from_keep_structure(options.keep_structure);
    let job_options = JobOptions {
        force: options.force,
        max_dimension: options.max_dimension,
    };

    let mut plan = JobPlan::default();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(files.len());

    for file in files {
        let input = file.path().to_path_buf();
        let output = match map_output(&input, input_root, output_root, layout) {
            Ok(output) => output,
            Err(err) => {
                plan.rejected
                    .push((input, JobOutcome::Failed(error_chain(&err))));
                continue;
            }
        };

        if let Some(claimed_by) = claimed.get(&output) {
            let err = SegBatchError::OutputCollision {
                output,
                claimed_by: claimed_by.clone(),
            };
            warn!("{}: {}", input.display(), err);
            plan.rejected
                .push((input, JobOutcome::Failed(error_chain(&err))));
            continue;
        }

        claimed.insert(output.clone(), input.clone());
        plan.jobs.push(Job::new(input, output, job_options));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<ImageFile> {
        paths
            .iter()
            .map(|p| ImageFile::from_path(PathBuf::from(p)).unwrap())
            .collect()
    }

    #[test]
    fn test_plan_maps_every_file() {
        let options = RunOptions {
            force: true,
            max_dimension: Some(512),
            ..RunOptions::default()
        };
        let plan = plan_jobs(
            &files(&["in/x.jpg", "in/y.png"]),
            Path::new("in"),
            Path::new("out"),
            &options,
        );

        assert!(plan.rejected.is_empty());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.jobs[0].output, Path::new("out/x.png"));
        assert_eq!(plan.jobs[1].output, Path::new("out/y.png"));
        assert!(plan.jobs[0].options.force);
        assert_eq!(plan.jobs[1].options.max_dimension, Some(512));
    }

    #[test]
    fn test_flatten_collision_keeps_first_in_order() {
        let plan = plan_jobs(
            &files(&["in/a/cat.jpg", "in/b/cat.png", "in/dog.jpg"]),
            Path::new("in"),
            Path::new("out"),
            &RunOptions::default(),
        );

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.jobs[0].input, Path::new("in/a/cat.jpg"));
        assert_eq!(plan.jobs[1].input, Path::new("in/dog.jpg"));

        let (rejected, outcome) = &plan.rejected[0];
        assert_eq!(rejected, Path::new("in/b/cat.png"));
        match outcome {
            JobOutcome::Failed(message) => assert!(message.contains("already claimed")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_mirror_avoids_cross_directory_collisions() {
        let options = RunOptions {
            keep_structure: true,
            ..RunOptions::default()
        };
        let plan = plan_jobs(
            &files(&["in/a/cat.jpg", "in/b/cat.jpg", "in/b/cat.png"]),
            Path::new("in"),
            Path::new("out"),
            &options,
        );

        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.jobs[0].output, Path::new("out/a/cat.png"));
        assert_eq!(plan.jobs[1].output, Path::new("out/b/cat.png"));
        assert_eq!(plan.rejected.len(), 1);
    }

    #[test]
    fn test_files_outside_root_are_rejected() {
        let plan = plan_jobs(
            &files(&["elsewhere/x.jpg"]),
            Path::new("in"),
            Path::new("out"),
            &RunOptions::default(),
        );
        assert!(plan.jobs.is_empty());
        assert_eq!(plan.rejected.len(), 1);
    }
}
