//! Batch job description and results

use crate::options::Profile;
use crate::types::{FailureKind, ItemFailure, WatermarkError};
use std::path::PathBuf;
use std::time::Duration;

/// Sources to process, the profile to apply and where outputs go
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub sources: Vec<PathBuf>,
    pub profile: Profile,
    pub dest_dir: PathBuf,
}

impl BatchJob {
    pub fn new(sources: Vec<PathBuf>, profile: Profile, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            profile,
            dest_dir: dest_dir.into(),
        }
    }
}

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Aborted,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Completed | JobState::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Success,
    Failed,
    Aborted,
}

/// Outcome of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// Position in the submission list
    pub index: usize,
    pub source: PathBuf,
    /// Written file; `None` unless the item succeeded
    pub output: Option<PathBuf>,
    /// Path assigned to this source when the batch was planned
    pub planned_output: Option<PathBuf>,
    pub status: ItemStatus,
    pub error: Option<ItemFailure>,
    /// Wall time spent on this item, zero when it never started
    pub processing_time: Duration,
    /// Decoded source dimensions
    pub original_size: Option<(u32, u32)>,
    /// Dimensions of the encoded output
    pub output_size: Option<(u32, u32)>,
}

impl ItemResult {
    pub fn success(index: usize, source: PathBuf, output: PathBuf) -> Self {
        Self {
            index,
            source,
            output: Some(output.clone()),
            planned_output: Some(output),
            status: ItemStatus::Success,
            error: None,
            processing_time: Duration::ZERO,
            original_size: None,
            output_size: None,
        }
    }

    /// Failed or aborted, depending on the error
    pub fn from_error(
        index: usize,
        source: PathBuf,
        planned_output: Option<PathBuf>,
        err: &WatermarkError,
    ) -> Self {
        let status = if err.kind() == FailureKind::Cancelled {
            ItemStatus::Aborted
        } else {
            ItemStatus::Failed
        };
        Self {
            index,
            source,
            output: None,
            planned_output,
            status,
            error: Some(ItemFailure::from(err)),
            processing_time: Duration::ZERO,
            original_size: None,
            output_size: None,
        }
    }

    pub fn aborted(index: usize, source: PathBuf, planned_output: Option<PathBuf>) -> Self {
        Self::from_error(index, source, planned_output, &WatermarkError::Cancelled)
    }

    /// Attach timing and the image sizes seen while processing
    pub fn with_measurements(mut self, processing_time: Duration, sizes: ItemSizes) -> Self {
        self.processing_time = processing_time;
        self.original_size = sizes.original;
        self.output_size = sizes.output;
        self
    }
}

/// Image dimensions recorded as an item moves through the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemSizes {
    pub original: Option<(u32, u32)>,
    pub output: Option<(u32, u32)>,
}

/// Progress reported after each finished item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Final report of a batch, results in submission order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub state: JobState,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
    pub results: Vec<ItemResult>,
    pub elapsed: Duration,
}
