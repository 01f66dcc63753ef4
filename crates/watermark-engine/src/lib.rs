pub mod batch;
pub mod composite;
pub mod constants;
pub mod engine;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod options;
pub mod preview;
pub mod render;
pub mod stats;
pub mod types;

pub use batch::{
    BatchHandle, BatchJob, BatchOptions, BatchProgress, BatchSummary, CancelToken, ItemResult,
    ItemStatus, JobState, run_batch,
};
pub use engine::PreparedProfile;
pub use metadata::{ImageMetadata, MetadataToken};
pub use options::*;
pub use preview::render_preview;
pub use stats::{BatchCounts, summarize};
pub use types::*;
