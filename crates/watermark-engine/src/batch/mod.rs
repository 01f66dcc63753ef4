//! Concurrent batch processing
//!
//! A batch applies one prepared profile to many sources with a fixed pool
//! of workers. Per-item failures are recorded and never stop siblings.

mod cancel;
mod job;
mod naming;
mod pipeline;
mod scheduler;

pub use cancel::*;
pub use job::*;
pub use naming::*;
pub use pipeline::*;
pub use scheduler::*;
