pub mod pipeline;
pub mod snapshot;

pub use pipeline::{SyncPipeline, SyncReport, TitleOutcome, TitleResult, TitleState};
