pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod identity;
pub mod merge;
pub mod model;
pub mod sanitize;
pub mod sources;
pub mod upsert;

pub use error::{PipelineError, StoreError};
pub use model::{Action, DeviceQuery, DeviceRecord, MergedSpec, PipelineOutcome, SpecSource};
pub use upsert::Pipeline;
