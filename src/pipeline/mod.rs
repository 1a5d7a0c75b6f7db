pub mod context;
pub mod driver;
pub mod retry;
pub mod runner;

pub use context::PipelineContext;
pub use driver::process_websites;
pub use retry::{retry_errors, RetryPolicy};
pub use runner::{SitePipeline, Stage, StageFailure};
