//! Task orchestration: registry, progress fan-out and the paper pipeline

mod fanout;
mod pipeline;
mod registry;

pub use fanout::{Subscription, SubscriptionEvent};
pub use pipeline::{PaperPipeline, PipelineOutcome, PipelineRequest};
pub use registry::{RegistryStats, TaskRegistry};
