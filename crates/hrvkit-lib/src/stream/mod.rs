pub mod aggregator;
pub mod live;

pub use aggregator::StreamingAggregator;
pub use live::{BaselineResult, LiveError, LiveSession, LiveUpdate};
