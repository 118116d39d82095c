//! Data models for a single detection call.

mod chain;
mod result;
mod target;

pub use chain::{ChainStop, RedirectChain};
pub use result::{Confidence, DetectionResult};
pub use target::ProbeTarget;
