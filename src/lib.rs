//! linkprobe - escalating detection of paid-content profile links behind
//! "link in bio" aggregator pages.
//!
//! A [`Detector`](pipeline::Detector) runs five phases, cheapest first, and
//! stops at the first one that finds evidence:
//!
//! 1. direct scan of the page and a sample of its redirecting links
//! 2. the same scan under rotating client identities
//! 3. common alternate sub-paths
//! 4. an interactive rendering session (optional `browser` feature)
//! 5. plain-text mining for weaker signals
//!
//! Every call returns a [`DetectionResult`](models::DetectionResult) with an
//! ordered audit trail of what was tried.

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod evidence;
pub mod http_client;
pub mod models;
pub mod pipeline;
pub mod platforms;
pub mod redirect;
pub mod server;

pub use config::{Config, Settings};
pub use error::{ProbeError, Result};
pub use models::{Confidence, DetectionResult, ProbeTarget, RedirectChain};
pub use pipeline::Detector;
