//! Volguard Agent - the per-page limiter
//!
//! A [`PageAgent`] lives as long as its page. It asks the aggregator for the
//! tab's config, builds the audio graph, keeps discovering media, and on every
//! tick measures the mix, updates the gain, applies it to every binding, and
//! reports the level outward at a coarser cadence.
//!
//! ```text
//! Idle ─init─▶ Initializing ─graph ok─▶ Ready ─tick─▶ … ─link gone─▶ stop
//!                    └─graph error─▶ Failed
//! ```

mod agent;
mod error;
mod rescan;

pub use agent::{InitReport, PageAgent, TickOutcome, TickReport};
pub use error::AgentError;
pub use rescan::RescanQueue;
