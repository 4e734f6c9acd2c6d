//! Volguard Aggregator - cross-tab level statistics
//!
//! One [`Aggregator`] serves every tab. Page agents send level reports that may
//! arrive late, out of order across tabs, or not at all; each report is
//! applied on its own to that tab's [`TabStateRecord`]:
//!
//! 1. current level := report (even `-∞`)
//! 2. finite reports enter a bounded FIFO history
//! 3. average := EMA over the history, seeded with the oldest sample
//! 4. peak := max(peak, report) for finite reports
//!
//! The aggregator also answers status queries, pushes updates to status
//! clients, relays stored config changes to the one affected agent, and clears
//! all state (including stored config) when a tab closes.
//!
//! # Example
//!
//! ```rust
//! use volguard_aggregator::TabStateRecord;
//!
//! let mut record = TabStateRecord::new(100, 0.3);
//! for _ in 0..5 {
//!     record.ingest(f32::NEG_INFINITY);
//! }
//! record.ingest(-6.0);
//! assert_eq!(record.average(), -6.0);
//! assert_eq!(record.peak(), -6.0);
//! ```

mod aggregator;
mod record;

pub use aggregator::Aggregator;
pub use record::TabStateRecord;
