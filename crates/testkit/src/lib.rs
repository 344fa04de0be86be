//! tally-testkit: test tooling shared by the Tally crates.
//!
//! - [`scan()`] -- a small scanner producing token streams from ledger text
//! - [`RecordingBuilder`] -- a Builder that logs every call as text and
//!   counts live handles so tests can check that each value is released
//!   exactly once

pub mod recording;
pub mod scan;

pub use recording::{Handle, RecordingBuilder, RecordingError};
pub use scan::scan;
