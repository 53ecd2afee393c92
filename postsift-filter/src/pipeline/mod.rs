//! Relevance pipeline: normalise, deduplicate, score, threshold, rank.
//!
//! Each stage is a plain function over in-memory values; the whole pass
//! performs no I/O and never waits.

pub mod dedup;
pub mod normalize;
pub mod rank;
pub mod scoring;
