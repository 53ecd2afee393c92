//! Postsift: human-paced keyword acquisition and relevance filtering for
//! short social posts.
//!
//! # Architecture
//!
//! Two independent components run in sequence:
//! - **Acquisition**: [`scheduler::Harvester`] drives a [`source::PostSource`]
//!   inside randomised browsing sessions, backs off on rate limiting and
//!   appends every record to a JSONL capture as it arrives
//! - **Filtering**: [`postsift_filter`] deduplicates, scores and ranks a
//!   capture; [`filter_pass::filter_file`] wires it to disk
//!
//! The ranked output is handed to an external summarizer as one text blob
//! (see [`summary`]).

pub mod clock;
pub mod config;
pub mod error;
pub mod filter_pass;
pub mod logging;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod summary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SiftConfig;
pub use error::{Result, SiftError};
pub use filter_pass::{FilePassReport, filter_file};
pub use scheduler::{Harvester, RunReport, StopReason};
pub use source::{PostSource, QueryError, ReplaySource, SortMode};
pub use summary::{PassthroughSummarizer, Summarizer, SummaryStatus, summarize_file};

pub use postsift_filter::{FilterConfig, FilterReport, RawRecord, ScoredRecord};
