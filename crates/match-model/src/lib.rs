//! Pitchcast Match Model
//!
//! Defines the data contracts that flow through a commentary run:
//! - **Match data:** the live match situation the commentary is about
//! - **Segments:** ordered commentary units (script + visual treatment)
//! - **Render jobs:** remote avatar render requests and their polled status
//! - **Artifacts:** materialized per-segment clips and chart images
//! - **Workspace:** the on-disk layout that lets each stage run standalone
//!
//! Segment ids define the total order of the final video. Nothing downstream
//! of the script stage is allowed to reorder by anything else.

pub mod artifact;
pub mod job;
pub mod match_data;
pub mod segment;
pub mod workspace;

pub use artifact::*;
pub use job::*;
pub use match_data::*;
pub use segment::*;
pub use workspace::*;
