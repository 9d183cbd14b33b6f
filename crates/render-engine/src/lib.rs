//! Pitchcast Render Engine
//!
//! Turns per-segment avatar clips into the final video with the external
//! ffmpeg toolchain.
//!
//! # Pipeline Architecture
//!
//! ```text
//! avatar clip ─────────────┐
//!                          ├── Picture-in-picture (chart overlay, optional)
//! chart.png ── image→video ┘         │
//!                                    ├── Lower third (optional)
//!                                    │
//!                                    ├── Fade in/out
//!                                    ▼
//!                              composed clip ×N
//!                                    │
//!                                    ├── Concat (stream copy, input order)
//!                                    ├── Background music (optional)
//!                                    ▼
//!                                final.mp4
//! ```
//!
//! Every composition step degrades to the best clip produced so far.
//! Assembly degrades to a manifest file when ffmpeg is missing.

pub mod assemble;
pub mod compose;
pub mod effects;
pub mod toolchain;

pub use assemble::{AssemblerError, AssemblyOutcome, SequenceAssembler};
pub use compose::{ComposedClip, SegmentComposer};
pub use toolchain::{FfmpegBackend, MediaBackend, Tool, ToolError, ToolInvocation, ToolOutput};
