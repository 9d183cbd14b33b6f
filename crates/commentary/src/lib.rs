//! Pitchcast Commentary
//!
//! The two upstream producers of a run: the script writer, which turns a
//! match situation into timed commentary segments, and the chart renderer,
//! which draws the match charts used as picture-in-picture overlays.

pub mod charts;
pub mod script;

pub use charts::{ChartError, ChartRenderer};
pub use script::TemplateScriptWriter;
