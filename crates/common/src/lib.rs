//! Pitchcast Common
//!
//! What every other crate in the workspace builds on: the frozen
//! [`AppConfig`](config::AppConfig), the top-level error type, the
//! [`Clock`](clock::Clock) that all waits go through, the cooperative
//! [`CancelFlag`](clock::CancelFlag), and tracing setup.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::{secs_to_duration, CancelFlag, Clock, ManualClock, SystemClock};
pub use config::{AppConfig, AvatarProvider};
pub use error::{PitchcastError, PitchcastResult};
