//! Pitchcast Avatar Engine
//!
//! Turns commentary segments into local avatar clips:
//! - **Clients:** submit render jobs to HeyGen or D-ID, or synthesize them offline
//! - **Submission:** paced submission of a whole segment list
//! - **Fetcher:** materializes a finished job's content as a local file
//! - **Poller:** drives pending jobs to a terminal state within a fixed round budget
//!
//! A live submission that fails for any reason degrades to an offline job.
//! The returned job's `provider` tag says which path was taken.

pub mod client;
pub mod did;
pub mod error;
pub mod fetch;
pub mod heygen;
pub mod offline;
pub mod poller;
pub mod submit;

pub use client::{AvatarClient, ProviderClient, RenderClient};
pub use error::{FetchError, ProviderError};
pub use fetch::{ArtifactFetcher, HttpArtifactFetcher};
pub use offline::OfflineClient;
pub use poller::{JobPoller, PollOutcome};
pub use submit::submit_all;
