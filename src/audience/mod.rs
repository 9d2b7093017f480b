//! Audience preview, segment persistence and segment listing against the
//! segmentation backend

mod client;
pub mod session;
mod types;

pub use client::AudienceClient;
pub use session::{PreviewHandle, SegmentHandle};
pub use types::*;
