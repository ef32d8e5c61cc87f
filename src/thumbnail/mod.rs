//! Cache-mediated thumbnail pipeline.
//!
//! [`ThumbnailService`] resolves a request token against the thumbnail
//! store, generating and persisting the thumbnail on a miss.
//! [`InFlight`] lets concurrent misses for the same key share one
//! generation.

mod inflight;
mod service;

pub use inflight::{InFlight, Role};
pub use service::{render_thumbnail, ThumbnailResponse, ThumbnailService};
