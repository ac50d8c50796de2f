//! # Video Conferencing Cell
//!
//! Video session bookkeeping for appointments. A session is created by
//! either participant, started, and ended; media never passes through this
//! service. Clients fetch signaling details (room id, ICE servers and a
//! short-lived room token) and connect to the signaling service themselves.
//!
//! Room tokens come from a [`SignalingTokenIssuer`]: [`HmacTokenIssuer`]
//! signs them locally with `SIGNALING_TOKEN_SECRET`, [`RemoteTokenIssuer`]
//! asks the service configured at `SIGNALING_ISSUER_URL`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{IceServer, SignalingError, SignalingInfo, SignalingToken};
pub use router::video_routes;
pub use services::{HmacTokenIssuer, RemoteTokenIssuer, SignalingTokenIssuer, VideoSessionService};
