pub mod sessions;
pub mod signaling;

pub use sessions::VideoSessionService;
pub use signaling::{issuer_from_config, HmacTokenIssuer, RemoteTokenIssuer, RoomClaims, SignalingTokenIssuer};
