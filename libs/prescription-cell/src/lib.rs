pub mod codec;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use codec::PrescriptionItemsCodec;
pub use models::*;
pub use services::*;
