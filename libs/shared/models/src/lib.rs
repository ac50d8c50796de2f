pub mod audit;
pub mod auth;
pub mod consultation;
pub mod error;
pub mod scheduling;
