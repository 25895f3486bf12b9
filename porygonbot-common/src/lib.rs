//! Shared error type, data models and the traits at the seams between the
//! credential store, the transport and the services in `porygonbot-core`.

pub mod error;
pub mod models;
pub mod traits;

pub use error::Error;
