// =============================================================================
// porygonbot-core/src/auth/mod.rs
// =============================================================================

pub mod callback_server;
pub mod session_authenticator;

pub use callback_server::{oauth_routes, OAuthRouteState};
pub use session_authenticator::{RestoreReport, SessionAuthenticator};
