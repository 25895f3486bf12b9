pub mod repository_traits;
pub mod transport_traits;

pub use repository_traits::CredentialsRepository;
pub use transport_traits::ChatTransport;
