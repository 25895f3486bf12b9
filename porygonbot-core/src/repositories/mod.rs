// src/repositories/mod.rs

pub use porygonbot_common::traits::repository_traits::CredentialsRepository;
pub use sqlite::credentials::SqliteCredentialsRepository;

pub mod sqlite;
