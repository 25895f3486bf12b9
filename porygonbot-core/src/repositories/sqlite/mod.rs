// src/repositories/sqlite/mod.rs

pub mod credentials;

pub use credentials::SqliteCredentialsRepository;
