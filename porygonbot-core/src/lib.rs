// src/lib.rs

pub mod db;
pub mod repositories;
pub mod platforms;
pub mod auth;
pub mod eventbus;
pub mod cache;
pub mod services;
pub mod test_utils;
pub mod utils;

pub use db::Database;
pub use porygonbot_common::error::Error;
