// File: src/services/mod.rs

pub mod dispatcher;
pub mod subscription_service;
pub mod twitch;

pub use dispatcher::{Dispatcher, RandomFactory};
pub use subscription_service::{BootstrapReport, SubscriptionManager};
