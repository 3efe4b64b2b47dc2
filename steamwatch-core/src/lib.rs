// src/lib.rs

pub mod config;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

pub use state::GroupStateStore;
pub use steamwatch_common::error::Error;
