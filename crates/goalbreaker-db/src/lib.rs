//! PostgreSQL persistence for goals and their tasks.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
