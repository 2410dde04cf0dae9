/// Post Service Library
///
/// Posts, comments, likes and reposts for the Socialix social network, and the
/// references between them and their users.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Users, posts, comments and their expanded views
/// - `services`: Mutation sagas and the feed projection
/// - `db`: Repository traits with PostgreSQL and in-memory stores
/// - `media`: Media store adapter (Cloudinary)
/// - `middleware`: Bearer token authentication
/// - `jobs`: Background reference sweeper
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
