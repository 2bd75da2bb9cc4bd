//! HTTP server for the icon repository.
//!
//! Translates REST requests into [`IconStorageCoordinator`] calls and
//! coordinator results into HTTP responses. Callers authenticate with a
//! bearer token mapped to a user and privileges in [`AppConfig`].
//!
//! [`IconStorageCoordinator`]: icon_core::IconStorageCoordinator

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{AuthProvider, Credentials, TokenAuth};
pub use config::{AppConfig, Backend, UserConfig};
pub use context::ServiceContext;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::IconServer;
