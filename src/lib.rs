//! # Faro
//! Easy configurable MCP server framework for Rust
//!
//! ## Dependencies
//! ```toml
//! [dependencies]
//! faro = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use faro::{App, types::ToolParam};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = App::new()
//!         .with_options(|opt| opt
//!             .with_stdio());
//!
//!     app.map_tool("hello", |name: String| async move {
//!         format!("Hello, {name}!")
//!     }).with_params([ToolParam::string("name")]);
//!
//!     app.run().await;
//! }
//! ```

pub use app::{App, context::Context, options};

pub mod app;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod transport;
pub mod types;

pub(crate) mod commands;

pub(crate) const SERVER_NAME: &str = "faro";

/// The Model Context Protocol version this server advertises.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
