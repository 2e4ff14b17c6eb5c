//! # DocShelf Daemon Library
//!
//! Read-only HTTP service exposing a single documents directory.
//!
//! ## Overview
//!
//! The daemon serves one configured root and never writes to it. It provides:
//!
//! - **Listing**: top-level documents with an allowed extension
//! - **Tree**: the full folder hierarchy, folders first
//! - **Download**: any file under the root, streamed with its MIME type
//! - **Preview**: small text files inline, everything else streamed
//!
//! Every client path passes through [`files::PathResolver`], which rejects
//! anything that would leave the root.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                axum router (server)              │
//! ├──────────────────────────────────────────────────┤
//! │                 DocumentService                  │
//! │  ┌────────────┐ ┌────────────┐ ┌──────────────┐  │
//! │  │  Resolver  │ │   Lister   │ │ TreeBuilder  │  │
//! │  └────────────┘ └────────────┘ └──────────────┘  │
//! │  ┌────────────────────┐ ┌─────────────────────┐  │
//! │  │  content_type map  │ │  DocumentStream     │  │
//! │  └────────────────────┘ └─────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     // Runs until SIGINT or SIGTERM
//!     daemon::server::serve(&config).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path resolution, listing, tree and streaming
//! - [`logging`]: Tracing subscriber setup
//! - [`server`]: HTTP routes and error mapping

pub mod config;
pub mod files;
pub mod logging;
pub mod server;

pub use config::Config;
pub use files::{DocumentError, DocumentService, PathResolver, ResolvedPath};
pub use server::{router, AppState};
