//! # teleturbo
//!
//! Core of a Telegram media downloader: a login state machine over a
//! persistent session, a parser for `t.me` message links, a resolver from
//! links to remote file references, and a task manager that runs many
//! downloads concurrently with smoothed progress telemetry.
//!
//! ## Design
//!
//! - **Seams, not protocols** - the wire connection ([`Connector`] /
//!   [`RemoteApi`]) and the multi-connection transfer ([`DownloadEngine`])
//!   are traits supplied by the embedding application
//! - **Polling or events** - shells poll [`Downloader::progress`], or
//!   subscribe to [`Event`]s
//! - **Library-first** - no CLI or UI; [`TeleTurbo`] is the token-returning
//!   facade a shell binds to
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use teleturbo::{Config, Connector, DownloadEngine, Downloader, Session};
//!
//! async fn download(
//!     connector: Arc<dyn Connector>,
//!     engine: Arc<dyn DownloadEngine>,
//! ) -> teleturbo::Result<()> {
//!     let config = Config::default();
//!     let session = Session::initialize(connector, 12345, "app-hash", config.session.clone()).await?;
//!     if !session.is_authenticated() {
//!         session.start_login("+15550100").await?;
//!         // ... ask the user for the code, then:
//!         session.submit_code("12345").await?;
//!     }
//!
//!     let downloader = Downloader::new(session, engine, config)?;
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = downloader.start("https://t.me/examplechannel/55", "").await?;
//!     println!("{:?}", downloader.progress(&id).await?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Shell-facing facade
pub mod app;
/// Configuration types
pub mod config;
/// Download task manager (decomposed into focused submodules)
pub mod downloader;
/// Download engine seam and the counting sink
pub mod engine;
/// Error types
pub mod error;
/// Message link parsing
pub mod link;
/// Remote object resolution
pub mod resolver;
/// Remote RPC capability and its data model
pub mod rpc;
/// Session client and login state machine
pub mod session;
/// Speed, ETA and progress computation
pub mod telemetry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;


// Re-export commonly used types
pub use app::TeleTurbo;
pub use config::{Config, DownloadConfig, SessionConfig, TelemetryConfig};
pub use downloader::Downloader;
pub use engine::{CountingWriter, DownloadEngine};
pub use error::{AuthError, EngineError, Error, InitError, LinkError, ResolveError, Result};
pub use link::{LinkDescriptor, parse_link};
pub use resolver::Resolver;
pub use rpc::{Connector, RemoteApi, RemoteFileReference};
pub use session::{LoginStatus, Session, SessionState};
pub use types::{Event, Status, SystemInfo, TaskId, TaskSnapshot};
