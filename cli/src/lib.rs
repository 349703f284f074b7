//! Host side of the death-certificate client.
//!
//! # Overview
//! `coffinjoe_core` builds SOAP requests and parses responses without doing
//! I/O. This crate supplies everything around it: the HTTPS transport, the
//! configuration resolved from flags and environment, signal-driven
//! cancellation, log setup and the fetch/export pipeline.
//!
//! # Design
//! - One `Config` is built from the parsed `Cli` and passed by reference;
//!   there is no global state.
//! - Shutdown signals cancel a `CancellationToken`; the pipeline races the
//!   request against it and reports `Outcome::Cancelled` instead of exiting
//!   the process from a signal handler.

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod shutdown;
pub mod telemetry;
pub mod transport;

pub use config::{Cli, Config};
pub use fetch::DeathCertificateClient;
pub use pipeline::{run, Outcome};
pub use transport::{Transport, TransportConfig};
