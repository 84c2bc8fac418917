#![warn(missing_docs)]

//! <div class="warning">
//!
//! Note: API is unstable, and may change in `0.x` versions.
//!
//! </div>
//!
//! A unified client for the search APIs of several boorus
//! (see [`provider::Provider`]), plus a concurrent bulk downloader.
//!
//! # As a library
//!
//! Build and send searches with [`api`], then print the records with [`present`]
//! or download their images with [`scheduler`].
//!
//! See [`scheduler::Scheduler#example`] for example.
//!
//! # As a binary
//!
//! In addition to the above, you also need [`cli`] (feature `cli`) to build the command line.
//!
//! See `main.rs` to know how to assemble these modules as a binary.

#[cfg(not(any(
    feature = "default-tls",
    feature = "native-tls",
    feature = "native-tls-vendored",
    feature = "native-tls-alpn",
    feature = "rustls-tls",
    feature = "rustls-tls-manual-roots",
    feature = "rustls-tls-webpki-roots",
    feature = "rustls-tls-native-roots",
)))]
compile_error!("at least one tls feature must be enabled, the boorus are only reachable over https");

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod present;
pub mod provider;
pub mod scheduler;
pub mod tool;
