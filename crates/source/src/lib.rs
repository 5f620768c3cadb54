//! Upstream template service access.
//!
//! This crate provides:
//! - `UpstreamApi` trait for the raw HTTP endpoints, with a `reqwest` implementation
//! - `CredentialManager` for reactive, login-on-failure token handling
//! - `SourceClient`, the retry-once template fetcher the scheduler polls
//! - A mock generator used instead of the network outside production

pub mod api;
pub mod client;
pub mod credentials;
pub mod error;
pub mod http;
pub mod mock;

pub use api::UpstreamApi;
pub use client::{FetchOutcome, SourceClient, TemplateSource};
pub use credentials::{Credential, CredentialManager};
pub use error::SourceError;
pub use http::HttpUpstream;
pub use mock::MockGenerator;
