//! Backend adapters.
//!
//! Each module provides a struct implementing
//! [`crate::backend::BackendCapability`]. The scraper bots that talk to patent
//! offices live outside this crate and plug in through the same trait, or
//! sit behind a service reached via [`HttpBackend`].

pub mod fixture;
pub mod http;

pub use fixture::FixtureBackend;
pub use http::{HttpBackend, HttpBackendConfig};
