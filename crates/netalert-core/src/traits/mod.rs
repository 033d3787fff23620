//! Core traits for netalert
//!
//! This module defines the seams between the core and the outside world.
//!
//! - [`Transport`]: One HTTP exchange with the alert API
//! - [`NameResolver`]: Domain name to address lookup

pub mod transport;
pub mod resolver;

pub use transport::{ApiRequest, ApiResponse, Method, Transport, CREDENTIAL_PARAM};
pub use resolver::NameResolver;
