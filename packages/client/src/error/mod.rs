//! Error model for the outbound client.
//!
//! Every failure surfaces as [`Error`], a boxed [`Kind`] plus an optional
//! source and the URL the failure relates to. Constructor functions live in
//! [`constructors`]; classification predicates in [`classification`].

pub mod classification;
pub mod constructors;
pub mod conversions;
pub mod helpers;
pub mod types;

pub use constructors::*;
pub use helpers::{BadScheme, ClientClosed, TimedOut};
pub use types::{Error, Inner, Kind, Result};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
