//! Thin HTTP layer: plain GETs with status/transport error classification.

mod client;
mod error;

pub use client::HttpClient;
pub use error::{HttpError, classify_error};
