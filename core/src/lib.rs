//! Core library for poimap: favorites persistence, geo helpers and the
//! upstream point-of-interest client.

pub mod api;
pub mod error;
pub mod geo;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
