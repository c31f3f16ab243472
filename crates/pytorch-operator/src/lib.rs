pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod manifest;

pub use error::{Error, Result};
