// File: pulsar-common/src/lib.rs

pub mod error;
pub mod models;
pub mod traits;
pub mod duration;

pub use error::Error;
