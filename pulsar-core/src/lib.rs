// src/lib.rs

pub mod antispam;
pub mod cache;
pub mod config;
pub mod embeds;
pub mod platforms;
pub mod services;

pub use pulsar_common::error::Error;
