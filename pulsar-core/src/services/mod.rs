
// File: src/services/mod.rs

pub mod antispam_service;

pub use antispam_service::{AntiSpamService, DeleteDisposition};
