pub mod api;

pub use api::ModerationApi;
