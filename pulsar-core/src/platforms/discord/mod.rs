pub mod client;
pub mod runtime;

pub use client::DiscordModerationClient;
pub use runtime::run_gateway;
