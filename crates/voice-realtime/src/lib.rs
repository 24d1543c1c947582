mod client;

pub use client::config::{Config, ConfigBuilder};
pub use client::stats::Stats;
pub use client::{Client, ServerRx, VoiceClient, connect_with_config};
pub use medvoice_realtime_types as types;
