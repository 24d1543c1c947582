use crate::channel_event::{AgentProfile, ChannelEvent, EventKind};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A source of voice channels. Each call opens exactly one channel.
#[async_trait]
pub trait VoiceChannelProvider: Send + Sync {
    type Channel: VoiceChannel;

    /// Constructs a channel that is not yet started.
    async fn create(&self) -> Result<Self::Channel>;
}

/// One real-time voice conversation with a hosted agent.
///
/// Only events whose kind is subscribed with [`VoiceChannel::on`] are
/// delivered, and an `off` takes effect for events not yet delivered.
#[async_trait]
pub trait VoiceChannel: Send {
    fn on(&mut self, kind: EventKind);

    fn off(&mut self, kind: EventKind);

    /// Starts the conversation and returns the stream of subscribed events.
    async fn start(&mut self, agent: &AgentProfile) -> Result<mpsc::Receiver<ChannelEvent>>;

    /// Hangs up. The event stream ends afterwards.
    async fn stop(&mut self) -> Result<()>;
}
