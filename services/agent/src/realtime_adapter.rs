use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use medvoice_core::channel_event::{AgentProfile, ChannelEvent, EventKind};
use medvoice_core::voice_channel::{VoiceChannel, VoiceChannelProvider};
use medvoice_realtime::VoiceClient;
use medvoice_realtime::types::{AssistantOverrides, ServerEvent, TranscriptType};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CLIENT_CAPACITY: usize = 1024;
const EVENT_CAPACITY: usize = 128;

/// Opens one websocket connection to the voice service per call.
pub struct RealtimeProvider {
    api_key: SecretString,
    assistant_id: String,
    base_url: Option<String>,
}

impl RealtimeProvider {
    pub fn new(api_key: SecretString, assistant_id: &str) -> Self {
        Self {
            api_key,
            assistant_id: assistant_id.to_string(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }
}

#[async_trait]
impl VoiceChannelProvider for RealtimeProvider {
    type Channel = RealtimeChannel<medvoice_realtime::Client>;

    async fn create(&self) -> Result<Self::Channel> {
        let mut builder = medvoice_realtime::Config::builder()
            .with_api_key(self.api_key.expose_secret())
            .with_assistant_id(&self.assistant_id);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }

        let client = medvoice_realtime::connect_with_config(CLIENT_CAPACITY, builder.build())
            .await
            .context("Failed to connect to the voice service")?;
        Ok(RealtimeChannel::new(client))
    }
}

/// An adapter that implements the `VoiceChannel` trait for a `VoiceClient`.
/// It is generic over the client so tests can substitute a mock.
pub struct RealtimeChannel<C: VoiceClient> {
    client: C,
    subscriptions: Arc<Mutex<HashSet<EventKind>>>,
    forwarder: Option<JoinHandle<()>>,
}

impl<C: VoiceClient> RealtimeChannel<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            subscriptions: Arc::new(Mutex::new(HashSet::new())),
            forwarder: None,
        }
    }
}

impl<C: VoiceClient> Drop for RealtimeChannel<C> {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

#[async_trait]
impl<C: VoiceClient> VoiceChannel for RealtimeChannel<C> {
    fn on(&mut self, kind: EventKind) {
        match self.subscriptions.lock() {
            Ok(mut subscriptions) => {
                subscriptions.insert(kind);
            }
            Err(_) => tracing::error!("failed to subscribe to {:?}", kind),
        }
    }

    fn off(&mut self, kind: EventKind) {
        match self.subscriptions.lock() {
            Ok(mut subscriptions) => {
                subscriptions.remove(&kind);
            }
            Err(_) => tracing::error!("failed to unsubscribe from {:?}", kind),
        }
    }

    async fn start(&mut self, agent: &AgentProfile) -> Result<mpsc::Receiver<ChannelEvent>> {
        if self.forwarder.is_some() {
            return Err(anyhow!("voice channel has already been started"));
        }

        // Subscribe before starting so the call-start event is not missed.
        let mut server_rx = self
            .client
            .server_events()
            .await
            .context("Failed to subscribe to voice service events")?;
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let subscriptions = self.subscriptions.clone();

        self.forwarder = Some(tokio::spawn(async move {
            loop {
                let event = match server_rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("voice events lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if let ServerEvent::Close { reason } = &event {
                    tracing::info!("voice connection closed: {:?}", reason);
                    break;
                }

                let Some(event) = translate(event) else {
                    continue;
                };
                let subscribed = subscriptions
                    .lock()
                    .map(|subscriptions| subscriptions.contains(&event.kind()))
                    .unwrap_or(false);
                if !subscribed {
                    tracing::trace!("dropping unsubscribed {:?} event", event.kind());
                    continue;
                }

                if tx.send(event).await.is_err() {
                    tracing::debug!("channel event receiver dropped, stopping forwarder");
                    break;
                }
            }
        }));

        self.client
            .start_call(Some(overrides_for(agent)))
            .await
            .context("Failed to start the call")?;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let result = self
            .client
            .stop_call()
            .await
            .context("Failed to stop the call");
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        result
    }
}

fn overrides_for(agent: &AgentProfile) -> AssistantOverrides {
    let mut builder = AssistantOverrides::builder().with_name(&agent.name);
    if let Some(instructions) = &agent.instructions {
        builder = builder.with_instructions(instructions);
    }
    if let Some(voice_id) = &agent.voice_id {
        builder = builder.with_voice_id(voice_id);
    }
    for (key, value) in &agent.variables {
        builder = builder.with_variable(key, value);
    }
    builder.build()
}

fn translate(event: ServerEvent) -> Option<ChannelEvent> {
    match event {
        ServerEvent::CallStart => Some(ChannelEvent::CallStarted),
        ServerEvent::CallEnd => Some(ChannelEvent::CallEnded),
        ServerEvent::SpeechStart => Some(ChannelEvent::SpeechStarted),
        ServerEvent::SpeechEnd => Some(ChannelEvent::SpeechEnded),
        ServerEvent::Message(message) => {
            let transcript = message.transcript()?;
            let role = transcript.role();
            let text = transcript.transcript().to_string();
            Some(match transcript.transcript_type() {
                TranscriptType::Partial => ChannelEvent::PartialTranscript { role, text },
                TranscriptType::Final => ChannelEvent::FinalTranscript { role, text },
            })
        }
        ServerEvent::Error(error) => {
            let details = error.error();
            tracing::warn!(
                "voice service error ({}/{}): {}",
                details.error_type().unwrap_or("unknown"),
                details.code().unwrap_or("-"),
                details.message()
            );
            None
        }
        ServerEvent::Close { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medvoice_core::channel_event::NOTES_VARIABLE;
    use medvoice_core::session::Role;
    use medvoice_realtime::ServerRx;
    use medvoice_realtime::types::events::server::{
        ConversationMessage, MessageEvent, TranscriptPayload,
    };
    use mockall::mock;
    use std::collections::BTreeMap;

    mock! {
        pub VoiceClient {}
        #[async_trait]
        impl VoiceClient for VoiceClient {
            async fn start_call(&mut self, overrides: Option<AssistantOverrides>) -> Result<()>;
            async fn stop_call(&mut self) -> Result<()>;
            async fn server_events(&mut self) -> Result<ServerRx>;
        }
    }

    fn transcript(role: Role, transcript_type: TranscriptType, text: &str) -> ServerEvent {
        ServerEvent::Message(MessageEvent::new(ConversationMessage::Transcript(
            TranscriptPayload::new(role, transcript_type, text),
        )))
    }

    fn profile() -> AgentProfile {
        AgentProfile {
            name: "Cardiologist".to_string(),
            instructions: Some("You are a calm cardiologist.".to_string()),
            voice_id: Some("chris".to_string()),
            variables: BTreeMap::from([(
                NOTES_VARIABLE.to_string(),
                "chest pain".to_string(),
            )]),
        }
    }

    #[tokio::test]
    async fn test_start_forwards_only_subscribed_events() {
        let (server_tx, server_rx) = tokio::sync::broadcast::channel(16);
        let mut mock_client = MockVoiceClient::new();
        mock_client
            .expect_server_events()
            .times(1)
            .return_once(move || Ok(server_rx));
        mock_client
            .expect_start_call()
            .withf(|overrides| {
                overrides.as_ref().is_some_and(|o| {
                    o.name() == Some("Cardiologist")
                        && o.instructions() == Some("You are a calm cardiologist.")
                        && o.voice_id() == Some("chris")
                        && o.variable_values().get("notes").map(String::as_str)
                            == Some("chest pain")
                })
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut channel = RealtimeChannel::new(mock_client);
        channel.on(EventKind::CallStart);
        channel.on(EventKind::Message);
        let mut events = channel.start(&profile()).await.unwrap();

        server_tx.send(ServerEvent::CallStart).unwrap();
        server_tx.send(ServerEvent::SpeechStart).unwrap();
        server_tx
            .send(transcript(Role::User, TranscriptType::Partial, "my che"))
            .unwrap();
        server_tx
            .send(transcript(Role::User, TranscriptType::Final, "my chest hurts"))
            .unwrap();
        server_tx
            .send(ServerEvent::Message(MessageEvent::new(
                ConversationMessage::Other,
            )))
            .unwrap();
        server_tx.send(ServerEvent::Close { reason: None }).unwrap();

        assert_eq!(events.recv().await, Some(ChannelEvent::CallStarted));
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::PartialTranscript {
                role: Role::User,
                text: "my che".to_string()
            })
        );
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::FinalTranscript {
                role: Role::User,
                text: "my chest hurts".to_string()
            })
        );
        // Close ends the stream.
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_off_stops_delivery_of_later_events() {
        let (server_tx, server_rx) = tokio::sync::broadcast::channel(16);
        let mut mock_client = MockVoiceClient::new();
        mock_client
            .expect_server_events()
            .return_once(move || Ok(server_rx));
        mock_client.expect_start_call().returning(|_| Ok(()));

        let mut channel = RealtimeChannel::new(mock_client);
        for kind in EventKind::ALL {
            channel.on(kind);
        }
        let mut events = channel.start(&profile()).await.unwrap();

        server_tx.send(ServerEvent::SpeechStart).unwrap();
        assert_eq!(events.recv().await, Some(ChannelEvent::SpeechStarted));

        channel.off(EventKind::SpeechEnd);
        server_tx.send(ServerEvent::SpeechEnd).unwrap();
        server_tx.send(ServerEvent::CallEnd).unwrap();

        assert_eq!(events.recv().await, Some(ChannelEvent::CallEnded));
    }

    #[tokio::test]
    async fn test_stop_hangs_up_and_ends_the_stream() {
        let (_server_tx, server_rx) = tokio::sync::broadcast::channel(16);
        let mut mock_client = MockVoiceClient::new();
        mock_client
            .expect_server_events()
            .return_once(move || Ok(server_rx));
        mock_client.expect_start_call().returning(|_| Ok(()));
        mock_client.expect_stop_call().times(1).returning(|| Ok(()));

        let mut channel = RealtimeChannel::new(mock_client);
        let mut events = channel.start(&profile()).await.unwrap();

        channel.stop().await.unwrap();

        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (_server_tx, server_rx) = tokio::sync::broadcast::channel(16);
        let mut mock_client = MockVoiceClient::new();
        mock_client
            .expect_server_events()
            .times(1)
            .return_once(move || Ok(server_rx));
        mock_client.expect_start_call().times(1).returning(|_| Ok(()));

        let mut channel = RealtimeChannel::new(mock_client);
        channel.start(&profile()).await.unwrap();

        assert!(channel.start(&profile()).await.is_err());
    }
}
