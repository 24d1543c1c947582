use crate::client::stats::Stats;
use crate::types;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use medvoice_realtime_types::AssistantOverrides;
use medvoice_realtime_types::events::client::StartEvent;
use std::sync::{Arc, Mutex};
use tokio_tungstenite::tungstenite::Message;

pub(crate) mod config;
mod consts;
pub(crate) mod stats;
mod utils;

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<types::ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<types::ServerEvent>;

/// The operations a call needs from a connected voice client.
///
/// Implemented by [`Client`]; adapters are written against this trait so the
/// websocket can be replaced by a mock in tests.
#[async_trait]
pub trait VoiceClient: Send {
    /// Asks the hosted assistant to begin the call.
    async fn start_call(&mut self, overrides: Option<AssistantOverrides>) -> Result<()>;

    /// Asks the hosted assistant to hang up and closes the outgoing half.
    async fn stop_call(&mut self) -> Result<()>;

    /// Subscribes to server events. Events sent before the call are not replayed.
    async fn server_events(&mut self) -> Result<ServerRx>;
}

// Holds the channel capacity, the client/server transmitters, the connection
// configuration and the call stats guarded by a Mutex.
pub struct Client {
    capacity: usize,
    config: config::Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    fn new(capacity: usize, config: config::Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow!("already connected"));
        }

        let request = utils::build_request(&self.config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<types::ClientEvent>(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx);
        self.s_tx = Some(s_tx.clone());

        // Writer: drains client events until every sender is gone, then closes the socket.
        tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("failed to close websocket: {}", e);
            }
        });

        let stats = self.stats.clone();
        // Reader: decodes server frames and broadcasts them. Frames that do not
        // decode are logged and skipped.
        tokio::spawn(async move {
            let mut close_reason = None;
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        close_reason = Some(e.to_string());
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        let event = match serde_json::from_str::<types::ServerEvent>(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::error!(
                                    "failed to deserialize event: {}, text=> {:?}",
                                    e,
                                    text
                                );
                                continue;
                            }
                        };

                        if let Ok(mut stats_guard) = stats.lock() {
                            match &event {
                                types::ServerEvent::Message(message) => {
                                    if let Some(transcript) = message.transcript() {
                                        stats_guard.record_transcript(
                                            transcript.transcript_type()
                                                == types::TranscriptType::Final,
                                        );
                                    }
                                }
                                types::ServerEvent::SpeechStart => {
                                    stats_guard.record_assistant_turn()
                                }
                                _ => {}
                            }
                        } else {
                            tracing::error!("failed to update stats");
                        }

                        tracing::debug!("received event: {:?}", event);
                        if let Err(e) = s_tx.send(event) {
                            // No subscribers yet; nothing to deliver to.
                            tracing::debug!("dropped event without receivers: {}", e);
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message of {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        close_reason = reason.map(|frame| frame.reason.to_string());
                        break;
                    }
                    _ => {}
                }
            }
            let _ = s_tx.send(types::ServerEvent::Close {
                reason: close_reason,
            });
        });

        Ok(())
    }

    pub fn stats(&self) -> Result<Stats> {
        self.stats
            .lock()
            .map(|stats_guard| stats_guard.clone())
            .map_err(|_| anyhow!("failed to get stats"))
    }

    async fn send_client_event(&mut self, event: types::ClientEvent) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(event).await?;
                Ok(())
            }
            None => Err(anyhow!("not connected yet")),
        }
    }
}

#[async_trait]
impl VoiceClient for Client {
    async fn start_call(&mut self, overrides: Option<AssistantOverrides>) -> Result<()> {
        let mut start = StartEvent::new(self.config.assistant_id());
        if let Some(overrides) = overrides {
            start = start.with_overrides(overrides);
        }
        self.send_client_event(types::ClientEvent::Start(start)).await
    }

    async fn stop_call(&mut self) -> Result<()> {
        let result = self.send_client_event(types::ClientEvent::Stop).await;
        match self.stats() {
            Ok(stats) => tracing::info!(
                "call stats: {} partial / {} final transcripts, {} assistant turns",
                stats.partial_transcripts(),
                stats.final_transcripts(),
                stats.assistant_turns()
            ),
            Err(e) => tracing::warn!("{}", e),
        }
        // Dropping the sender lets the writer flush and close the socket.
        self.c_tx = None;
        result
    }

    async fn server_events(&mut self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow!("not connected yet")),
        }
    }
}

pub async fn connect_with_config(capacity: usize, config: config::Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use tokio::net::TcpListener;

    // Accepts one websocket, pushes the given frames, and returns the first
    // text frame the client sent.
    async fn serve_once(frames: Vec<&'static str>) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let first = loop {
                match ws.next().await.unwrap().unwrap() {
                    Message::Text(text) => break text,
                    _ => continue,
                }
            };
            for frame in frames {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            ws.close(None).await.ok();
            first
        });
        (format!("ws://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_start_call_sends_start_and_broadcasts_server_events() {
        let (url, server) = serve_once(vec![
            r#"{"type":"call-start"}"#,
            r#"not json"#,
            r#"{"type":"message","message":{"type":"transcript","role":"user","transcriptType":"final","transcript":"I have a headache"}}"#,
        ])
        .await;

        let config = Config::builder()
            .with_base_url(&url)
            .with_api_key("sk-test")
            .with_assistant_id("asst_1")
            .build();
        let mut client = connect_with_config(16, config).await.unwrap();
        let mut events = client.server_events().await.unwrap();

        let overrides = AssistantOverrides::builder()
            .with_name("Dermatologist")
            .build();
        client.start_call(Some(overrides)).await.unwrap();

        let sent = server.await.unwrap();
        let sent: types::ClientEvent = serde_json::from_str(&sent).unwrap();
        let types::ClientEvent::Start(start) = sent else {
            panic!("expected a start event, got {:?}", sent);
        };
        assert_eq!(start.assistant_id(), "asst_1");
        assert_eq!(
            start.assistant_overrides().and_then(|o| o.name()),
            Some("Dermatologist")
        );

        assert!(matches!(events.recv().await.unwrap(), types::ServerEvent::CallStart));
        // The undecodable frame is skipped rather than ending the stream.
        match events.recv().await.unwrap() {
            types::ServerEvent::Message(message) => {
                assert_eq!(message.transcript().unwrap().transcript(), "I have a headache");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            types::ServerEvent::Close { .. }
        ));

        let stats = client.stats().unwrap();
        assert_eq!(stats.final_transcripts(), 1);
        assert_eq!(stats.partial_transcripts(), 0);
    }

    #[tokio::test]
    async fn test_stop_call_closes_outgoing_half() {
        let (url, _server) = serve_once(vec![]).await;
        let config = Config::builder().with_base_url(&url).build();
        let mut client = connect_with_config(16, config).await.unwrap();

        client.stop_call().await.unwrap();
        assert!(client.stop_call().await.is_err());
    }
}
