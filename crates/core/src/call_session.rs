use crate::Notice;
use crate::channel_event::{AgentProfile, ChannelEvent, EventKind, NOTES_VARIABLE};
use crate::error::{CallError, GatewayError};
use crate::gateway::SessionGateway;
use crate::session::{DoctorAgent, Report, ReportRequest, Role, SessionDetail, TranscriptMessage};
use crate::voice_channel::{VoiceChannel, VoiceChannelProvider};
use anyhow::Context;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    NotConnected,
    Connecting,
    Connected,
}

/// The utterance currently being recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTranscript {
    pub role: Role,
    pub text: String,
}

struct OpenChannel<C> {
    channel: C,
    events: mpsc::Receiver<ChannelEvent>,
    exhausted: bool,
}

/// The lifecycle of one voice consultation.
///
/// A `CallSession` owns the voice channel it opens; the handle never leaves
/// this type. All mutation goes through `&mut self`, so event handling, start
/// and end can never interleave.
pub struct CallSession<P: VoiceChannelProvider, G: SessionGateway> {
    session_id: String,
    provider: P,
    gateway: G,
    notice_tx: mpsc::Sender<Notice>,
    report_timeout: Option<Duration>,
    status: CallStatus,
    messages: Vec<TranscriptMessage>,
    live: Option<LiveTranscript>,
    active_speaker: Option<Role>,
    busy: bool,
    detail: Option<SessionDetail>,
    channel: Option<OpenChannel<P::Channel>>,
}

impl<P: VoiceChannelProvider, G: SessionGateway> CallSession<P, G> {
    pub fn new(
        session_id: impl Into<String>,
        provider: P,
        gateway: G,
        notice_tx: mpsc::Sender<Notice>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            provider,
            gateway,
            notice_tx,
            report_timeout: None,
            status: CallStatus::NotConnected,
            messages: Vec::new(),
            live: None,
            active_speaker: None,
            busy: false,
            detail: None,
            channel: None,
        }
    }

    /// Bounds how long `end_call` waits for the report before tearing down.
    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = Some(timeout);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    pub fn live_transcript(&self) -> Option<&LiveTranscript> {
        self.live.as_ref()
    }

    pub fn active_speaker(&self) -> Option<Role> {
        self.active_speaker
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_channel_open(&self) -> bool {
        self.channel.is_some()
    }

    pub fn session_detail(&self) -> Option<&SessionDetail> {
        self.detail.as_ref()
    }

    /// Fetches the session record. Failures become notices and leave the
    /// session usable without doctor context.
    pub async fn load_session(&mut self) -> Option<&SessionDetail> {
        match self.gateway.fetch_session(&self.session_id).await {
            Ok(Some(detail)) => {
                tracing::info!(
                    "loaded session {} with {}",
                    detail.session_id,
                    detail.selected_doctor.specialist
                );
                self.detail = Some(detail);
            }
            Ok(None) => {
                tracing::warn!("session {} not found", self.session_id);
                self.notify(Notice::Error("Session not found.".to_string()));
            }
            Err(e) => {
                tracing::error!("failed to fetch session {}: {}", self.session_id, e);
                self.notify(Notice::Error("Failed to fetch session.".to_string()));
            }
        }
        self.detail.as_ref()
    }

    /// Opens a voice channel for `doctor`. Every event kind is subscribed
    /// before the channel is started, so no early event is lost.
    pub async fn start_call(&mut self, doctor: &DoctorAgent) -> Result<(), CallError> {
        if self.channel.is_some() {
            tracing::warn!("start requested while a call is in progress");
            return Err(CallError::AlreadyActive);
        }

        self.busy = true;
        self.status = CallStatus::Connecting;

        let mut profile = AgentProfile::for_doctor(doctor);
        if let Some(notes) = self
            .detail
            .as_ref()
            .and_then(|detail| detail.notes.as_deref())
            .filter(|notes| !notes.trim().is_empty())
        {
            profile
                .variables
                .insert(NOTES_VARIABLE.to_string(), notes.to_string());
        }
        match Self::open_channel(&self.provider, &profile).await {
            Ok(open) => {
                tracing::info!("voice channel opened for {}", profile.name);
                self.channel = Some(open);
                Ok(())
            }
            Err(e) => {
                tracing::error!("failed to open voice channel: {:#}", e);
                self.busy = false;
                self.status = CallStatus::NotConnected;
                self.notify(Notice::Error("Failed to start call.".to_string()));
                Err(CallError::Channel(e))
            }
        }
    }

    async fn open_channel(
        provider: &P,
        profile: &AgentProfile,
    ) -> anyhow::Result<OpenChannel<P::Channel>> {
        let mut channel = provider
            .create()
            .await
            .context("failed to create voice channel")?;

        for kind in EventKind::ALL {
            channel.on(kind);
        }

        match channel.start(profile).await {
            Ok(events) => Ok(OpenChannel {
                channel,
                events,
                exhausted: false,
            }),
            Err(e) => {
                for kind in EventKind::ALL {
                    channel.off(kind);
                }
                Err(e.context("failed to start voice channel"))
            }
        }
    }

    /// Waits for the next event of the open channel, in delivery order.
    ///
    /// Returns `None` once when the channel's stream ends. While no channel is
    /// open (or after its stream ended) this never resolves, which keeps it
    /// safe to poll from a `select!` loop.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        if let Some(open) = self.channel.as_mut() {
            if !open.exhausted {
                match open.events.recv().await {
                    Some(event) => return Some(event),
                    None => {
                        tracing::debug!("voice channel event stream ended");
                        open.exhausted = true;
                        return None;
                    }
                }
            }
        }
        std::future::pending().await
    }

    /// Applies one channel event. Events that arrive with no open channel are
    /// dropped.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        if self.channel.is_none() {
            tracing::debug!("ignoring {:?} event with no open channel", event.kind());
            return;
        }

        match event {
            ChannelEvent::CallStarted => {
                tracing::info!("call started");
                self.status = CallStatus::Connected;
                self.busy = false;
            }
            ChannelEvent::CallEnded => {
                tracing::info!("call ended");
                self.status = CallStatus::NotConnected;
            }
            ChannelEvent::PartialTranscript { role, text } => {
                self.active_speaker = Some(role);
                self.live = Some(LiveTranscript { role, text });
            }
            ChannelEvent::FinalTranscript { role, text } => {
                tracing::debug!("{}: {}", role, text);
                self.active_speaker = None;
                self.live = None;
                self.messages.push(TranscriptMessage { role, text });
            }
            ChannelEvent::SpeechStarted => {
                self.active_speaker = Some(Role::Assistant);
            }
            ChannelEvent::SpeechEnded => {
                self.active_speaker = Some(Role::User);
            }
        }
    }

    /// Ends the call: generates the report from the transcript so far, then
    /// tears the channel down whether or not the report succeeded.
    ///
    /// A no-op returning `None` when no call is open.
    pub async fn end_call(&mut self) -> Option<Report> {
        if self.channel.is_none() {
            tracing::debug!("end requested with no open channel");
            return None;
        }

        self.busy = true;
        let request = ReportRequest {
            messages: self.messages.clone(),
            session_detail: self.detail.clone(),
            session_id: self.session_id.clone(),
        };
        let submit = self.gateway.submit_report(request);
        let report = match self.report_timeout {
            Some(limit) => tokio::time::timeout(limit, submit)
                .await
                .unwrap_or_else(|_| Err(GatewayError::Timeout(limit))),
            None => submit.await,
        };
        self.busy = false;

        if let Some(open) = self.channel.take() {
            Self::teardown(open).await;
        }
        self.status = CallStatus::NotConnected;
        self.live = None;
        self.active_speaker = None;

        match report {
            Ok(report) => {
                tracing::info!("report generated for session {}", self.session_id);
                self.notify(Notice::Success(
                    "Call ended and report generated!".to_string(),
                ));
                Some(report)
            }
            Err(e) => {
                tracing::error!("failed to generate report: {}", e);
                self.notify(Notice::Error("Failed to generate report.".to_string()));
                None
            }
        }
    }

    // Unsubscribe, hang up, then drop the handle and its event stream.
    async fn teardown(mut open: OpenChannel<P::Channel>) {
        for kind in EventKind::ALL {
            open.channel.off(kind);
        }
        if let Err(e) = open.channel.stop().await {
            tracing::warn!("failed to stop voice channel: {:#}", e);
        }
    }

    fn notify(&self, notice: Notice) {
        if let Err(e) = self.notice_tx.try_send(notice) {
            tracing::warn!("dropped notice: {}", e);
        }
    }
}
