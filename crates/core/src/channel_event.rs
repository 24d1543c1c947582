use crate::session::{DoctorAgent, Role};
use std::collections::BTreeMap;

/// The kinds of events a voice channel can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CallStart,
    CallEnd,
    Message,
    SpeechStart,
    SpeechEnd,
}

impl EventKind {
    /// Every kind the call session listens to, in subscription order.
    pub const ALL: [EventKind; 5] = [
        EventKind::CallStart,
        EventKind::CallEnd,
        EventKind::Message,
        EventKind::SpeechStart,
        EventKind::SpeechEnd,
    ];
}

/// Events any voice channel provider emits back to the call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The remote side accepted the call.
    CallStarted,
    /// The call was hung up, by either side.
    CallEnded,
    /// Provisional recognition of the utterance in progress.
    PartialTranscript { role: Role, text: String },
    /// The committed text of an utterance.
    FinalTranscript { role: Role, text: String },
    /// The assistant started talking.
    SpeechStarted,
    /// The assistant stopped talking.
    SpeechEnded,
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::CallStarted => EventKind::CallStart,
            ChannelEvent::CallEnded => EventKind::CallEnd,
            ChannelEvent::PartialTranscript { .. } | ChannelEvent::FinalTranscript { .. } => {
                EventKind::Message
            }
            ChannelEvent::SpeechStarted => EventKind::SpeechStart,
            ChannelEvent::SpeechEnded => EventKind::SpeechEnd,
        }
    }
}

/// Template variable that carries the patient's notes into the agent's prompts.
pub const NOTES_VARIABLE: &str = "notes";

/// Identity of the agent a channel is opened for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentProfile {
    pub name: String,
    pub instructions: Option<String>,
    pub voice_id: Option<String>,
    /// Values substituted into the agent's prompt templates.
    pub variables: BTreeMap<String, String>,
}

impl AgentProfile {
    pub fn for_doctor(doctor: &DoctorAgent) -> Self {
        Self {
            name: doctor.specialist.clone(),
            instructions: doctor.agent_prompt.clone(),
            voice_id: doctor.voice_id.clone(),
            variables: BTreeMap::new(),
        }
    }
}
