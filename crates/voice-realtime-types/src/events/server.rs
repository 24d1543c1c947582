mod error;

pub use error::ErrorDetails;

use crate::{Role, TranscriptType};

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    /// Details about the error
    error: ErrorDetails,
}

impl ErrorEvent {
    pub fn error(&self) -> &ErrorDetails {
        &self.error
    }
}

/// `message` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEvent {
    message: ConversationMessage,
}

impl MessageEvent {
    pub fn new(message: ConversationMessage) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &ConversationMessage {
        &self.message
    }

    /// The transcript carried by this message, if it is one.
    pub fn transcript(&self) -> Option<&TranscriptPayload> {
        match &self.message {
            ConversationMessage::Transcript(transcript) => Some(transcript),
            ConversationMessage::Other => None,
        }
    }
}

/// Payloads delivered inside a `message` event. Only transcripts are modelled;
/// status updates, tool calls and the like are accepted and ignored.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ConversationMessage {
    #[serde(rename = "transcript")]
    Transcript(TranscriptPayload),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPayload {
    role: Role,
    transcript_type: TranscriptType,
    transcript: String,
}

impl TranscriptPayload {
    pub fn new(role: Role, transcript_type: TranscriptType, transcript: &str) -> Self {
        Self {
            role,
            transcript_type,
            transcript: transcript.to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn transcript_type(&self) -> TranscriptType {
        self.transcript_type
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}
