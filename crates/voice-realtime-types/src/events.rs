pub mod client;
pub mod server;

use client::*;
use server::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "start")]
    Start(StartEvent),
    #[serde(rename = "stop")]
    Stop,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Synthesized locally when the websocket closes.
    #[serde(rename = "close")]
    Close {
        reason: Option<String>,
    },
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "call-start")]
    CallStart,
    #[serde(rename = "call-end")]
    CallEnd,
    #[serde(rename = "speech-start")]
    SpeechStart,
    #[serde(rename = "speech-end")]
    SpeechEnd,
    #[serde(rename = "message")]
    Message(MessageEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, TranscriptType};

    #[test]
    fn test_lifecycle_events_parse_from_bare_type_tag() {
        let event: ServerEvent = serde_json::from_str(r#"{"type":"call-start"}"#).unwrap();
        assert!(matches!(event, ServerEvent::CallStart));

        let event: ServerEvent = serde_json::from_str(r#"{"type":"speech-end"}"#).unwrap();
        assert!(matches!(event, ServerEvent::SpeechEnd));
    }

    #[test]
    fn test_transcript_message_parses_role_and_type() {
        let json = r#"{
            "type": "message",
            "message": {
                "type": "transcript",
                "role": "assistant",
                "transcriptType": "partial",
                "transcript": "Hel"
            }
        }"#;

        let event: ServerEvent = serde_json::from_str(json).unwrap();
        let ServerEvent::Message(message) = event else {
            panic!("expected a message event");
        };
        let transcript = message.transcript().expect("transcript payload");
        assert_eq!(transcript.role(), Role::Assistant);
        assert_eq!(transcript.transcript_type(), TranscriptType::Partial);
        assert_eq!(transcript.transcript(), "Hel");
    }

    #[test]
    fn test_unknown_message_payloads_are_tolerated() {
        let json = r#"{"type":"message","message":{"type":"function-call","name":"lookup"}}"#;

        let event: ServerEvent = serde_json::from_str(json).unwrap();
        let ServerEvent::Message(message) = event else {
            panic!("expected a message event");
        };
        assert!(message.transcript().is_none());
    }

    #[test]
    fn test_start_event_serializes_camel_case_overrides() {
        let overrides = crate::AssistantOverrides::builder()
            .with_name("Cardiologist")
            .with_voice_id("will")
            .with_variable("notes", "palpitations")
            .build();
        let event = ClientEvent::Start(StartEvent::new("asst_123").with_overrides(overrides));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "start");
        assert_eq!(value["assistantId"], "asst_123");
        assert_eq!(value["assistantOverrides"]["name"], "Cardiologist");
        assert_eq!(value["assistantOverrides"]["voiceId"], "will");
        assert_eq!(
            value["assistantOverrides"]["variableValues"]["notes"],
            "palpitations"
        );
        assert!(value["assistantOverrides"].get("instructions").is_none());
    }

    #[test]
    fn test_error_event_exposes_details() {
        let json = r#"{"type":"error","error":{"type":"invalid_request","code":"assistant_not_found","message":"no such assistant"}}"#;

        let event: ServerEvent = serde_json::from_str(json).unwrap();
        let ServerEvent::Error(error) = event else {
            panic!("expected an error event");
        };
        assert_eq!(error.error().error_type(), Some("invalid_request"));
        assert_eq!(error.error().code(), Some("assistant_not_found"));
        assert_eq!(error.error().message(), "no such assistant");

        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"error","error":{"message":"boom"}}"#).unwrap();
        let ServerEvent::Error(error) = event else {
            panic!("expected an error event");
        };
        assert!(error.error().code().is_none());
    }
}
