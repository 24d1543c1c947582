use crate::AssistantOverrides;

/// `start` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    /// The hosted assistant to connect the call to
    assistant_id: String,

    /// Per-call changes to the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    assistant_overrides: Option<AssistantOverrides>,
}

impl StartEvent {
    pub fn new(assistant_id: &str) -> Self {
        Self {
            assistant_id: assistant_id.to_string(),
            assistant_overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: AssistantOverrides) -> Self {
        self.assistant_overrides = Some(overrides);
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn assistant_overrides(&self) -> Option<&AssistantOverrides> {
        self.assistant_overrides.as_ref()
    }
}
