use std::collections::HashMap;

/// Per-call overrides applied on top of the hosted assistant.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    /// Display name of the persona, e.g. the doctor's specialization.
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,

    /// System instructions for the persona.
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,

    /// Voice used for the assistant's speech.
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<String>,

    /// Template variables substituted into the assistant's prompts.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    variable_values: HashMap<String, String>,
}

impl AssistantOverrides {
    pub fn builder() -> AssistantConfigurator {
        AssistantConfigurator::new()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }

    pub fn variable_values(&self) -> &HashMap<String, String> {
        &self.variable_values
    }
}

pub struct AssistantConfigurator {
    overrides: AssistantOverrides,
}

impl AssistantConfigurator {
    pub fn new() -> Self {
        Self {
            overrides: AssistantOverrides::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.overrides.name = Some(name.to_string());
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.overrides.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_voice_id(mut self, voice_id: &str) -> Self {
        self.overrides.voice_id = Some(voice_id.to_string());
        self
    }

    pub fn with_variable(mut self, key: &str, value: &str) -> Self {
        self.overrides
            .variable_values
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> AssistantOverrides {
        self.overrides
    }
}

impl Default for AssistantConfigurator {
    fn default() -> Self {
        Self::new()
    }
}
