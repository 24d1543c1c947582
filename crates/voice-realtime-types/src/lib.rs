//now people using the types library can use these types
pub mod assistant;
pub mod events;
pub mod transcript;

//re-export types for easier access
pub use assistant::{AssistantConfigurator, AssistantOverrides};
pub use events::{ClientEvent, ServerEvent};
pub use transcript::{Role, TranscriptType};
