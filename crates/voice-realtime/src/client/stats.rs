#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    partial_transcripts: u32,
    final_transcripts: u32,
    assistant_turns: u32,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_transcript(&mut self, is_final: bool) {
        if is_final {
            self.final_transcripts += 1;
        } else {
            self.partial_transcripts += 1;
        }
    }

    pub(crate) fn record_assistant_turn(&mut self) {
        self.assistant_turns += 1;
    }

    pub fn partial_transcripts(&self) -> u32 {
        self.partial_transcripts
    }

    pub fn final_transcripts(&self) -> u32 {
        self.final_transcripts
    }

    pub fn assistant_turns(&self) -> u32 {
        self.assistant_turns
    }
}
