pub const VOICE_API_KEY: &str = "VOICE_API_KEY";
pub const VOICE_BASE_URL: &str = "VOICE_BASE_URL";

pub const BASE_URL: &str = "ws://127.0.0.1:8787/v1";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
