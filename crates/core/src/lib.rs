pub mod call_session;
pub mod channel_event;
pub mod error;
pub mod gateway;
pub mod report;
pub mod session;
pub mod voice_channel;

/// Transient user-facing messages the call session emits to the runtime.
///
/// The session never prints; the runtime decides how a notice is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An operation finished as the user expected.
    Success(String),
    /// An operation failed; the session stays usable.
    Error(String),
}
