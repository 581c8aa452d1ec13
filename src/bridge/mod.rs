/// Bridge layer: UI requests in, backend calls, UI responses out
///
/// This module maps each UI port message to one backend operation and
/// each outcome to one UI port message.

pub mod dispatch;
pub mod notifier;
pub mod protocol;
pub mod relay;

// Re-export commonly used types
pub use dispatch::dispatch;
pub use notifier::{MemoryNotifier, Notifier, StderrNotifier};
pub use protocol::{LoginResult, Request, Response};
pub use relay::Bridge;
