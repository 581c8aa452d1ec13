/// Core types for Record Bridge
///
/// Payload types, configuration, and the session event bus.

pub mod config;
pub mod events;
pub mod record;

// Re-export commonly used types
pub use config::{BackendKind, BridgeConfig, BridgeConfigBuilder};
pub use events::EventBus;
pub use record::{Credential, Record, RecordFields, SessionChange, SessionUser};
