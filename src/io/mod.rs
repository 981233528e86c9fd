//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client receiving Frigate events on `frigate/events`
//! - `ntfy` - ntfy HTTP client delivering push notifications

pub mod mqtt;
pub mod ntfy;

// Re-export commonly used types
pub use mqtt::{start_mqtt_client, EventSubscriber, TransportError};
pub use ntfy::{MediaUrls, Notifier, NotifyError, NtfyClient};
