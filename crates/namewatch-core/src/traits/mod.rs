//! Core traits for the namewatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ProfileTransport`]: Single-shot remote profile lookup
//! - [`NotificationSink`]: Delivery of a composed notification

pub mod profile_transport;
pub mod notification_sink;

pub use profile_transport::{LookupResponse, Profile, ProfileTransport};
pub use notification_sink::NotificationSink;
