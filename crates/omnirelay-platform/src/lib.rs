//! Client for the OmniDimension voice-agent platform.
//!
//! The relay server never talks to the platform directly: it holds an
//! `Arc<dyn VoicePlatform>` and calls one trait method per request. The
//! production implementation is [`OmniClient`], a thin wrapper over a shared
//! `reqwest::Client` that maps the platform's REST surface onto typed calls.
//!
//! Agent, call, and call-log descriptors are owned by the platform. They are
//! returned as opaque [`serde_json::Value`]s and never interpreted here.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::OmniClient;
pub use config::{PlatformConfig, DEFAULT_BASE_URL};
pub use error::PlatformError;
pub use types::{
    CallLogFilter, DispatchRequest, ListParams, VoicePlatform, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};
