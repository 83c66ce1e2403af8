//! Browser session management
//!
//! Launches a browser with a persistent profile or attaches to one already
//! running in remote-debugging mode, and exposes a tab's network events as an
//! [`EventSource`](crate::capture::EventSource).

pub mod config;
pub mod events;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use events::TabEventSource;
pub use session::BrowserSession;
