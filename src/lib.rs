//! # follow-capture
//!
//! Harvests a following list from a live, user-driven browser session by
//! listening to Chrome DevTools Protocol (CDP) network events while the user
//! scrolls, then analyzes the captured bios offline.
//!
//! ## How it works
//!
//! The browser's `Network.responseReceived` / `Network.loadingFinished` events
//! are correlated by request id. Once a following-list response has finished
//! loading its body is fetched, decoded and normalized into
//! [`ProfileRecord`]s, which are deduplicated by uid in first-seen order.
//! Capture never talks to the API directly; it only sees what the page loads.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use follow_capture::{BrowserSession, CaptureOptions, CapturePipeline, ConnectionOptions, OutputDir};
//!
//! # fn main() -> follow_capture::Result<()> {
//! // Attach to a browser started with --remote-debugging-port=9222
//! let session = BrowserSession::connect(ConnectionOptions::new("ws://127.0.0.1:9222/devtools/browser/<id>"))?;
//! let tab = session.active_or_new_tab()?;
//!
//! let mut pipeline = CapturePipeline::new(session.event_source(tab), CaptureOptions::default());
//! pipeline.start()?;
//!
//! // Hand the stop handle to whatever decides the user is done scrolling
//! let stop = pipeline.stop_handle();
//! std::thread::spawn(move || {
//!     let _ = std::io::stdin().read_line(&mut String::new());
//!     stop.stop();
//! });
//!
//! let report = pipeline.run(&mut OutputDir::new("output"))?;
//! println!("Captured {} users", report.records.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`capture`]: the capture pipeline (correlation, decoding, extraction, deduplication)
//! - [`browser`]: browser session management and the CDP event source
//! - [`output`]: the downstream consumer interface and output files
//! - [`analysis`]: keyword-based bio and schedule analysis
//! - [`error`]: Error types and result aliases

pub mod analysis;
pub mod browser;
pub mod capture;
pub mod error;
pub mod output;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions, TabEventSource};
pub use capture::{
    CaptureOptions, CapturePipeline, CaptureReport, CaptureState, EventSource, NetworkEvent, ProfileRecord,
    StopGuard, StopHandle, Termination,
};
pub use error::{CaptureError, Result};
pub use output::{CaptureSink, OutputDir};
