//! Network capture pipeline
//!
//! Turns the browser's network lifecycle events into a deduplicated collection
//! of profile records:
//! - [`RequestCorrelator`]: pairs `ResponseStarted` with `ResponseReady` by request id
//! - [`decoder`]: fetches and decodes a response body into a [`RawPage`]
//! - [`extractor`]: normalizes list items into [`ProfileRecord`]s
//! - [`CaptureState`]: owns the deduplicated, ordered record collection
//! - [`Progress`]: read-only progress line after each page
//! - [`CapturePipeline`]: wires the stages together and owns the lifecycle

pub mod accumulator;
pub mod config;
pub mod correlator;
pub mod decoder;
pub mod extractor;
pub mod pipeline;
pub mod progress;
pub mod source;

pub use accumulator::CaptureState;
pub use config::{CaptureOptions, DEFAULT_URL_PATTERN};
pub use correlator::{ReadyResponse, Registration, RequestCorrelator};
pub use decoder::{PaginationHint, RawPage, decode_body, fetch_and_decode};
pub use extractor::{Extraction, PROFILE_URL_BASE, ProfileRecord, extract_records};
pub use pipeline::{CapturePipeline, CaptureReport, CaptureStats, PipelinePhase, StopGuard, StopHandle, Termination};
pub use progress::Progress;
pub use source::{
    DisconnectHandler, EventHandler, EventSource, NetworkEvent, NetworkEventKind, ResponseBody, Subscription,
};
