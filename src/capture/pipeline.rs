use crate::capture::accumulator::CaptureState;
use crate::capture::config::CaptureOptions;
use crate::capture::correlator::{ReadyResponse, Registration, RequestCorrelator};
use crate::capture::decoder::{RawPage, fetch_and_decode};
use crate::capture::extractor::{ProfileRecord, extract_records};
use crate::capture::progress::Progress;
use crate::capture::source::{EventSource, NetworkEvent, NetworkEventKind, Subscription};
use crate::error::{CaptureError, PageError, Result};
use crate::output::CaptureSink;
use serde::Serialize;
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Lifecycle phase of a [`CapturePipeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Listening,
    Draining,
    Finalized,
}

/// Why a capture run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Termination {
    /// Stop signal received
    Stopped,

    /// The event source lost its browser connection
    ConnectionLost(String),
}

/// Counters for everything that happened during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Pages processed, whatever their outcome
    pub pages: u64,
    pub rejected: u64,
    pub decode_errors: u64,
    pub fetch_errors: u64,

    /// Items dropped for lacking a uid
    pub skipped_items: u64,

    /// Pending responses dropped because the correlation map was full
    pub evicted: u64,
}

/// Final output of a capture run, handed to a [`CaptureSink`]
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    /// Deduplicated records in first-seen order
    pub records: Vec<ProfileRecord>,

    pub request_count: u64,

    /// Envelopes of every decoded page, including rejected ones
    pub raw_pages: Vec<Value>,

    pub stats: CaptureStats,

    pub termination: Termination,
}

enum Inbound {
    Ready(ReadyResponse),
    Stop,
    ConnectionLost(String),
}

/// Cloneable handle that asks a running pipeline to stop.
///
/// The signal is cooperative: it takes effect at the next event boundary.
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<Inbound>,
}

impl StopHandle {
    pub fn stop(&self) {
        // The pipeline owns a sender, so this only fails once it has finished
        let _ = self.tx.send(Inbound::Stop);
    }

    /// Guard that stops the pipeline when dropped, so a caller bailing out
    /// early with `?` still lets the run finalize and reach its sink
    pub fn stop_on_drop(&self) -> StopGuard {
        StopGuard {
            handle: self.clone(),
            armed: true,
        }
    }
}

/// Sends a stop when dropped unless disarmed
pub struct StopGuard {
    handle: StopHandle,
    armed: bool,
}

impl StopGuard {
    /// Keep the pipeline running after the guard is dropped
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        if self.armed {
            self.handle.stop();
        }
    }
}

/// Wires an [`EventSource`] through correlation, decoding, extraction and
/// accumulation.
///
/// Event handlers only touch the correlator, so registering new requests is
/// never blocked by a slow body fetch. Ready responses are queued and
/// processed one at a time by the thread calling [`CapturePipeline::run`],
/// which is the only code that mutates the capture state.
pub struct CapturePipeline<S: EventSource> {
    source: S,
    options: CaptureOptions,
    correlator: Arc<Mutex<RequestCorrelator>>,
    state: CaptureState,
    stats: CaptureStats,
    last_progress: Option<Progress>,
    phase: PipelinePhase,
    subscriptions: Vec<Subscription>,
    tx: Sender<Inbound>,
    rx: Receiver<Inbound>,
}

impl<S: EventSource> CapturePipeline<S> {
    pub fn new(source: S, options: CaptureOptions) -> Self {
        let correlator = RequestCorrelator::new(options.url_pattern.clone(), options.max_pending);
        let (tx, rx) = mpsc::channel();

        Self {
            source,
            options,
            correlator: Arc::new(Mutex::new(correlator)),
            state: CaptureState::new(),
            stats: CaptureStats::default(),
            last_progress: None,
            phase: PipelinePhase::Idle,
            subscriptions: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { tx: self.tx.clone() }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Progress after the most recently accepted page
    pub fn last_progress(&self) -> Option<Progress> {
        self.last_progress
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Subscribe to the event source and enable delivery (Idle -> Listening)
    pub fn start(&mut self) -> Result<()> {
        if self.phase != PipelinePhase::Idle {
            return Err(CaptureError::InvalidState(format!(
                "cannot start a pipeline in phase {:?}",
                self.phase
            )));
        }

        let correlator = Arc::clone(&self.correlator);
        let started = self.source.on_event(
            NetworkEventKind::ResponseStarted,
            Box::new(move |event: NetworkEvent| {
                if let NetworkEvent::ResponseStarted { request_id, url } = event {
                    let registration = lock(&correlator).on_response_started(&request_id, &url);
                    if let Registration::TrackedWithEviction { evicted } = registration {
                        log::warn!("Too many in-flight responses, dropped request {}", evicted);
                    }
                }
            }),
        )?;
        self.subscriptions.push(started);

        let correlator = Arc::clone(&self.correlator);
        let tx = self.tx.clone();
        let ready = self.source.on_event(
            NetworkEventKind::ResponseReady,
            Box::new(move |event: NetworkEvent| {
                if let NetworkEvent::ResponseReady { request_id } = event {
                    // Queue while still holding the lock, so a drain that sees
                    // no pending requests also sees this message
                    let mut correlator = lock(&correlator);
                    if let Some(ready) = correlator.on_response_ready(&request_id) {
                        let _ = tx.send(Inbound::Ready(ready));
                    }
                }
            }),
        )?;
        self.subscriptions.push(ready);

        let tx = self.tx.clone();
        let disconnect = self.source.on_disconnect(Box::new(move |reason: String| {
            let _ = tx.send(Inbound::ConnectionLost(reason));
        }))?;
        self.subscriptions.push(disconnect);

        self.source.enable()?;
        self.phase = PipelinePhase::Listening;
        log::info!("Listening for responses matching '{}'", self.options.url_pattern);

        Ok(())
    }

    /// Run until stopped or disconnected, then drain, finalize and hand the
    /// report to `sink`. Starts the pipeline first if it is still idle.
    pub fn run(mut self, sink: &mut dyn CaptureSink) -> Result<CaptureReport> {
        if self.phase == PipelinePhase::Idle {
            self.start()?;
        }

        let termination = self.listen();
        let termination = self.drain(termination);
        let report = self.finalize(termination);

        sink.consume(&report)?;
        Ok(report)
    }

    fn listen(&mut self) -> Termination {
        loop {
            match self.rx.recv() {
                Ok(Inbound::Ready(ready)) => self.process(ready),
                Ok(Inbound::Stop) => return Termination::Stopped,
                Ok(Inbound::ConnectionLost(reason)) => {
                    log::error!("Browser connection lost: {}", reason);
                    return Termination::ConnectionLost(reason);
                }
                Err(_) => return Termination::Stopped,
            }
        }
    }

    fn drain(&mut self, mut termination: Termination) -> Termination {
        self.phase = PipelinePhase::Draining;
        lock(&self.correlator).close();

        let mut waiting = termination == Termination::Stopped;
        let deadline = Instant::now() + self.options.drain_grace;
        log::info!("Draining in-flight responses");

        loop {
            // Read before polling the queue: a request that leaves the pending
            // map has already been queued
            let pending = lock(&self.correlator).pending_len();
            let next = match self.rx.try_recv() {
                Ok(inbound) => Some(inbound),
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {
                    if !waiting || pending == 0 {
                        break;
                    }

                    let now = Instant::now();
                    if now >= deadline {
                        log::warn!("Drain grace period elapsed, abandoning {} in-flight responses", pending);
                        break;
                    }

                    match self.rx.recv_timeout(deadline - now) {
                        Ok(inbound) => Some(inbound),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            };

            match next {
                Some(Inbound::Ready(ready)) => self.process(ready),
                Some(Inbound::ConnectionLost(reason)) => {
                    log::error!("Browser connection lost while draining: {}", reason);
                    waiting = false;
                    if termination == Termination::Stopped {
                        termination = Termination::ConnectionLost(reason);
                    }
                }
                Some(Inbound::Stop) | None => {}
            }
        }

        for subscription in std::mem::take(&mut self.subscriptions) {
            if let Err(e) = self.source.unsubscribe(subscription) {
                log::warn!("Failed to unsubscribe {:?}: {}", subscription, e);
            }
        }

        termination
    }

    fn finalize(mut self, termination: Termination) -> CaptureReport {
        self.phase = PipelinePhase::Finalized;
        self.stats.evicted = lock(&self.correlator).evicted();

        let (records, request_count, raw_pages) = self.state.into_parts();
        log::info!(
            "Capture finished: {} unique users from {} pages ({} rejected, {} undecodable, {} fetch failures)",
            records.len(),
            request_count,
            self.stats.rejected,
            self.stats.decode_errors,
            self.stats.fetch_errors
        );

        CaptureReport {
            records,
            request_count,
            raw_pages,
            stats: self.stats,
            termination,
        }
    }

    /// Decode, extract and accumulate one ready response
    fn process(&mut self, ready: ReadyResponse) {
        match fetch_and_decode(&self.source, &ready) {
            Ok(page) => self.accept(page),
            Err(PageError::Rejected { status, page }) => {
                let message = page
                    .payload
                    .get("status_msg")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                log::warn!(
                    "Request {} rejected (status {:?}) {}: {}",
                    ready.request_id,
                    status,
                    message,
                    ready.url
                );
                self.stats.pages += 1;
                self.stats.rejected += 1;
                self.state.record_request(Some(page.payload));
            }
            Err(PageError::Decode(e)) => {
                log::warn!("Request {} could not be decoded: {}", ready.request_id, e);
                self.stats.pages += 1;
                self.stats.decode_errors += 1;
                self.state.record_request(None);
            }
            Err(PageError::Fetch(e)) => {
                log::warn!("{}", e);
                self.stats.fetch_errors += 1;
            }
        }
    }

    fn accept(&mut self, page: RawPage) {
        let extraction = extract_records(&page);
        let page_items = page.items.len();
        let hint = page.hint();

        let added = self.state.append(extraction.records);
        self.state.record_request(Some(page.payload));
        self.stats.pages += 1;
        self.stats.skipped_items += extraction.skipped as u64;

        let progress = Progress {
            page_items,
            added,
            total_records: self.state.len(),
            request_count: self.state.request_count(),
            hint,
        };
        log::info!("{}", progress.line());
        self.last_progress = Some(progress);
    }
}

fn lock(correlator: &Mutex<RequestCorrelator>) -> MutexGuard<'_, RequestCorrelator> {
    correlator.lock().unwrap_or_else(PoisonError::into_inner)
}
