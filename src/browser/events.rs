use crate::capture::source::{
    DisconnectHandler, EventHandler, EventSource, NetworkEvent, NetworkEventKind, ResponseBody, Subscription,
};
use crate::error::{CaptureError, FetchError, Result};
use headless_chrome::Tab;
use headless_chrome::browser::ConnectionClosed;
use headless_chrome::browser::tab::EventListener;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Browser, Network};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

type SyncSendEvent = dyn EventListener<Event> + Send + Sync;

const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(2);

/// [`EventSource`] backed by the Network domain of a CDP tab.
///
/// `Network.responseReceived` maps to `ResponseStarted` and
/// `Network.loadingFinished` to `ResponseReady`. Listeners run on
/// headless_chrome's event thread, so bodies must be fetched from another
/// thread; the capture pipeline does this on the thread that runs it.
///
/// A closed websocket or an exited browser produces no CDP event, so
/// disconnect subscribers are also fed by a liveness watch that pings the
/// browser every `liveness_interval`.
pub struct TabEventSource {
    tab: Arc<Tab>,
    listeners: Mutex<HashMap<Subscription, Weak<SyncSendEvent>>>,
    watches: Mutex<HashMap<Subscription, Arc<AtomicBool>>>,
    next_id: AtomicU64,
    liveness_interval: Duration,
}

impl TabEventSource {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self {
            tab,
            listeners: Mutex::new(HashMap::new()),
            watches: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }

    /// Builder method: set how often the connection is checked
    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    fn next_subscription(&self) -> Subscription {
        Subscription(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn register(&self, listener: Arc<SyncSendEvent>) -> Result<Subscription> {
        let weak = self
            .tab
            .add_event_listener(listener)
            .map_err(|e| CaptureError::EventSource(format!("Failed to add event listener: {}", e)))?;

        let subscription = self.next_subscription();
        self.listeners
            .lock()
            .map_err(|e| CaptureError::EventSource(format!("Listener registry poisoned: {}", e)))?
            .insert(subscription, weak);

        Ok(subscription)
    }
}

impl Drop for TabEventSource {
    fn drop(&mut self) {
        if let Ok(watches) = self.watches.lock() {
            for cancel in watches.values() {
                cancel.store(true, Ordering::Relaxed);
            }
        }
    }
}

fn translate(kind: NetworkEventKind, event: &Event) -> Option<NetworkEvent> {
    match (kind, event) {
        (NetworkEventKind::ResponseStarted, Event::NetworkResponseReceived(ev)) => Some(NetworkEvent::ResponseStarted {
            request_id: ev.params.request_id.clone(),
            url: ev.params.response.url.clone(),
        }),
        (NetworkEventKind::ResponseReady, Event::NetworkLoadingFinished(ev)) => Some(NetworkEvent::ResponseReady {
            request_id: ev.params.request_id.clone(),
        }),
        _ => None,
    }
}

/// Whether a failed call means the browser connection is gone, as opposed to
/// a slow or rejected command
fn is_connection_closed(error: &anyhow::Error) -> bool {
    error.downcast_ref::<ConnectionClosed>().is_some()
}

/// Disconnect callback that fires at most once, whichever watcher sees it first
struct DisconnectOnce {
    handler: DisconnectHandler,
    fired: AtomicBool,
}

impl DisconnectOnce {
    fn fire(&self, reason: String) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            (self.handler)(reason);
        }
    }
}

/// Poll `alive` every `interval` until it reports a lost connection or
/// `cancel` is set; a lost connection is reported through `on_lost`
fn watch_liveness<A, L>(interval: Duration, cancel: Arc<AtomicBool>, alive: A, on_lost: L) -> Result<()>
where
    A: Fn() -> std::result::Result<(), String> + Send + 'static,
    L: FnOnce(String) + Send + 'static,
{
    thread::Builder::new()
        .name("cdp-liveness".to_string())
        .spawn(move || {
            while !cancel.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                if let Err(reason) = alive() {
                    on_lost(reason);
                    return;
                }
            }
        })
        .map_err(|e| CaptureError::EventSource(format!("Failed to start liveness watch: {}", e)))?;

    Ok(())
}

impl EventSource for TabEventSource {
    fn enable(&self) -> Result<()> {
        self.tab
            .call_method(Network::Enable {
                max_total_buffer_size: None,
                max_resource_buffer_size: None,
                max_post_data_size: None,
                report_direct_socket_traffic: None,
                enable_durable_messages: None,
            })
            .map_err(|e| CaptureError::EventSource(format!("Failed to enable network events: {}", e)))?;

        Ok(())
    }

    fn on_event(&self, kind: NetworkEventKind, handler: EventHandler) -> Result<Subscription> {
        let listener: Arc<SyncSendEvent> = Arc::new(move |event: &Event| {
            if let Some(event) = translate(kind, event) {
                handler(event);
            }
        });

        self.register(listener)
    }

    fn on_disconnect(&self, handler: DisconnectHandler) -> Result<Subscription> {
        let once = Arc::new(DisconnectOnce {
            handler,
            fired: AtomicBool::new(false),
        });

        let from_events = Arc::clone(&once);
        let listener: Arc<SyncSendEvent> = Arc::new(move |event: &Event| match event {
            Event::InspectorDetached(ev) => from_events.fire(ev.params.reason.clone()),
            Event::InspectorTargetCrashed(_) => from_events.fire("target crashed".to_string()),
            _ => {}
        });
        let subscription = self.register(listener)?;

        let cancel = Arc::new(AtomicBool::new(false));
        let tab = Arc::clone(&self.tab);
        let alive = move || match tab.call_method(Browser::GetVersion(None)) {
            Err(e) if is_connection_closed(&e) => Err(e.to_string()),
            Err(e) => {
                log::debug!("Liveness check failed without closing the connection: {}", e);
                Ok(())
            }
            Ok(_) => Ok(()),
        };
        watch_liveness(self.liveness_interval, Arc::clone(&cancel), alive, move |reason| {
            once.fire(format!("connection closed: {}", reason))
        })?;

        self.watches
            .lock()
            .map_err(|e| CaptureError::EventSource(format!("Listener registry poisoned: {}", e)))?
            .insert(subscription, cancel);

        Ok(subscription)
    }

    fn unsubscribe(&self, subscription: Subscription) -> Result<()> {
        let cancel = self
            .watches
            .lock()
            .map_err(|e| CaptureError::EventSource(format!("Listener registry poisoned: {}", e)))?
            .remove(&subscription);
        if let Some(cancel) = cancel {
            cancel.store(true, Ordering::Relaxed);
        }

        let weak = self
            .listeners
            .lock()
            .map_err(|e| CaptureError::EventSource(format!("Listener registry poisoned: {}", e)))?
            .remove(&subscription);

        if let Some(weak) = weak {
            self.tab
                .remove_event_listener(&weak)
                .map_err(|e| CaptureError::EventSource(format!("Failed to remove event listener: {}", e)))?;
        }

        Ok(())
    }

    fn fetch_body(&self, request_id: &str) -> std::result::Result<ResponseBody, FetchError> {
        let body = self
            .tab
            .call_method(Network::GetResponseBody {
                request_id: request_id.to_string(),
            })
            .map_err(|e| FetchError::new(request_id, e.to_string()))?;

        Ok(ResponseBody {
            body: body.body,
            base64_encoded: body.base_64_encoded,
        })
    }
}
