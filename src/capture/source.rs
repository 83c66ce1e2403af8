use crate::error::{FetchError, Result};

/// A low-level network lifecycle event emitted by the controlled browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Response headers arrived (`Network.responseReceived`)
    ResponseStarted { request_id: String, url: String },

    /// Response body is fully loaded (`Network.loadingFinished`)
    ResponseReady { request_id: String },
}

impl NetworkEvent {
    pub fn kind(&self) -> NetworkEventKind {
        match self {
            NetworkEvent::ResponseStarted { .. } => NetworkEventKind::ResponseStarted,
            NetworkEvent::ResponseReady { .. } => NetworkEventKind::ResponseReady,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            NetworkEvent::ResponseStarted { request_id, .. } | NetworkEvent::ResponseReady { request_id } => {
                request_id
            }
        }
    }
}

/// Event type used when subscribing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkEventKind {
    ResponseStarted,
    ResponseReady,
}

/// Raw response body as returned by the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    pub body: String,

    /// Body is base64 transport-encoded
    pub base64_encoded: bool,
}

impl ResponseBody {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            base64_encoded: false,
        }
    }

    pub fn base64(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            base64_encoded: true,
        }
    }
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

/// Callback invoked for every subscribed network event
pub type EventHandler = Box<dyn Fn(NetworkEvent) + Send + Sync>;

/// Callback invoked once when the event source loses its connection
pub type DisconnectHandler = Box<dyn Fn(String) + Send + Sync>;

/// Supplier of network events and response bodies.
///
/// Handlers may be invoked from a thread owned by the implementation; they must
/// stay cheap and never block on body retrieval.
pub trait EventSource {
    /// Begin event delivery
    fn enable(&self) -> Result<()>;

    /// Subscribe to one event type
    fn on_event(&self, kind: NetworkEventKind, handler: EventHandler) -> Result<Subscription>;

    /// Subscribe to connection loss
    fn on_disconnect(&self, handler: DisconnectHandler) -> Result<Subscription>;

    /// Remove a previously registered handler
    fn unsubscribe(&self, subscription: Subscription) -> Result<()>;

    /// Fetch the body of a finished response
    fn fetch_body(&self, request_id: &str) -> std::result::Result<ResponseBody, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_and_id() {
        let started = NetworkEvent::ResponseStarted {
            request_id: "7.1".to_string(),
            url: "https://example.com".to_string(),
        };
        let ready = NetworkEvent::ResponseReady {
            request_id: "7.1".to_string(),
        };

        assert_eq!(started.kind(), NetworkEventKind::ResponseStarted);
        assert_eq!(ready.kind(), NetworkEventKind::ResponseReady);
        assert_eq!(started.request_id(), "7.1");
        assert_eq!(ready.request_id(), "7.1");
    }

    #[test]
    fn test_response_body_constructors() {
        assert!(!ResponseBody::text("{}").base64_encoded);
        assert!(ResponseBody::base64("e30=").base64_encoded);
    }
}
