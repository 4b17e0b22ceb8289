#![forbid(unsafe_code)]

//! Network capability used by the runtime.
//!
//! A [`Transport`] issues one request and later invokes its completion
//! exactly once with the terminal outcome. It never retries and never
//! reports intermediate states. `send` returning an error means the request
//! was never issued; the completion is dropped without being called.
//!
//! [`QueuedTransport`] parks every request until the caller answers it,
//! which lets tests deliver responses in any order.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::protocol::{HttpRequest, HttpResponse};

/// Why a request produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No way to issue requests on this host.
    Unavailable(String),
    /// The request was issued but failed before a status arrived.
    Network(String),
    /// The configured timeout elapsed first.
    TimedOut { after: Duration },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(why) => write!(f, "no transport available: {why}"),
            Self::Network(why) => write!(f, "network error: {why}"),
            Self::TimedOut { after } => write!(f, "timed out after {} ms", after.as_millis()),
        }
    }
}

impl std::error::Error for TransportError {}

/// Terminal outcome of a request.
pub type TransportOutcome = Result<HttpResponse, TransportError>;

/// Completion callback. Called at most once.
pub type Completion = Box<dyn FnOnce(TransportOutcome)>;

/// Asynchronous request capability.
pub trait Transport {
    /// Issue `request`; `on_complete` runs later with the terminal outcome.
    fn send(&mut self, request: HttpRequest, on_complete: Completion) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: HttpRequest, on_complete: Completion) -> Result<(), TransportError> {
        (**self).send(request, on_complete)
    }
}

struct Parked {
    request: HttpRequest,
    on_complete: Completion,
}

/// Transport that holds requests until they are answered explicitly.
pub struct QueuedTransport {
    parked: VecDeque<Parked>,
    sent: Vec<HttpRequest>,
    available: bool,
}

impl Default for QueuedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl QueuedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parked: VecDeque::new(),
            sent: Vec::new(),
            available: true,
        }
    }

    /// A transport whose `send` always fails with [`TransportError::Unavailable`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Requests awaiting an answer, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &HttpRequest> {
        self.parked.iter().map(|p| &p.request)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.parked.len()
    }

    /// Every request ever accepted, in issue order.
    #[must_use]
    pub fn sent(&self) -> &[HttpRequest] {
        &self.sent
    }

    /// Answer the parked request at `index`. Returns the request answered.
    pub fn respond(&mut self, index: usize, outcome: TransportOutcome) -> Option<HttpRequest> {
        let parked = self.parked.remove(index)?;
        (parked.on_complete)(outcome);
        Some(parked.request)
    }

    /// Answer the oldest parked request.
    pub fn respond_next(&mut self, outcome: TransportOutcome) -> Option<HttpRequest> {
        self.respond(0, outcome)
    }

    /// Answer the newest parked request.
    pub fn respond_last(&mut self, outcome: TransportOutcome) -> Option<HttpRequest> {
        let last = self.parked.len().checked_sub(1)?;
        self.respond(last, outcome)
    }

    /// Drop a parked request without ever completing it (a hung request).
    pub fn abandon(&mut self, index: usize) -> Option<HttpRequest> {
        self.parked.remove(index).map(|p| p.request)
    }
}

impl fmt::Debug for QueuedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTransport")
            .field("pending", &self.parked.len())
            .field("sent", &self.sent.len())
            .field("available", &self.available)
            .finish()
    }
}

impl Transport for QueuedTransport {
    fn send(&mut self, request: HttpRequest, on_complete: Completion) -> Result<(), TransportError> {
        if !self.available {
            return Err(TransportError::Unavailable("queued transport disabled".into()));
        }
        self.sent.push(request.clone());
        self.parked.push_back(Parked {
            request,
            on_complete,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<TransportOutcome>>>, impl Fn() -> Completion) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let seen = Rc::clone(&seen);
            move || -> Completion {
                let seen = Rc::clone(&seen);
                Box::new(move |outcome| seen.borrow_mut().push(outcome))
            }
        };
        (seen, make)
    }

    fn post(path: &str) -> HttpRequest {
        HttpRequest::json(path, &serde_json::json!({})).unwrap()
    }

    #[test]
    fn responses_can_arrive_out_of_order() {
        let (seen, completion) = recorder();
        let mut t = QueuedTransport::new();
        t.send(post("/a"), completion()).unwrap();
        t.send(post("/b"), completion()).unwrap();

        let answered = t.respond_last(Ok(HttpResponse::new(200, "b"))).unwrap();
        assert_eq!(answered.path, "/b");
        t.respond_next(Ok(HttpResponse::new(500, "a"))).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen[0], Ok(HttpResponse::new(200, "b")));
        assert_eq!(seen[1], Ok(HttpResponse::new(500, "a")));
        assert_eq!(t.pending_len(), 0);
        assert_eq!(t.sent().len(), 2);
    }

    #[test]
    fn unavailable_transport_never_parks() {
        let (seen, completion) = recorder();
        let mut t = QueuedTransport::unavailable();
        let err = t.send(post("/a"), completion()).unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert_eq!(t.pending_len(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn abandoned_requests_never_complete() {
        let (seen, completion) = recorder();
        let mut t = QueuedTransport::new();
        t.send(post("/a"), completion()).unwrap();
        assert!(t.abandon(0).is_some());
        assert!(t.respond_next(Ok(HttpResponse::new(200, ""))).is_none());
        assert!(seen.borrow().is_empty());
    }
}
