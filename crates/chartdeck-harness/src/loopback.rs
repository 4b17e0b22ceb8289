#![forbid(unsafe_code)]

//! Loopback transport onto a [`FakeServer`].
//!
//! The server handles each request the moment it is sent, exactly like a
//! real backend receiving it, but the answer is held back until the test
//! delivers it. Delivering out of order reproduces response races.

use std::cell::RefCell;
use std::rc::Rc;

use chartdeck_runtime::{
    Completion, HttpRequest, QueuedTransport, Transport, TransportError, TransportOutcome,
};

use crate::server::FakeServer;

/// Shared handle to the server behind a loopback transport.
pub type SharedServer = Rc<RefCell<FakeServer>>;

#[derive(Debug)]
pub struct LoopbackTransport {
    server: SharedServer,
    queue: QueuedTransport,
    /// Answers computed at send time, parallel to `queue`'s parked requests.
    answers: Vec<TransportOutcome>,
    offline: bool,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new(server: SharedServer) -> Self {
        Self {
            server,
            queue: QueuedTransport::new(),
            answers: Vec::new(),
            offline: false,
        }
    }

    #[must_use]
    pub fn server(&self) -> &SharedServer {
        &self.server
    }

    /// While offline, `send` fails as if no transport existed.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Requests sent and not yet answered, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &HttpRequest> {
        self.queue.pending()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.pending_len()
    }

    /// Every request ever sent.
    #[must_use]
    pub fn sent(&self) -> &[HttpRequest] {
        self.queue.sent()
    }

    /// Deliver the answer for the pending request at `index`.
    pub fn deliver(&mut self, index: usize) -> Option<HttpRequest> {
        if index >= self.answers.len() {
            return None;
        }
        let answer = self.answers.remove(index);
        self.queue.respond(index, answer)
    }

    pub fn deliver_next(&mut self) -> Option<HttpRequest> {
        self.deliver(0)
    }

    pub fn deliver_last(&mut self) -> Option<HttpRequest> {
        let last = self.answers.len().checked_sub(1)?;
        self.deliver(last)
    }

    /// Deliver every pending answer in send order. Returns how many.
    pub fn deliver_all(&mut self) -> usize {
        let mut delivered = 0;
        while self.deliver_next().is_some() {
            delivered += 1;
        }
        delivered
    }

    /// Never answer the pending request at `index`.
    pub fn hang(&mut self, index: usize) -> Option<HttpRequest> {
        if index >= self.answers.len() {
            return None;
        }
        self.answers.remove(index);
        self.queue.abandon(index)
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, request: HttpRequest, on_complete: Completion) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::Unavailable("loopback offline".into()));
        }
        let answer = self.server.borrow_mut().handle(&request);
        self.queue.send(request, on_complete)?;
        self.answers.push(answer);
        Ok(())
    }
}
