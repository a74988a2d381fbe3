//! The channel to the remote coordinator.
//!
//! Everything the directory tells the coordinator goes through
//! [`CoordinatorLink::send`] as a [`Message`]; the transport, wire encoding
//! and the coordinator's adjudication are all external. Most messages are
//! fire-and-forget. The few operations that must wait for a correlated
//! answer go through [`PendingRequests`]: the caller allocates a correlation
//! id, sends, and blocks on a bounded-timeout channel that the network
//! thread resolves when the response arrives. The network thread itself
//! never blocks on a response.
//!
//! A timeout does NOT roll local state back — the request may still be in
//! flight, and inventing a "cancelled" state here would race a delayed
//! grant. The caller gets `RequestTimeout` and must query or retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rustc_hash::FxHashMap;

use crate::error::{FederateError, FederateResult};
use crate::handle::{
    AttributeHandle, AttributeValueMap, FederateHandle, InteractionClassHandle,
    ObjectClassHandle, ObjectInstanceHandle, ParameterValueMap,
};

/// Correlation id tying a request to its response.
pub type CorrelationId = u64;

/// Declared send order for a time-stamped delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOrder {
    Receive,
    Timestamp,
}

/// Messages produced for the remote coordinator.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    RegisterInstance {
        instance: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: String,
        attributes: Vec<AttributeHandle>,
    },
    DeleteInstance {
        instance: ObjectInstanceHandle,
        tag: Vec<u8>,
        order: SendOrder,
    },
    ReserveName {
        name: String,
    },
    ReserveNames {
        names: Vec<String>,
    },
    ReleaseName {
        name: String,
    },
    ReleaseNames {
        names: Vec<String>,
    },
    PublishObjectClassAttributes {
        class: ObjectClassHandle,
        attributes: Vec<AttributeHandle>,
    },
    UnpublishObjectClass {
        class: ObjectClassHandle,
        divested_instances: Vec<ObjectInstanceHandle>,
    },
    UnpublishObjectClassAttributes {
        class: ObjectClassHandle,
        divested_instances: Vec<ObjectInstanceHandle>,
        attributes: Vec<AttributeHandle>,
    },
    PublishInteractionClass {
        class: InteractionClassHandle,
    },
    UnpublishInteractionClass {
        class: InteractionClassHandle,
    },
    SubscribeObjectClassAttributes {
        class: ObjectClassHandle,
        attributes: Vec<AttributeHandle>,
    },
    UnsubscribeObjectClass {
        class: ObjectClassHandle,
    },
    SubscribeInteractionClass {
        class: InteractionClassHandle,
    },
    UnsubscribeInteractionClass {
        class: InteractionClassHandle,
    },
    UnconditionalDivest {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },
    NegotiatedDivest {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
        tag: Vec<u8>,
    },
    ConfirmDivest {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
        tag: Vec<u8>,
    },
    CancelDivest {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },
    Acquire {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
        tag: Vec<u8>,
    },
    AcquireIfAvailable {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },
    CancelAcquire {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },
    ReleaseIfWanted {
        correlation: CorrelationId,
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },
    QueryOwnership {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    UpdateAttributes {
        instance: ObjectInstanceHandle,
        values: AttributeValueMap,
        tag: Vec<u8>,
    },
    RequestAttributeUpdate {
        instance: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
        tag: Vec<u8>,
    },
    SendInteraction {
        class: InteractionClassHandle,
        parameters: ParameterValueMap,
        tag: Vec<u8>,
    },
    Resigned {
        federate: FederateHandle,
    },
}

/// Outbound half of the coordinator connection.
///
/// `send` must not block on the coordinator's processing; ordered-reliable
/// delivery is the transport's problem.
pub trait CoordinatorLink: Send + Sync {
    fn send(&self, message: Message) -> FederateResult<()>;
}

/// Correlated responses the coordinator can return.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// The subset of a release-if-wanted request the coordinator actually
    /// handed over.
    ReleaseIfWanted { attributes: Vec<AttributeHandle> },
}

/// Counters for the request/response machinery.
#[derive(Clone, Debug, Default)]
pub struct RequestStats {
    pub started: u64,
    pub resolved: u64,
    /// Responses that arrived after the caller gave up (or were never
    /// requested). Expected under timeout races, so only counted and traced.
    pub unmatched: u64,
    pub timed_out: u64,
}

/// Table of in-flight correlated requests.
///
/// Callers block on the receiving end with a bounded timeout; the network
/// thread resolves by correlation id.
#[derive(Default)]
pub struct PendingRequests {
    next_correlation: AtomicU64,
    pending: Mutex<FxHashMap<CorrelationId, Sender<Response>>>,
    stats: Mutex<RequestStats>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a correlation id and registers the response slot.
    pub fn begin(&self) -> FederateResult<(CorrelationId, Receiver<Response>)> {
        let correlation = self.next_correlation.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = bounded(1);
        self.pending.lock()?.insert(correlation, sender);
        self.stats.lock()?.started += 1;
        Ok((correlation, receiver))
    }

    /// Resolves a pending request from the network thread. Returns `false`
    /// when nothing was waiting (late response after a timeout).
    pub fn resolve(&self, correlation: CorrelationId, response: Response) -> FederateResult<bool> {
        let sender = self.pending.lock()?.remove(&correlation);
        if let Some(sender) = sender {
            if sender.send(response).is_ok() {
                self.stats.lock()?.resolved += 1;
                return Ok(true);
            }
        }
        log::trace!("dropping unmatched response, correlation {}", correlation);
        self.stats.lock()?.unmatched += 1;
        Ok(false)
    }

    /// Blocks for the response, up to `timeout`. On timeout the slot is
    /// forgotten so a late response is counted as unmatched instead of
    /// leaking.
    pub fn await_response(
        &self,
        correlation: CorrelationId,
        receiver: &Receiver<Response>,
        timeout: Duration,
        operation: &str,
    ) -> FederateResult<Response> {
        match receiver.recv_timeout(timeout) {
            Ok(response) => Ok(response),
            Err(RecvTimeoutError::Timeout) => {
                self.pending.lock()?.remove(&correlation);
                self.stats.lock()?.timed_out += 1;
                Err(FederateError::RequestTimeout(operation.to_string()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.pending.lock()?.remove(&correlation);
                Err(FederateError::ChannelClosed(operation.to_string()))
            }
        }
    }

    pub fn stats(&self) -> FederateResult<RequestStats> {
        Ok(self.stats.lock()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn response_reaches_the_waiting_caller() {
        let pending = Arc::new(PendingRequests::new());
        let (correlation, receiver) = pending.begin().expect("begin");

        let resolver = Arc::clone(&pending);
        let handle = thread::spawn(move || {
            resolver
                .resolve(
                    correlation,
                    Response::ReleaseIfWanted {
                        attributes: vec![AttributeHandle(1)],
                    },
                )
                .expect("resolve")
        });

        let response = pending
            .await_response(correlation, &receiver, Duration::from_secs(1), "release")
            .expect("response in time");
        assert_eq!(
            response,
            Response::ReleaseIfWanted {
                attributes: vec![AttributeHandle(1)]
            }
        );
        assert!(handle.join().expect("join"));
        assert_eq!(pending.stats().expect("stats").resolved, 1);
    }

    #[test]
    fn timeout_surfaces_and_late_response_is_unmatched() {
        let pending = PendingRequests::new();
        let (correlation, receiver) = pending.begin().expect("begin");

        let result =
            pending.await_response(correlation, &receiver, Duration::from_millis(10), "release");
        assert_eq!(
            result,
            Err(FederateError::RequestTimeout("release".to_string()))
        );

        // the response that shows up afterwards finds nobody waiting
        let matched = pending
            .resolve(
                correlation,
                Response::ReleaseIfWanted { attributes: vec![] },
            )
            .expect("resolve");
        assert!(!matched);

        let stats = pending.stats().expect("stats");
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.unmatched, 1);
    }

    #[test]
    fn correlation_ids_are_unique() {
        let pending = PendingRequests::new();
        let (first, _rx1) = pending.begin().expect("begin");
        let (second, _rx2) = pending.begin().expect("begin");
        assert_ne!(first, second);
    }
}
