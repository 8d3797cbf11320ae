// Event requests and chain evaluation
//
// A request owns its modifiers in registration order, except that count
// filters are moved behind everything else: a count must only advance for
// occurrences every other modifier has already accepted.

use crate::env::{JvmEnv, SharedEnv};
use crate::error::{AgentError, AgentResult};
use crate::modifier::{ModifierSpec, RequestModifier};
use crate::snapshot::EventInfo;
use crate::types::{EventKind, ModifierKind, ThreadRef};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A registered event request and its filter chain
#[derive(Debug)]
pub struct EventRequest {
    event_kind: EventKind,
    suspend_policy: u8,
    modifiers: Vec<RequestModifier>,
}

impl EventRequest {
    /// Build a request from already constructed modifiers.
    ///
    /// Count modifiers are moved to the end; the relative order within
    /// each group is kept.
    pub fn new(event_kind: EventKind, suspend_policy: u8, modifiers: Vec<RequestModifier>) -> Self {
        let (counts, mut modifiers): (Vec<_>, Vec<_>) = modifiers
            .into_iter()
            .partition(|m| m.kind() == ModifierKind::Count);
        modifiers.extend(counts);

        Self {
            event_kind,
            suspend_policy,
            modifiers,
        }
    }

    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    pub fn suspend_policy(&self) -> u8 {
        self.suspend_policy
    }

    /// Modifiers in evaluation order
    pub fn modifiers(&self) -> &[RequestModifier] {
        &self.modifiers
    }

    /// Run the filter chain, stopping at the first modifier that rejects.
    ///
    /// May write `info.instance` (see `InstanceOnlyModifier::apply`) and
    /// consumes one occurrence of a count filter when every other modifier
    /// accepted.
    pub fn apply(&mut self, env: &dyn JvmEnv, info: &mut EventInfo) -> bool {
        self.modifiers.iter_mut().all(|m| m.apply(env, info))
    }

    /// `apply` restricted to snapshots of this request's event kind
    pub fn matches(&mut self, env: &dyn JvmEnv, info: &mut EventInfo) -> bool {
        info.kind == self.event_kind && self.apply(env, info)
    }

    /// Remaining occurrences of the first count filter, if there is one
    pub fn count(&self) -> Option<i32> {
        self.modifiers.iter().find_map(|m| match m {
            RequestModifier::Count(c) => Some(c.count()),
            _ => None,
        })
    }

    /// Thread the request is restricted to, via ThreadOnly or Step
    pub fn thread(&self) -> Option<ThreadRef> {
        self.modifiers.iter().find_map(|m| match m {
            RequestModifier::ThreadOnly(t) => Some(t.thread()),
            RequestModifier::Step(s) => Some(s.thread()),
            _ => None,
        })
    }

    /// A count filter has fired; the request can never match again and
    /// should be deleted by its owner
    pub fn is_expired(&self) -> bool {
        self.modifiers.iter().any(|m| match m {
            RequestModifier::Count(c) => c.is_exhausted(),
            _ => false,
        })
    }
}

/// Builds a request one modifier at a time.
///
/// If any modifier cannot be built the builder is consumed and every
/// modifier built so far is dropped, releasing its references.
pub struct RequestBuilder {
    env: SharedEnv,
    event_kind: EventKind,
    suspend_policy: u8,
    modifiers: Vec<RequestModifier>,
}

impl RequestBuilder {
    pub fn new(env: &SharedEnv, event_kind: EventKind, suspend_policy: u8) -> Self {
        Self {
            env: Arc::clone(env),
            event_kind,
            suspend_policy,
            modifiers: Vec::new(),
        }
    }

    pub fn modifier(mut self, spec: &ModifierSpec) -> AgentResult<Self> {
        let kind = spec.kind();
        if !kind.is_valid_for(self.event_kind) {
            debug!(
                "Rejecting {:?} modifier for {:?} request, dropping {} built modifiers",
                kind,
                self.event_kind,
                self.modifiers.len()
            );
            return Err(AgentError::IllegalArgument(format!(
                "{:?} modifier cannot be used with {:?} events",
                kind, self.event_kind
            )));
        }

        match RequestModifier::new(&self.env, spec) {
            Ok(modifier) => {
                self.modifiers.push(modifier);
                Ok(self)
            }
            Err(e) => {
                debug!(
                    "Failed to build {:?} modifier ({}), dropping {} built modifiers",
                    kind,
                    e,
                    self.modifiers.len()
                );
                Err(e)
            }
        }
    }

    pub fn modifiers<'a>(
        self,
        specs: impl IntoIterator<Item = &'a ModifierSpec>,
    ) -> AgentResult<Self> {
        specs.into_iter().try_fold(self, |builder, spec| builder.modifier(spec))
    }

    pub fn build(self) -> EventRequest {
        EventRequest::new(self.event_kind, self.suspend_policy, self.modifiers)
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("event_kind", &self.event_kind)
            .field("suspend_policy", &self.suspend_policy)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

/// Evaluate several requests against one event.
///
/// The same snapshot is threaded through every request so a receiver
/// resolved by one request's instance filter is reused by the next.
/// Returns the indices of the requests that accepted the event.
pub fn evaluate_requests<'a>(
    env: &dyn JvmEnv,
    info: &mut EventInfo,
    requests: impl IntoIterator<Item = &'a mut EventRequest>,
) -> Vec<usize> {
    let mut matched = Vec::new();
    for (index, request) in requests.into_iter().enumerate() {
        let accepted = request.matches(env, info);
        trace!("request #{} {:?}: {}", index, request.event_kind(), accepted);
        if accepted {
            matched.push(index);
        }
    }
    matched
}
