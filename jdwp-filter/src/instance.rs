// InstanceOnly modifier and receiver resolution
//
// Breakpoint, step, exception and method entry/exit callbacks do not pass
// the receiver object. The instance filter fetches it lazily from slot 0 of
// the current frame and caches it in the event snapshot.

use crate::env::{GlobalRef, JvmEnv, SharedEnv};
use crate::error::AgentResult;
use crate::snapshot::EventInfo;
use crate::types::{ObjectRef, ACC_STATIC};
use tracing::debug;

/// Fetch the `this` object of the method an event occurred in.
///
/// Returns `None` for static methods and whenever a JVMTI query fails;
/// failures are not errors for the caller, only missing information.
pub fn resolve_receiver(env: &dyn JvmEnv, info: &EventInfo) -> Option<ObjectRef> {
    let (Some(method), Some(thread)) = (info.method, info.thread) else {
        debug!("{:?} event lacks method or thread, receiver unknown", info.kind);
        return None;
    };

    let modifiers = match env.get_method_modifiers(method) {
        Ok(modifiers) => modifiers,
        Err(e) => {
            debug!("GetMethodModifiers failed for method {}: {}", method, e);
            return None;
        }
    };
    if modifiers & ACC_STATIC != 0 {
        return None;
    }

    // JVM spec: `this` is passed in local variable 0 of the top frame
    match env.get_local_object(thread, 0, 0) {
        Ok(this) => this,
        Err(e) => {
            debug!("GetLocalObject failed on thread {}: {}", thread, e);
            None
        }
    }
}

/// Reports events only for one object instance.
///
/// With no instance held, only events without a receiver (static context)
/// are reported.
#[derive(Debug)]
pub struct InstanceOnlyModifier {
    instance: Option<GlobalRef>,
}

impl InstanceOnlyModifier {
    pub fn new(env: &SharedEnv, instance: Option<ObjectRef>) -> AgentResult<Self> {
        Ok(Self {
            instance: GlobalRef::new_nullable(env, instance)?,
        })
    }

    pub fn instance(&self) -> Option<ObjectRef> {
        self.instance.as_ref().map(GlobalRef::get)
    }

    /// Resolves the receiver into `info.instance` if the event kind does
    /// not carry one and nothing has resolved it yet, then compares it with
    /// the held instance. The write is visible to every modifier and
    /// request evaluated afterwards against the same snapshot.
    pub fn apply(&self, env: &dyn JvmEnv, info: &mut EventInfo) -> bool {
        if info.instance.is_none() && info.kind.lacks_receiver() {
            info.instance = resolve_receiver(env, info);
        }

        match (info.instance, &self.instance) {
            (None, None) => true,
            (Some(actual), Some(held)) => env.is_same_object(actual, held.get()),
            _ => false,
        }
    }
}
