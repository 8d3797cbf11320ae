// Event snapshot
//
// One record per raised event, threaded by mutable reference through every
// modifier of every request evaluated for that event

use crate::env::JvmEnv;
use crate::types::{ClassRef, EventKind, FieldId, JLocation, MethodId, ObjectRef, ThreadRef};
use serde::{Deserialize, Serialize};

/// Description of a single event occurrence.
///
/// Which fields are set depends on `kind`; modifiers only read the fields
/// their event kinds define. `instance` is the one field written during
/// evaluation: the instance filter stores the resolved receiver there so
/// later modifiers, and later requests for the same event, reuse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub kind: EventKind,
    /// Thread the event occurred on (callback-local)
    pub thread: Option<ThreadRef>,
    /// Class of the event (declaring class for located events)
    pub cls: Option<ClassRef>,
    /// Type signature of `cls`, e.g. `Lcom/foo/Bar;`
    pub signature: Option<String>,
    pub method: Option<MethodId>,
    pub location: JLocation,
    pub field: Option<FieldId>,
    pub instance: Option<ObjectRef>,
    /// Exception class for exception events, field type for field events
    pub aux_class: Option<ClassRef>,
    /// Whether the thrown exception will be caught
    pub caught: bool,
}

impl EventInfo {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            thread: None,
            cls: None,
            signature: None,
            method: None,
            location: 0,
            field: None,
            instance: None,
            aux_class: None,
            caught: false,
        }
    }

    /// Step, breakpoint and method entry/exit events
    pub fn location_event(
        kind: EventKind,
        thread: ThreadRef,
        cls: ClassRef,
        signature: impl Into<String>,
        method: MethodId,
        location: JLocation,
    ) -> Self {
        debug_assert!(kind.has_location());
        Self {
            thread: Some(thread),
            cls: Some(cls),
            signature: Some(signature.into()),
            method: Some(method),
            location,
            ..Self::new(kind)
        }
    }

    /// Exception events; `exception_class` lands in `aux_class`
    pub fn exception_event(
        thread: ThreadRef,
        cls: ClassRef,
        signature: impl Into<String>,
        method: MethodId,
        location: JLocation,
        exception_class: ClassRef,
        caught: bool,
    ) -> Self {
        Self {
            aux_class: Some(exception_class),
            caught,
            ..Self::location_event(EventKind::Exception, thread, cls, signature, method, location)
        }
    }

    /// Field access and modification events. `cls` is the field's
    /// declaring class, `instance` is `None` for static fields.
    #[allow(clippy::too_many_arguments)]
    pub fn field_event(
        kind: EventKind,
        thread: ThreadRef,
        cls: ClassRef,
        signature: impl Into<String>,
        method: MethodId,
        location: JLocation,
        field: FieldId,
        instance: Option<ObjectRef>,
        field_class: ClassRef,
    ) -> Self {
        debug_assert!(kind.is_field_event());
        Self {
            field: Some(field),
            instance,
            aux_class: Some(field_class),
            ..Self::location_event(kind, thread, cls, signature, method, location)
        }
    }

    /// Delete the local references held by this snapshot, including a
    /// receiver the instance filter resolved, and unset those fields.
    /// Call once every request has been evaluated for the event.
    pub fn release_locals(&mut self, env: &dyn JvmEnv) {
        for local in [
            self.thread.take(),
            self.cls.take(),
            self.instance.take(),
            self.aux_class.take(),
        ]
        .into_iter()
        .flatten()
        {
            env.delete_local_ref(local);
        }
    }
}
