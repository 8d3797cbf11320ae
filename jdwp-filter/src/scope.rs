// Identity and scope modifiers
//
// ThreadOnly, ClassOnly, ClassMatch, ClassExclude, LocationOnly,
// ExceptionOnly, FieldOnly and Step. None of these touch the snapshot;
// repeated application to the same event gives the same answer.

use crate::env::{GlobalRef, JvmEnv, SharedEnv};
use crate::error::AgentResult;
use crate::pattern::match_pattern;
use crate::snapshot::EventInfo;
use crate::types::{ClassRef, FieldId, JLocation, MethodId, ThreadRef};
use tracing::debug;

// Guard for snapshot fields the event kind should have populated
fn required<T: Copy>(value: Option<T>, info: &EventInfo, what: &str) -> Option<T> {
    if value.is_none() {
        debug!("{:?} event has no {}, rejecting", info.kind, what);
    }
    value
}

/// Reports events only for one thread
#[derive(Debug)]
pub struct ThreadOnlyModifier {
    thread: GlobalRef,
}

impl ThreadOnlyModifier {
    pub fn new(env: &SharedEnv, thread: ThreadRef) -> AgentResult<Self> {
        Ok(Self {
            thread: GlobalRef::new(env, thread)?,
        })
    }

    pub fn thread(&self) -> ThreadRef {
        self.thread.get()
    }

    pub fn apply(&self, env: &dyn JvmEnv, info: &EventInfo) -> bool {
        required(info.thread, info, "thread")
            .is_some_and(|thread| env.is_same_object(thread, self.thread.get()))
    }
}

/// Reports events only for a class and its subclasses
#[derive(Debug)]
pub struct ClassOnlyModifier {
    class: GlobalRef,
}

impl ClassOnlyModifier {
    pub fn new(env: &SharedEnv, class: ClassRef) -> AgentResult<Self> {
        Ok(Self {
            class: GlobalRef::new(env, class)?,
        })
    }

    pub fn class(&self) -> ClassRef {
        self.class.get()
    }

    pub fn apply(&self, env: &dyn JvmEnv, info: &EventInfo) -> bool {
        required(info.cls, info, "class")
            .is_some_and(|cls| env.is_assignable_from(cls, self.class.get()))
    }
}

/// Reports events only for classes whose signature matches a pattern
#[derive(Debug, Clone)]
pub struct ClassMatchModifier {
    pattern: String,
}

impl ClassMatchModifier {
    pub fn new(pattern: String) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn apply(&self, info: &EventInfo) -> bool {
        match info.signature.as_deref() {
            Some(signature) => match_pattern(signature, &self.pattern),
            None => {
                debug!("{:?} event has no signature, rejecting", info.kind);
                false
            }
        }
    }
}

/// Suppresses events for classes whose signature matches a pattern
#[derive(Debug, Clone)]
pub struct ClassExcludeModifier {
    pattern: String,
}

impl ClassExcludeModifier {
    pub fn new(pattern: String) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// An event without a signature is rejected rather than let through
    pub fn apply(&self, info: &EventInfo) -> bool {
        match info.signature.as_deref() {
            Some(signature) => !match_pattern(signature, &self.pattern),
            None => {
                debug!("{:?} event has no signature, rejecting", info.kind);
                false
            }
        }
    }
}

/// Reports events only at one code location
#[derive(Debug)]
pub struct LocationOnlyModifier {
    class: GlobalRef,
    method: MethodId,
    location: JLocation,
}

impl LocationOnlyModifier {
    pub fn new(
        env: &SharedEnv,
        class: ClassRef,
        method: MethodId,
        location: JLocation,
    ) -> AgentResult<Self> {
        Ok(Self {
            class: GlobalRef::new(env, class)?,
            method,
            location,
        })
    }

    pub fn class(&self) -> ClassRef {
        self.class.get()
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn location(&self) -> JLocation {
        self.location
    }

    pub fn apply(&self, env: &dyn JvmEnv, info: &EventInfo) -> bool {
        info.method == Some(self.method)
            && info.location == self.location
            && required(info.cls, info, "class")
                .is_some_and(|cls| env.is_same_object(cls, self.class.get()))
    }
}

/// Reports exceptions by type and by whether they are caught
#[derive(Debug)]
pub struct ExceptionOnlyModifier {
    // None matches any exception type
    class: Option<GlobalRef>,
    caught: bool,
    uncaught: bool,
}

impl ExceptionOnlyModifier {
    pub fn new(
        env: &SharedEnv,
        class: Option<ClassRef>,
        caught: bool,
        uncaught: bool,
    ) -> AgentResult<Self> {
        Ok(Self {
            class: GlobalRef::new_nullable(env, class)?,
            caught,
            uncaught,
        })
    }

    pub fn class(&self) -> Option<ClassRef> {
        self.class.as_ref().map(GlobalRef::get)
    }

    pub fn is_caught(&self) -> bool {
        self.caught
    }

    pub fn is_uncaught(&self) -> bool {
        self.uncaught
    }

    pub fn apply(&self, env: &dyn JvmEnv, info: &EventInfo) -> bool {
        let wanted = if info.caught { self.caught } else { self.uncaught };
        if !wanted {
            return false;
        }

        match &self.class {
            None => true,
            Some(class) => required(info.aux_class, info, "exception class")
                .is_some_and(|thrown| env.is_assignable_from(thrown, class.get())),
        }
    }
}

/// Reports field events only for one field
#[derive(Debug)]
pub struct FieldOnlyModifier {
    class: GlobalRef,
    field: FieldId,
}

impl FieldOnlyModifier {
    pub fn new(env: &SharedEnv, class: ClassRef, field: FieldId) -> AgentResult<Self> {
        Ok(Self {
            class: GlobalRef::new(env, class)?,
            field,
        })
    }

    pub fn class(&self) -> ClassRef {
        self.class.get()
    }

    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn apply(&self, env: &dyn JvmEnv, info: &EventInfo) -> bool {
        info.field == Some(self.field)
            && required(info.cls, info, "class")
                .is_some_and(|cls| env.is_same_object(cls, self.class.get()))
    }
}

/// Step request parameters. Size and depth are enforced by the stepping
/// engine; as a filter this always passes.
#[derive(Debug)]
pub struct StepModifier {
    thread: GlobalRef,
    size: i32,
    depth: i32,
}

impl StepModifier {
    pub fn new(env: &SharedEnv, thread: ThreadRef, size: i32, depth: i32) -> AgentResult<Self> {
        Ok(Self {
            thread: GlobalRef::new(env, thread)?,
            size,
            depth,
        })
    }

    pub fn thread(&self) -> ThreadRef {
        self.thread.get()
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn apply(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::sim::SimulatedVm;
    use crate::types::{step_depths, step_sizes, EventKind};
    use std::sync::Arc;

    struct Fixture {
        vm: Arc<SimulatedVm>,
        env: SharedEnv,
    }

    fn fixture() -> Fixture {
        let vm = Arc::new(SimulatedVm::new());
        let env: SharedEnv = vm.clone();
        Fixture { vm, env }
    }

    fn breakpoint(thread: ThreadRef, cls: ClassRef, method: MethodId, location: JLocation) -> EventInfo {
        EventInfo::location_event(EventKind::Breakpoint, thread, cls, "Lcom/foo/Bar;", method, location)
    }

    #[test]
    fn test_thread_only() {
        let f = fixture();
        let t1 = f.vm.new_thread();
        let t2 = f.vm.new_thread();
        let cls = f.vm.define_class("Lcom/foo/Bar;", None);
        let modifier = ThreadOnlyModifier::new(&f.env, t1).unwrap();

        // the event carries a different local handle for the same thread
        let local = f.vm.local_ref(t1).unwrap();
        let on_t1 = breakpoint(local, cls, 1, 0);
        let on_t2 = breakpoint(t2, cls, 1, 0);

        for _ in 0..2 {
            assert!(modifier.apply(f.vm.as_ref(), &on_t1));
            assert!(!modifier.apply(f.vm.as_ref(), &on_t2));
        }
        assert!(f.vm.is_same_object(modifier.thread(), t1));
    }

    #[test]
    fn test_thread_only_without_thread_rejects() {
        let f = fixture();
        let t1 = f.vm.new_thread();
        let modifier = ThreadOnlyModifier::new(&f.env, t1).unwrap();
        assert!(!modifier.apply(f.vm.as_ref(), &EventInfo::new(EventKind::VmDeath)));
    }

    #[test]
    fn test_missing_class_rejects() {
        let f = fixture();
        let cls = f.vm.define_class("Lcom/foo/Bar;", None);
        let field = f.vm.define_field();
        // thread events carry neither class nor signature
        let info = EventInfo {
            thread: Some(f.vm.new_thread()),
            ..EventInfo::new(EventKind::ThreadStart)
        };

        assert!(!ClassOnlyModifier::new(&f.env, cls).unwrap().apply(f.vm.as_ref(), &info));
        assert!(!ClassMatchModifier::new("*".to_string()).apply(&info));
        assert!(!ClassExcludeModifier::new("Lcom/*".to_string()).apply(&info));

        let mut located = info.clone();
        located.method = Some(1);
        located.field = Some(field);
        let location = LocationOnlyModifier::new(&f.env, cls, 1, 0).unwrap();
        let field_only = FieldOnlyModifier::new(&f.env, cls, field).unwrap();
        assert!(!location.apply(f.vm.as_ref(), &located));
        assert!(!field_only.apply(f.vm.as_ref(), &located));
    }

    #[test]
    fn test_class_only_accepts_subclasses() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let base = f.vm.define_class("Lcom/foo/Base;", None);
        let derived = f.vm.define_class("Lcom/foo/Derived;", Some(base));
        let unrelated = f.vm.define_class("Lcom/foo/Other;", None);
        let modifier = ClassOnlyModifier::new(&f.env, base).unwrap();

        assert!(modifier.apply(f.vm.as_ref(), &breakpoint(thread, base, 1, 0)));
        assert!(modifier.apply(f.vm.as_ref(), &breakpoint(thread, derived, 1, 0)));
        assert!(!modifier.apply(f.vm.as_ref(), &breakpoint(thread, unrelated, 1, 0)));

        let narrow = ClassOnlyModifier::new(&f.env, derived).unwrap();
        assert!(!narrow.apply(f.vm.as_ref(), &breakpoint(thread, base, 1, 0)));
    }

    #[test]
    fn test_class_match_and_exclude_are_complements() {
        let patterns = ["*", "Lcom/foo/*", "*Bar;", "Lcom/foo/Bar;", "Lcom/foo/*;", "", "Ljava/*"];
        let signatures = ["Lcom/foo/Bar;", "Ljava/lang/String;", "I", ""];

        for pattern in patterns {
            let include = ClassMatchModifier::new(pattern.to_string());
            let exclude = ClassExcludeModifier::new(pattern.to_string());
            assert_eq!(include.pattern(), pattern);
            assert_eq!(exclude.pattern(), pattern);

            for signature in signatures {
                let mut info = EventInfo::new(EventKind::ClassPrepare);
                info.signature = Some(signature.to_string());
                assert_eq!(
                    include.apply(&info),
                    !exclude.apply(&info),
                    "{pattern} / {signature}"
                );
            }
        }
    }

    #[test]
    fn test_class_match_examples() {
        let include = ClassMatchModifier::new("Lcom/foo/*".to_string());
        let mut info = EventInfo::new(EventKind::ClassPrepare);
        info.signature = Some("Lcom/foo/Bar;".to_string());
        assert!(include.apply(&info));
        info.signature = Some("Lcom/bar/Foo;".to_string());
        assert!(!include.apply(&info));
    }

    #[test]
    fn test_location_only() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let cls = f.vm.define_class("Lcom/foo/Bar;", None);
        let sub = f.vm.define_class("Lcom/foo/Sub;", Some(cls));
        let method = f.vm.define_method(false);
        let other_method = f.vm.define_method(false);
        let modifier = LocationOnlyModifier::new(&f.env, cls, method, 12).unwrap();

        assert!(modifier.apply(f.vm.as_ref(), &breakpoint(thread, cls, method, 12)));
        assert!(!modifier.apply(f.vm.as_ref(), &breakpoint(thread, cls, method, 13)));
        assert!(!modifier.apply(f.vm.as_ref(), &breakpoint(thread, cls, other_method, 12)));
        // identity, not assignability
        assert!(!modifier.apply(f.vm.as_ref(), &breakpoint(thread, sub, method, 12)));

        assert_eq!(modifier.method(), method);
        assert_eq!(modifier.location(), 12);
        assert!(f.vm.is_same_object(modifier.class(), cls));
    }

    #[test]
    fn test_exception_only_flags_and_type() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let cls = f.vm.define_class("LMain;", None);
        let throwable = f.vm.define_class("Ljava/lang/Throwable;", None);
        let io = f.vm.define_class("Ljava/io/IOException;", Some(throwable));
        let npe = f.vm.define_class("Ljava/lang/NullPointerException;", Some(throwable));
        let exception = |aux, caught| EventInfo::exception_event(thread, cls, "LMain;", 1, 0, aux, caught);

        let io_uncaught = ExceptionOnlyModifier::new(&f.env, Some(io), false, true).unwrap();
        assert!(io_uncaught.apply(f.vm.as_ref(), &exception(io, false)));
        assert!(!io_uncaught.apply(f.vm.as_ref(), &exception(io, true)));
        assert!(!io_uncaught.apply(f.vm.as_ref(), &exception(npe, false)));
        assert!(!io_uncaught.is_caught());
        assert!(io_uncaught.is_uncaught());

        let all_throwables = ExceptionOnlyModifier::new(&f.env, Some(throwable), true, true).unwrap();
        assert!(all_throwables.apply(f.vm.as_ref(), &exception(npe, true)));
        assert!(all_throwables.apply(f.vm.as_ref(), &exception(io, false)));
    }

    #[test]
    fn test_exception_only_any_class() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let cls = f.vm.define_class("LMain;", None);
        let npe = f.vm.define_class("Ljava/lang/NullPointerException;", None);
        let error = f.vm.define_class("Ljava/lang/Error;", None);

        let caught_only = ExceptionOnlyModifier::new(&f.env, None, true, false).unwrap();
        assert_eq!(caught_only.class(), None);
        for aux in [npe, error] {
            let caught = EventInfo::exception_event(thread, cls, "LMain;", 1, 0, aux, true);
            let uncaught = EventInfo::exception_event(thread, cls, "LMain;", 1, 0, aux, false);
            assert!(caught_only.apply(f.vm.as_ref(), &caught));
            assert!(!caught_only.apply(f.vm.as_ref(), &uncaught));
        }
        // "any" takes no reference
        assert_eq!(f.vm.live_global_refs(), 0);
    }

    #[test]
    fn test_field_only() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let cls = f.vm.define_class("Lcom/foo/Bar;", None);
        let other = f.vm.define_class("Lcom/foo/Baz;", None);
        let int_class = f.vm.define_class("I", None);
        let field = f.vm.define_field();
        let other_field = f.vm.define_field();
        let access = |cls, field| {
            EventInfo::field_event(
                EventKind::FieldAccess,
                thread,
                cls,
                "Lcom/foo/Bar;",
                1,
                0,
                field,
                None,
                int_class,
            )
        };

        let modifier = FieldOnlyModifier::new(&f.env, cls, field).unwrap();
        assert!(modifier.apply(f.vm.as_ref(), &access(cls, field)));
        assert!(!modifier.apply(f.vm.as_ref(), &access(cls, other_field)));
        assert!(!modifier.apply(f.vm.as_ref(), &access(other, field)));
        assert_eq!(modifier.field(), field);
    }

    #[test]
    fn test_step_always_passes() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let modifier =
            StepModifier::new(&f.env, thread, step_sizes::LINE, step_depths::OVER).unwrap();

        assert!(modifier.apply());
        assert_eq!(modifier.size(), step_sizes::LINE);
        assert_eq!(modifier.depth(), step_depths::OVER);
        assert!(f.vm.is_same_object(modifier.thread(), thread));
    }

    #[test]
    fn test_references_released_on_drop() {
        let f = fixture();
        let thread = f.vm.new_thread();
        let cls = f.vm.define_class("LA;", None);

        let modifiers = (
            ThreadOnlyModifier::new(&f.env, thread).unwrap(),
            ClassOnlyModifier::new(&f.env, cls).unwrap(),
            LocationOnlyModifier::new(&f.env, cls, 1, 0).unwrap(),
            StepModifier::new(&f.env, thread, 0, 0).unwrap(),
        );
        assert_eq!(f.vm.live_global_refs(), 4);

        drop(modifiers);
        assert_eq!(f.vm.live_global_refs(), 0);
    }

    #[test]
    fn test_reference_exhaustion_is_out_of_memory() {
        let f = fixture();
        let thread = f.vm.new_thread();
        f.vm.set_global_ref_capacity(Some(0));

        let result = ThreadOnlyModifier::new(&f.env, thread);
        assert!(matches!(result, Err(AgentError::OutOfMemory)));
        assert_eq!(f.vm.live_global_refs(), 0);
    }
}
