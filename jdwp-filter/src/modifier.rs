// Event request modifiers
//
// The closed set of JDWP modifier kinds. Each modifier decides whether one
// event occurrence passes its filter; a request reports an event only when
// all of its modifiers accept it.

use crate::env::{JvmEnv, SharedEnv};
use crate::error::{AgentError, AgentResult};
use crate::instance::InstanceOnlyModifier;
use crate::scope::{
    ClassExcludeModifier, ClassMatchModifier, ClassOnlyModifier, ExceptionOnlyModifier,
    FieldOnlyModifier, LocationOnlyModifier, StepModifier, ThreadOnlyModifier,
};
use crate::snapshot::EventInfo;
use crate::types::{ClassRef, FieldId, JLocation, MethodId, ModifierKind, ObjectRef, ThreadRef};
use serde::{Deserialize, Serialize};

/// Construction parameters of a modifier, as decoded from EventRequest.Set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierSpec {
    Count {
        count: i32,
    },
    Conditional {
        expr_id: i32,
    },
    ThreadOnly {
        thread: ThreadRef,
    },
    ClassOnly {
        class: ClassRef,
    },
    ClassMatch {
        pattern: String,
    },
    ClassExclude {
        pattern: String,
    },
    LocationOnly {
        class: ClassRef,
        method: MethodId,
        location: JLocation,
    },
    ExceptionOnly {
        #[serde(default)]
        class: Option<ClassRef>,
        caught: bool,
        uncaught: bool,
    },
    FieldOnly {
        class: ClassRef,
        field: FieldId,
    },
    Step {
        thread: ThreadRef,
        size: i32,
        depth: i32,
    },
    InstanceOnly {
        #[serde(default)]
        instance: Option<ObjectRef>,
    },
}

impl ModifierSpec {
    pub fn kind(&self) -> ModifierKind {
        match self {
            ModifierSpec::Count { .. } => ModifierKind::Count,
            ModifierSpec::Conditional { .. } => ModifierKind::Conditional,
            ModifierSpec::ThreadOnly { .. } => ModifierKind::ThreadOnly,
            ModifierSpec::ClassOnly { .. } => ModifierKind::ClassOnly,
            ModifierSpec::ClassMatch { .. } => ModifierKind::ClassMatch,
            ModifierSpec::ClassExclude { .. } => ModifierKind::ClassExclude,
            ModifierSpec::LocationOnly { .. } => ModifierKind::LocationOnly,
            ModifierSpec::ExceptionOnly { .. } => ModifierKind::ExceptionOnly,
            ModifierSpec::FieldOnly { .. } => ModifierKind::FieldOnly,
            ModifierSpec::Step { .. } => ModifierKind::Step,
            ModifierSpec::InstanceOnly { .. } => ModifierKind::InstanceOnly,
        }
    }
}

/// A constructed modifier owning whatever native references it filters on.
///
/// References are released when the modifier is dropped, i.e. when its
/// request is cleared or the agent shuts down.
#[derive(Debug)]
pub enum RequestModifier {
    Count(CountModifier),
    Conditional(ConditionalModifier),
    ThreadOnly(ThreadOnlyModifier),
    ClassOnly(ClassOnlyModifier),
    ClassMatch(ClassMatchModifier),
    ClassExclude(ClassExcludeModifier),
    LocationOnly(LocationOnlyModifier),
    ExceptionOnly(ExceptionOnlyModifier),
    FieldOnly(FieldOnlyModifier),
    Step(StepModifier),
    InstanceOnly(InstanceOnlyModifier),
}

impl RequestModifier {
    /// Build a modifier, acquiring global references for any handles in
    /// `spec`. Fails with `OutOfMemory` if a reference cannot be created;
    /// references acquired before the failure are released.
    pub fn new(env: &SharedEnv, spec: &ModifierSpec) -> AgentResult<Self> {
        let modifier = match spec {
            ModifierSpec::Count { count } => Self::Count(CountModifier::new(*count)?),
            ModifierSpec::Conditional { expr_id } => {
                Self::Conditional(ConditionalModifier::new(*expr_id))
            }
            ModifierSpec::ThreadOnly { thread } => {
                Self::ThreadOnly(ThreadOnlyModifier::new(env, *thread)?)
            }
            ModifierSpec::ClassOnly { class } => {
                Self::ClassOnly(ClassOnlyModifier::new(env, *class)?)
            }
            ModifierSpec::ClassMatch { pattern } => {
                Self::ClassMatch(ClassMatchModifier::new(pattern.clone()))
            }
            ModifierSpec::ClassExclude { pattern } => {
                Self::ClassExclude(ClassExcludeModifier::new(pattern.clone()))
            }
            ModifierSpec::LocationOnly {
                class,
                method,
                location,
            } => Self::LocationOnly(LocationOnlyModifier::new(env, *class, *method, *location)?),
            ModifierSpec::ExceptionOnly {
                class,
                caught,
                uncaught,
            } => Self::ExceptionOnly(ExceptionOnlyModifier::new(env, *class, *caught, *uncaught)?),
            ModifierSpec::FieldOnly { class, field } => {
                Self::FieldOnly(FieldOnlyModifier::new(env, *class, *field)?)
            }
            ModifierSpec::Step {
                thread,
                size,
                depth,
            } => Self::Step(StepModifier::new(env, *thread, *size, *depth)?),
            ModifierSpec::InstanceOnly { instance } => {
                Self::InstanceOnly(InstanceOnlyModifier::new(env, *instance)?)
            }
        };

        Ok(modifier)
    }

    pub fn kind(&self) -> ModifierKind {
        match self {
            Self::Count(_) => ModifierKind::Count,
            Self::Conditional(_) => ModifierKind::Conditional,
            Self::ThreadOnly(_) => ModifierKind::ThreadOnly,
            Self::ClassOnly(_) => ModifierKind::ClassOnly,
            Self::ClassMatch(_) => ModifierKind::ClassMatch,
            Self::ClassExclude(_) => ModifierKind::ClassExclude,
            Self::LocationOnly(_) => ModifierKind::LocationOnly,
            Self::ExceptionOnly(_) => ModifierKind::ExceptionOnly,
            Self::FieldOnly(_) => ModifierKind::FieldOnly,
            Self::Step(_) => ModifierKind::Step,
            Self::InstanceOnly(_) => ModifierKind::InstanceOnly,
        }
    }

    /// Decide whether this occurrence passes the filter.
    ///
    /// Never fails: native query errors count as "no information".
    /// Two variants have side effects: `Count` consumes one occurrence on
    /// every call, and `InstanceOnly` may store the resolved receiver into
    /// `info.instance`, which every later modifier then observes.
    pub fn apply(&mut self, env: &dyn JvmEnv, info: &mut EventInfo) -> bool {
        match self {
            Self::Count(m) => m.apply(),
            Self::Conditional(m) => m.apply(),
            Self::ThreadOnly(m) => m.apply(env, info),
            Self::ClassOnly(m) => m.apply(env, info),
            Self::ClassMatch(m) => m.apply(info),
            Self::ClassExclude(m) => m.apply(info),
            Self::LocationOnly(m) => m.apply(env, info),
            Self::ExceptionOnly(m) => m.apply(env, info),
            Self::FieldOnly(m) => m.apply(env, info),
            Self::Step(m) => m.apply(),
            Self::InstanceOnly(m) => m.apply(env, info),
        }
    }
}

/// Reports an event only on its n-th occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountModifier {
    count: i32,
}

impl CountModifier {
    pub fn new(count: i32) -> AgentResult<Self> {
        if count < 1 {
            return Err(AgentError::InvalidCount(count));
        }
        Ok(Self { count })
    }

    /// Occurrences left before the event is reported; zero once it fired
    pub fn count(&self) -> i32 {
        self.count
    }

    /// Consumes one occurrence. True exactly once, when the counter hits
    /// zero; false forever after. Must run after every other modifier of
    /// the request has accepted, or occurrences that would have been
    /// filtered out are counted too.
    pub fn apply(&mut self) -> bool {
        if self.count > 0 {
            self.count -= 1;
            return self.count == 0;
        }
        false
    }

    pub fn is_exhausted(&self) -> bool {
        self.count == 0
    }
}

/// Conditional expression filter. Expression evaluation is not
/// implemented; every event passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalModifier {
    expr_id: i32,
}

impl ConditionalModifier {
    pub fn new(expr_id: i32) -> Self {
        Self { expr_id }
    }

    pub fn expr_id(&self) -> i32 {
        self.expr_id
    }

    pub fn apply(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedVm;
    use crate::types::EventKind;
    use std::sync::Arc;

    #[test]
    fn test_count_fires_once_on_nth_call() {
        let mut count = CountModifier::new(3).unwrap();
        let results: Vec<bool> = (0..6).map(|_| count.apply()).collect();
        assert_eq!(results, vec![false, false, true, false, false, false]);
        assert_eq!(count.count(), 0);
        assert!(count.is_exhausted());
    }

    #[test]
    fn test_count_of_one_fires_immediately() {
        let mut count = CountModifier::new(1).unwrap();
        assert!(count.apply());
        assert!(!count.apply());
        assert_eq!(count.count(), 0);
    }

    #[test]
    fn test_count_decrements_to_zero_in_n_calls() {
        let mut count = CountModifier::new(5).unwrap();
        for expected in (0..5).rev() {
            count.apply();
            assert_eq!(count.count(), expected);
        }
    }

    #[test]
    fn test_count_rejects_non_positive() {
        assert!(matches!(CountModifier::new(0), Err(AgentError::InvalidCount(0))));
        assert!(matches!(CountModifier::new(-4), Err(AgentError::InvalidCount(-4))));
    }

    #[test]
    fn test_conditional_always_passes() {
        let vm = Arc::new(SimulatedVm::new());
        let env: SharedEnv = vm.clone();
        let mut modifier =
            RequestModifier::new(&env, &ModifierSpec::Conditional { expr_id: 17 }).unwrap();
        let mut info = EventInfo::new(EventKind::Breakpoint);

        assert_eq!(modifier.kind(), ModifierKind::Conditional);
        for _ in 0..3 {
            assert!(modifier.apply(vm.as_ref(), &mut info));
        }
        if let RequestModifier::Conditional(m) = &modifier {
            assert_eq!(m.expr_id(), 17);
        }
    }

    #[test]
    fn test_spec_kind_matches_built_kind() {
        let vm = Arc::new(SimulatedVm::new());
        let env: SharedEnv = vm.clone();
        let thread = vm.new_thread();
        let class = vm.define_class("LA;", None);
        let method = vm.define_method(false);
        let field = vm.define_field();

        let specs = vec![
            ModifierSpec::Count { count: 2 },
            ModifierSpec::Conditional { expr_id: 1 },
            ModifierSpec::ThreadOnly { thread },
            ModifierSpec::ClassOnly { class },
            ModifierSpec::ClassMatch { pattern: "LA;".to_string() },
            ModifierSpec::ClassExclude { pattern: "LB;".to_string() },
            ModifierSpec::LocationOnly { class, method, location: 4 },
            ModifierSpec::ExceptionOnly { class: None, caught: true, uncaught: false },
            ModifierSpec::FieldOnly { class, field },
            ModifierSpec::Step { thread, size: 1, depth: 0 },
            ModifierSpec::InstanceOnly { instance: None },
        ];

        for spec in &specs {
            let modifier = RequestModifier::new(&env, spec).unwrap();
            assert_eq!(modifier.kind(), spec.kind());
        }
        // Every reference taken above has been released again
        assert_eq!(vm.live_global_refs(), 0);
    }

    #[test]
    fn test_spec_from_json() {
        let spec: ModifierSpec =
            serde_json::from_str(r#"{"kind":"exception_only","caught":false,"uncaught":true}"#)
                .unwrap();
        assert_eq!(
            spec,
            ModifierSpec::ExceptionOnly { class: None, caught: false, uncaught: true }
        );

        let spec: ModifierSpec =
            serde_json::from_str(r#"{"kind":"thread_only","thread":12}"#).unwrap();
        assert_eq!(spec, ModifierSpec::ThreadOnly { thread: ObjectRef(12) });
    }
}
