// Agent-side type definitions
//
// Native handles, identifiers and the JDWP event/modifier vocabularies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque native object handle (a JNI `jobject`).
///
/// Handles are compared by value only when they are known to be the same
/// reference; object identity goes through `JvmEnv::is_same_object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub u64);

pub type ThreadRef = ObjectRef;
pub type ClassRef = ObjectRef;

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:x}", self.0)
    }
}

// JVMTI ids are opaque machine words
pub type MethodId = u64;
pub type FieldId = u64;

// Bytecode index within a method (jlocation)
pub type JLocation = i64;

/// Method modifier bit for `static` (JVM spec, access_flags)
pub const ACC_STATIC: i32 = 0x0008;

/// JDWP event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    SingleStep = 1,
    Breakpoint = 2,
    FramePop = 3,
    Exception = 4,
    UserDefined = 5,
    ThreadStart = 6,
    ThreadDeath = 7,
    ClassPrepare = 8,
    ClassUnload = 9,
    ClassLoad = 10,
    FieldAccess = 20,
    FieldModification = 21,
    ExceptionCatch = 30,
    MethodEntry = 40,
    MethodExit = 41,
    MethodExitWithReturnValue = 42,
    MonitorContendedEnter = 43,
    MonitorContendedEntered = 44,
    MonitorWait = 45,
    MonitorWaited = 46,
    VmStart = 90,
    VmDeath = 99,
}

impl EventKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        let kind = match value {
            1 => Self::SingleStep,
            2 => Self::Breakpoint,
            3 => Self::FramePop,
            4 => Self::Exception,
            5 => Self::UserDefined,
            6 => Self::ThreadStart,
            7 => Self::ThreadDeath,
            8 => Self::ClassPrepare,
            9 => Self::ClassUnload,
            10 => Self::ClassLoad,
            20 => Self::FieldAccess,
            21 => Self::FieldModification,
            30 => Self::ExceptionCatch,
            40 => Self::MethodEntry,
            41 => Self::MethodExit,
            42 => Self::MethodExitWithReturnValue,
            43 => Self::MonitorContendedEnter,
            44 => Self::MonitorContendedEntered,
            45 => Self::MonitorWait,
            46 => Self::MonitorWaited,
            90 => Self::VmStart,
            99 => Self::VmDeath,
            _ => return None,
        };
        Some(kind)
    }

    /// Event kinds whose JVMTI callback does not pass the receiver object.
    /// For these the instance filter has to fetch `this` from the frame.
    pub fn lacks_receiver(self) -> bool {
        matches!(
            self,
            Self::SingleStep
                | Self::Breakpoint
                | Self::Exception
                | Self::MethodEntry
                | Self::MethodExit
        )
    }

    /// Event kinds that report a code location
    pub fn has_location(self) -> bool {
        matches!(
            self,
            Self::SingleStep
                | Self::Breakpoint
                | Self::Exception
                | Self::FieldAccess
                | Self::FieldModification
                | Self::MethodEntry
                | Self::MethodExit
                | Self::MethodExitWithReturnValue
        )
    }

    pub fn is_field_event(self) -> bool {
        matches!(self, Self::FieldAccess | Self::FieldModification)
    }
}

/// JDWP event request modifier kinds (EventRequest.Set modKind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ModifierKind {
    Count = 1,
    Conditional = 2,
    ThreadOnly = 3,
    ClassOnly = 4,
    ClassMatch = 5,
    ClassExclude = 6,
    LocationOnly = 7,
    ExceptionOnly = 8,
    FieldOnly = 9,
    Step = 10,
    InstanceOnly = 11,
}

impl ModifierKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        let kind = match value {
            1 => Self::Count,
            2 => Self::Conditional,
            3 => Self::ThreadOnly,
            4 => Self::ClassOnly,
            5 => Self::ClassMatch,
            6 => Self::ClassExclude,
            7 => Self::LocationOnly,
            8 => Self::ExceptionOnly,
            9 => Self::FieldOnly,
            10 => Self::Step,
            11 => Self::InstanceOnly,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether a modifier of this kind may qualify a request for `event`.
    pub fn is_valid_for(self, event: EventKind) -> bool {
        use EventKind::*;

        match self {
            Self::Count | Self::Conditional => true,
            Self::ThreadOnly => !matches!(event, ClassUnload | VmStart | VmDeath),
            Self::ClassOnly | Self::ClassMatch | Self::ClassExclude => {
                !matches!(event, ThreadStart | ThreadDeath | VmStart | VmDeath)
            }
            Self::LocationOnly => matches!(
                event,
                Breakpoint | SingleStep | Exception | FieldAccess | FieldModification
            ),
            Self::ExceptionOnly => event == Exception,
            Self::FieldOnly => event.is_field_event(),
            Self::Step => event == SingleStep,
            Self::InstanceOnly => matches!(
                event,
                Breakpoint
                    | SingleStep
                    | Exception
                    | FieldAccess
                    | FieldModification
                    | MethodEntry
                    | MethodExit
                    | MethodExitWithReturnValue
            ),
        }
    }
}

// Step sizes
pub mod step_sizes {
    pub const MIN: i32 = 0;
    pub const LINE: i32 = 1;
}

// Step depths
pub mod step_depths {
    pub const INTO: i32 = 0;
    pub const OVER: i32 = 1;
    pub const OUT: i32 = 2;
}
