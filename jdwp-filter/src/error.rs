// Agent error definitions
//
// Construction-time failures of event request modifiers and the JVMTI
// error codes reported by the native environment

use thiserror::Error;

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// A global reference could not be created (reference table exhausted)
    #[error("Out of resources: cannot create global reference")]
    OutOfMemory,

    #[error("Invalid count: {0}")]
    InvalidCount(i32),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
}

impl AgentError {
    /// JDWP error code to put in the reply packet for this failure
    pub fn jdwp_error_code(&self) -> u16 {
        match self {
            AgentError::OutOfMemory => 110,
            AgentError::InvalidCount(_) => 512,
            AgentError::IllegalArgument(_) => 103,
        }
    }
}

/// Error returned by a JVMTI function. Only seen on evaluation paths,
/// where it is logged and folded into "no information".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{} ({})", self.name(), .0)]
pub struct JvmtiError(pub u32);

impl JvmtiError {
    pub const INVALID_THREAD: Self = Self(10);
    pub const INVALID_METHODID: Self = Self(23);
    pub const NO_MORE_FRAMES: Self = Self(31);
    pub const INVALID_SLOT: Self = Self(35);

    pub fn name(&self) -> &'static str {
        match self.0 {
            0 => "NONE",
            10 => "INVALID_THREAD",
            11 => "INVALID_THREAD_GROUP",
            12 => "INVALID_PRIORITY",
            13 => "THREAD_NOT_SUSPENDED",
            14 => "THREAD_SUSPENDED",
            15 => "THREAD_NOT_ALIVE",
            20 => "INVALID_OBJECT",
            21 => "INVALID_CLASS",
            22 => "CLASS_NOT_PREPARED",
            23 => "INVALID_METHODID",
            24 => "INVALID_LOCATION",
            25 => "INVALID_FIELDID",
            31 => "NO_MORE_FRAMES",
            32 => "OPAQUE_FRAME",
            34 => "TYPE_MISMATCH",
            35 => "INVALID_SLOT",
            40 => "DUPLICATE",
            41 => "NOT_FOUND",
            50 => "INVALID_MONITOR",
            51 => "NOT_MONITOR_OWNER",
            52 => "INTERRUPT",
            98 => "NOT_AVAILABLE",
            99 => "MUST_POSSESS_CAPABILITY",
            100 => "NULL_POINTER",
            101 => "ABSENT_INFORMATION",
            102 => "INVALID_EVENT_TYPE",
            103 => "ILLEGAL_ARGUMENT",
            104 => "NATIVE_METHOD",
            110 => "OUT_OF_MEMORY",
            111 => "ACCESS_DENIED",
            112 => "WRONG_PHASE",
            113 => "INTERNAL",
            115 => "UNATTACHED_THREAD",
            116 => "INVALID_ENVIRONMENT",
            _ => "UNKNOWN_ERROR",
        }
    }
}
