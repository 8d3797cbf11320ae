// JDWP agent event filter chain
//
// Decides, for each event raised by the target VM, whether a registered
// event request's modifiers all accept it:
// - Event snapshots
// - Class pattern matching
// - Request modifiers and receiver resolution
// - Request chain evaluation with count filters kept last
// - A simulated VM for driving the chain without a JVM

pub mod env;
pub mod error;
pub mod instance;
pub mod modifier;
pub mod pattern;
pub mod request;
pub mod scope;
pub mod sim;
pub mod snapshot;
pub mod types;

pub use env::{GlobalRef, JvmEnv, SharedEnv};
pub use error::{AgentError, AgentResult, JvmtiError};
pub use modifier::{ModifierSpec, RequestModifier};
pub use request::{evaluate_requests, EventRequest, RequestBuilder};
pub use snapshot::EventInfo;
pub use types::{EventKind, ModifierKind, ObjectRef};
