// Native environment seam
//
// The JNI and JVMTI calls the filter chain relies on, plus the RAII guard
// for global references held by modifiers

use crate::error::{AgentError, AgentResult, JvmtiError};
use crate::types::{ClassRef, MethodId, ObjectRef, ThreadRef};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The subset of JNI/JVMTI used while building and applying modifiers.
///
/// Implementations must be callable from any callback thread.
pub trait JvmEnv: Send + Sync {
    /// JNI `NewGlobalRef`. Returns `None` when the reference table is full.
    fn new_global_ref(&self, obj: ObjectRef) -> Option<ObjectRef>;

    /// JNI `DeleteGlobalRef`
    fn delete_global_ref(&self, global: ObjectRef);

    /// JNI `DeleteLocalRef`
    fn delete_local_ref(&self, local: ObjectRef);

    /// JNI `IsSameObject`
    fn is_same_object(&self, a: ObjectRef, b: ObjectRef) -> bool;

    /// JNI `IsAssignableFrom`: `sub` is `sup` or one of its subtypes
    fn is_assignable_from(&self, sub: ClassRef, sup: ClassRef) -> bool;

    /// JVMTI `GetMethodModifiers`
    fn get_method_modifiers(&self, method: MethodId) -> Result<i32, JvmtiError>;

    /// JVMTI `GetLocalObject`. `Ok(None)` is a null local.
    fn get_local_object(
        &self,
        thread: ThreadRef,
        depth: i32,
        slot: i32,
    ) -> Result<Option<ObjectRef>, JvmtiError>;
}

pub type SharedEnv = Arc<dyn JvmEnv>;

/// Owned global reference, deleted exactly once when dropped
pub struct GlobalRef {
    handle: ObjectRef,
    env: SharedEnv,
}

impl GlobalRef {
    /// Promote a callback-local handle to a global reference
    pub fn new(env: &SharedEnv, obj: ObjectRef) -> AgentResult<Self> {
        match env.new_global_ref(obj) {
            Some(handle) => Ok(Self {
                handle,
                env: Arc::clone(env),
            }),
            None => {
                warn!("NewGlobalRef failed for {}", obj);
                Err(AgentError::OutOfMemory)
            }
        }
    }

    /// Same as `new` but a null handle stays null
    pub fn new_nullable(env: &SharedEnv, obj: Option<ObjectRef>) -> AgentResult<Option<Self>> {
        obj.map(|obj| Self::new(env, obj)).transpose()
    }

    pub fn get(&self) -> ObjectRef {
        self.handle
    }
}

impl Drop for GlobalRef {
    fn drop(&mut self) {
        self.env.delete_global_ref(self.handle);
    }
}

impl fmt::Debug for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalRef").field(&self.handle).finish()
    }
}
