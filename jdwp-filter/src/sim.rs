// Simulated runtime
//
// In-memory implementation of the JNI/JVMTI seam. Objects live in a heap of
// ids; every handle handed out (local or global) is a distinct value that
// resolves to an object id, so identity has to go through is_same_object
// just as it does against a real VM.

use crate::env::JvmEnv;
use crate::error::JvmtiError;
use crate::types::{ClassRef, FieldId, MethodId, ObjectRef, ThreadRef, ACC_STATIC};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

type ObjectId = u64;

#[derive(Debug, Default)]
struct Heap {
    next: u64,
    handles: HashMap<ObjectRef, ObjectId>,
    globals: HashSet<ObjectRef>,
    global_capacity: Option<usize>,
    superclasses: HashMap<ObjectId, Option<ObjectId>>,
    signatures: HashMap<ObjectId, String>,
    threads: HashSet<ObjectId>,
    method_modifiers: HashMap<MethodId, i32>,
    fields: HashSet<FieldId>,
    // Top frame slot 0 per thread; an absent entry means no Java frames
    receivers: HashMap<ObjectId, Option<ObjectId>>,
    local_object_queries: usize,
}

impl Heap {
    fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    fn new_handle(&mut self, object: ObjectId) -> ObjectRef {
        let handle = ObjectRef(self.next_id());
        self.handles.insert(handle, object);
        handle
    }

    fn new_object(&mut self) -> (ObjectId, ObjectRef) {
        let object = self.next_id();
        (object, self.new_handle(object))
    }

    fn resolve(&self, handle: ObjectRef) -> Option<ObjectId> {
        self.handles.get(&handle).copied()
    }
}

/// A toy VM good enough to drive the filter chain in tests and replays
#[derive(Debug, Default)]
pub struct SimulatedVm {
    heap: Mutex<Heap>,
}

impl SimulatedVm {
    pub fn new() -> Self {
        Self::default()
    }

    fn heap(&self) -> MutexGuard<'_, Heap> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Limit the number of live global references; `None` is unbounded
    pub fn set_global_ref_capacity(&self, capacity: Option<usize>) {
        self.heap().global_capacity = capacity;
    }

    pub fn live_global_refs(&self) -> usize {
        self.heap().globals.len()
    }

    /// All live handles, local and global
    pub fn live_handles(&self) -> usize {
        self.heap().handles.len()
    }

    /// Number of GetLocalObject calls served so far
    pub fn local_object_queries(&self) -> usize {
        self.heap().local_object_queries
    }

    pub fn new_thread(&self) -> ThreadRef {
        let mut heap = self.heap();
        let (object, handle) = heap.new_object();
        heap.threads.insert(object);
        handle
    }

    pub fn new_object(&self) -> ObjectRef {
        self.heap().new_object().1
    }

    /// Define a class with the given signature and optional superclass
    pub fn define_class(&self, signature: &str, superclass: Option<ClassRef>) -> ClassRef {
        let mut heap = self.heap();
        let parent = superclass.and_then(|s| heap.resolve(s));
        let (object, handle) = heap.new_object();
        heap.superclasses.insert(object, parent);
        heap.signatures.insert(object, signature.to_string());
        handle
    }

    pub fn class_signature(&self, class: ClassRef) -> Option<String> {
        let heap = self.heap();
        let object = heap.resolve(class)?;
        heap.signatures.get(&object).cloned()
    }

    pub fn define_method(&self, is_static: bool) -> MethodId {
        let mut heap = self.heap();
        let method = heap.next_id();
        let modifiers = if is_static { ACC_STATIC | 0x0001 } else { 0x0001 };
        heap.method_modifiers.insert(method, modifiers);
        method
    }

    pub fn define_field(&self) -> FieldId {
        let mut heap = self.heap();
        let field = heap.next_id();
        heap.fields.insert(field);
        field
    }

    /// Another local handle to the same object
    pub fn local_ref(&self, obj: ObjectRef) -> Option<ObjectRef> {
        let mut heap = self.heap();
        let object = heap.resolve(obj)?;
        Some(heap.new_handle(object))
    }

    /// Put a frame on `thread` whose slot 0 holds `this` (`None` for a null slot)
    pub fn push_frame(&self, thread: ThreadRef, this: Option<ObjectRef>) {
        let mut heap = self.heap();
        let Some(thread) = heap.resolve(thread) else {
            warn!("push_frame on unknown thread handle");
            return;
        };
        let this = this.and_then(|obj| heap.resolve(obj));
        heap.receivers.insert(thread, this);
    }

}

impl JvmEnv for SimulatedVm {
    fn new_global_ref(&self, obj: ObjectRef) -> Option<ObjectRef> {
        let mut heap = self.heap();
        if let Some(capacity) = heap.global_capacity {
            if heap.globals.len() >= capacity {
                return None;
            }
        }
        let object = heap.resolve(obj)?;
        let handle = heap.new_handle(object);
        heap.globals.insert(handle);
        Some(handle)
    }

    fn delete_global_ref(&self, global: ObjectRef) {
        let mut heap = self.heap();
        if heap.globals.remove(&global) {
            heap.handles.remove(&global);
        } else {
            warn!("DeleteGlobalRef on {} which is not a live global reference", global);
        }
    }

    fn delete_local_ref(&self, local: ObjectRef) {
        let mut heap = self.heap();
        if heap.globals.contains(&local) || heap.handles.remove(&local).is_none() {
            warn!("DeleteLocalRef on {} which is not a live local reference", local);
        }
    }

    fn is_same_object(&self, a: ObjectRef, b: ObjectRef) -> bool {
        let heap = self.heap();
        match (heap.resolve(a), heap.resolve(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn is_assignable_from(&self, sub: ClassRef, sup: ClassRef) -> bool {
        let heap = self.heap();
        let (Some(mut current), Some(target)) = (heap.resolve(sub), heap.resolve(sup)) else {
            return false;
        };
        loop {
            if current == target {
                return true;
            }
            match heap.superclasses.get(&current) {
                Some(Some(parent)) => current = *parent,
                _ => return false,
            }
        }
    }

    fn get_method_modifiers(&self, method: MethodId) -> Result<i32, JvmtiError> {
        self.heap()
            .method_modifiers
            .get(&method)
            .copied()
            .ok_or(JvmtiError::INVALID_METHODID)
    }

    fn get_local_object(
        &self,
        thread: ThreadRef,
        depth: i32,
        slot: i32,
    ) -> Result<Option<ObjectRef>, JvmtiError> {
        let mut heap = self.heap();
        heap.local_object_queries += 1;

        let thread = heap.resolve(thread).ok_or(JvmtiError::INVALID_THREAD)?;
        if !heap.threads.contains(&thread) {
            return Err(JvmtiError::INVALID_THREAD);
        }
        // Only the top frame is modelled
        let this = match heap.receivers.get(&thread) {
            Some(this) if depth == 0 => *this,
            _ => return Err(JvmtiError::NO_MORE_FRAMES),
        };
        if slot != 0 {
            return Err(JvmtiError::INVALID_SLOT);
        }

        Ok(this.map(|object| heap.new_handle(object)))
    }
}
