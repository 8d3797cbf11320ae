// Replay session state
//
// Owns the simulated VM, the script's name bindings and the request table
// standing in for the agent's request manager

use crate::protocol::{ScriptEvent, ScriptModifier};
use anyhow::{anyhow, bail, Context, Result};
use jdwp_filter::sim::SimulatedVm;
use jdwp_filter::types::{EventKind, FieldId, MethodId, ObjectRef};
use jdwp_filter::{evaluate_requests, EventInfo, EventRequest, ModifierSpec, RequestBuilder, SharedEnv};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

pub type RequestId = i32;

/// Outcome of running one event through the request table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub event: u64,
    pub matched: Vec<RequestId>,
    pub expired: Vec<RequestId>,
}

pub struct ReplaySession {
    vm: Arc<SimulatedVm>,
    env: SharedEnv,
    objects: HashMap<String, ObjectRef>,
    methods: HashMap<String, MethodId>,
    fields: HashMap<String, FieldId>,
    requests: BTreeMap<RequestId, EventRequest>,
    next_request_id: RequestId,
    events_seen: u64,
}

impl ReplaySession {
    pub fn new() -> Self {
        let vm = Arc::new(SimulatedVm::new());
        let env: SharedEnv = vm.clone();
        Self {
            vm,
            env,
            objects: HashMap::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
            requests: BTreeMap::new(),
            next_request_id: 1,
            events_seen: 0,
        }
    }

    #[cfg(test)]
    pub fn vm(&self) -> &SimulatedVm {
        &self.vm
    }

    #[cfg(test)]
    pub fn request(&self, id: RequestId) -> Option<&EventRequest> {
        self.requests.get(&id)
    }

    pub fn configure(&mut self, global_ref_capacity: Option<usize>) {
        info!("Global reference capacity: {:?}", global_ref_capacity);
        self.vm.set_global_ref_capacity(global_ref_capacity);
    }

    pub fn define_thread(&mut self, name: &str) -> Result<()> {
        let thread = self.vm.new_thread();
        self.bind_object(name, thread)
    }

    pub fn define_class(&mut self, name: &str, signature: &str, superclass: Option<&str>) -> Result<()> {
        let superclass = superclass.map(|s| self.object(s)).transpose()?;
        let class = self.vm.define_class(signature, superclass);
        self.bind_object(name, class)
    }

    pub fn define_object(&mut self, name: &str) -> Result<()> {
        let object = self.vm.new_object();
        self.bind_object(name, object)
    }

    pub fn define_method(&mut self, name: &str, is_static: bool) -> Result<()> {
        if self.methods.contains_key(name) {
            bail!("Method '{}' already defined", name);
        }
        self.methods.insert(name.to_string(), self.vm.define_method(is_static));
        Ok(())
    }

    pub fn define_field(&mut self, name: &str) -> Result<()> {
        if self.fields.contains_key(name) {
            bail!("Field '{}' already defined", name);
        }
        self.fields.insert(name.to_string(), self.vm.define_field());
        Ok(())
    }

    pub fn set_frame(&mut self, thread: &str, this: Option<&str>) -> Result<()> {
        let thread = self.object(thread)?;
        let this = this.map(|t| self.object(t)).transpose()?;
        self.vm.push_frame(thread, this);
        Ok(())
    }

    /// Register a request; on failure nothing stays registered
    pub fn set_request(
        &mut self,
        event_kind: EventKind,
        suspend_policy: u8,
        modifiers: &[ScriptModifier],
    ) -> Result<RequestId> {
        let specs = modifiers
            .iter()
            .map(|m| self.modifier_spec(m))
            .collect::<Result<Vec<_>>>()?;

        let request = RequestBuilder::new(&self.env, event_kind, suspend_policy)
            .modifiers(&specs)?
            .build();

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.requests.insert(id, request);

        info!("Registered request {} for {:?} with {} modifiers", id, event_kind, specs.len());
        Ok(id)
    }

    pub fn clear_request(&mut self, id: RequestId) -> Result<()> {
        if self.requests.remove(&id).is_none() {
            bail!("No request with id {}", id);
        }
        debug!("Cleared request {}", id);
        Ok(())
    }

    /// Evaluate every request against one raised event, release the
    /// snapshot's local references, then delete the requests whose count
    /// filter fired
    pub fn raise_event(&mut self, event: &ScriptEvent) -> Result<Dispatch> {
        let mut info = self.snapshot(event)?;
        self.events_seen += 1;

        let ids: Vec<RequestId> = self.requests.keys().copied().collect();
        let matched: Vec<RequestId> =
            evaluate_requests(self.vm.as_ref(), &mut info, self.requests.values_mut())
                .into_iter()
                .map(|index| ids[index])
                .collect();
        info.release_locals(self.vm.as_ref());

        let expired: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|(_, r)| r.is_expired())
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.requests.remove(id);
            debug!("Request {} expired", id);
        }

        debug!("Event #{} {:?}: matched {:?}", self.events_seen, event.kind, matched);
        Ok(Dispatch {
            event: self.events_seen,
            matched,
            expired,
        })
    }

    // Build the snapshot the way a callback would: every handle is a fresh
    // local reference
    fn snapshot(&self, event: &ScriptEvent) -> Result<EventInfo> {
        let mut info = EventInfo::new(event.kind);
        info.thread = self.local(event.thread.as_deref())?;
        info.cls = self.local(event.class.as_deref())?;
        info.signature = match info.cls {
            Some(cls) => Some(
                self.vm
                    .class_signature(cls)
                    .context("Event class has no signature")?,
            ),
            None => None,
        };
        info.method = event.method.as_deref().map(|m| self.method(m)).transpose()?;
        info.location = event.location;
        info.field = event.field.as_deref().map(|f| self.field(f)).transpose()?;
        info.instance = self.local(event.instance.as_deref())?;
        info.aux_class = self.local(event.aux_class.as_deref())?;
        info.caught = event.caught;
        Ok(info)
    }

    fn modifier_spec(&self, modifier: &ScriptModifier) -> Result<ModifierSpec> {
        let spec = match modifier {
            ScriptModifier::Count { count } => ModifierSpec::Count { count: *count },
            ScriptModifier::Conditional { expr_id } => ModifierSpec::Conditional { expr_id: *expr_id },
            ScriptModifier::ThreadOnly { thread } => ModifierSpec::ThreadOnly {
                thread: self.object(thread)?,
            },
            ScriptModifier::ClassOnly { class } => ModifierSpec::ClassOnly {
                class: self.object(class)?,
            },
            ScriptModifier::ClassMatch { pattern } => ModifierSpec::ClassMatch {
                pattern: pattern.clone(),
            },
            ScriptModifier::ClassExclude { pattern } => ModifierSpec::ClassExclude {
                pattern: pattern.clone(),
            },
            ScriptModifier::LocationOnly {
                class,
                method,
                location,
            } => ModifierSpec::LocationOnly {
                class: self.object(class)?,
                method: self.method(method)?,
                location: *location,
            },
            ScriptModifier::ExceptionOnly {
                class,
                caught,
                uncaught,
            } => ModifierSpec::ExceptionOnly {
                class: class.as_deref().map(|c| self.object(c)).transpose()?,
                caught: *caught,
                uncaught: *uncaught,
            },
            ScriptModifier::FieldOnly { class, field } => ModifierSpec::FieldOnly {
                class: self.object(class)?,
                field: self.field(field)?,
            },
            ScriptModifier::Step {
                thread,
                size,
                depth,
            } => ModifierSpec::Step {
                thread: self.object(thread)?,
                size: *size,
                depth: *depth,
            },
            ScriptModifier::InstanceOnly { instance } => ModifierSpec::InstanceOnly {
                instance: instance.as_deref().map(|i| self.object(i)).transpose()?,
            },
        };
        Ok(spec)
    }

    fn bind_object(&mut self, name: &str, handle: ObjectRef) -> Result<()> {
        if self.objects.contains_key(name) {
            bail!("Object '{}' already defined", name);
        }
        self.objects.insert(name.to_string(), handle);
        Ok(())
    }

    fn object(&self, name: &str) -> Result<ObjectRef> {
        self.objects
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown object '{}'", name))
    }

    fn local(&self, name: Option<&str>) -> Result<Option<ObjectRef>> {
        let Some(name) = name else {
            return Ok(None);
        };
        let handle = self.object(name)?;
        self.vm
            .local_ref(handle)
            .map(Some)
            .ok_or_else(|| anyhow!("Object '{}' is no longer valid", name))
    }

    fn method(&self, name: &str) -> Result<MethodId> {
        self.methods
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown method '{}'", name))
    }

    fn field(&self, name: &str) -> Result<FieldId> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown field '{}'", name))
    }
}
