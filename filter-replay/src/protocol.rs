// Replay script protocol
//
// One JSON object per line on stdin, one JSON reply per line on stdout.
// Objects are named in the script; the session maps names to VM handles.

use jdwp_filter::types::{EventKind, JLocation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Runtime limits of the simulated VM
    Configure {
        #[serde(default)]
        global_ref_capacity: Option<usize>,
    },
    Thread {
        name: String,
    },
    Class {
        name: String,
        signature: String,
        #[serde(default)]
        superclass: Option<String>,
    },
    Object {
        name: String,
    },
    Method {
        name: String,
        #[serde(default)]
        is_static: bool,
    },
    Field {
        name: String,
    },
    /// Top frame of a thread; `this` is its slot 0
    Frame {
        thread: String,
        #[serde(default)]
        this: Option<String>,
    },
    /// EventRequest.Set
    Set {
        event_kind: EventKind,
        #[serde(default)]
        suspend_policy: u8,
        #[serde(default)]
        modifiers: Vec<ScriptModifier>,
    },
    /// EventRequest.Clear
    Clear {
        request_id: i32,
    },
    /// A raised event to run through every registered request
    Event(ScriptEvent),
}

/// Modifier parameters with objects given by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptModifier {
    Count {
        count: i32,
    },
    Conditional {
        expr_id: i32,
    },
    ThreadOnly {
        thread: String,
    },
    ClassOnly {
        class: String,
    },
    ClassMatch {
        pattern: String,
    },
    ClassExclude {
        pattern: String,
    },
    LocationOnly {
        class: String,
        method: String,
        location: JLocation,
    },
    ExceptionOnly {
        #[serde(default)]
        class: Option<String>,
        caught: bool,
        uncaught: bool,
    },
    FieldOnly {
        class: String,
        field: String,
    },
    Step {
        thread: String,
        size: i32,
        depth: i32,
    },
    InstanceOnly {
        #[serde(default)]
        instance: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptEvent {
    pub kind: EventKind,
    #[serde(default)]
    pub thread: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub location: JLocation,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub aux_class: Option<String>,
    #[serde(default)]
    pub caught: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    RequestSet {
        request_id: i32,
    },
    RequestCleared {
        cleared: i32,
    },
    Event {
        event: u64,
        matched: Vec<i32>,
        /// Requests deleted because their count filter fired
        #[serde(skip_serializing_if = "Vec::is_empty")]
        expired: Vec<i32>,
    },
    Error {
        line: usize,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let op: ScriptOp = serde_json::from_str(
            r#"{"op":"set","event_kind":"breakpoint","modifiers":[{"kind":"count","count":3},{"kind":"class_match","pattern":"Lcom/foo/*;"}]}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            ScriptOp::Set {
                event_kind: EventKind::Breakpoint,
                suspend_policy: 0,
                modifiers: vec![
                    ScriptModifier::Count { count: 3 },
                    ScriptModifier::ClassMatch { pattern: "Lcom/foo/*;".to_string() },
                ],
            }
        );
    }

    #[test]
    fn test_parse_event_defaults() {
        let op: ScriptOp =
            serde_json::from_str(r#"{"op":"event","kind":"thread_start","thread":"main"}"#).unwrap();
        let ScriptOp::Event(event) = op else {
            panic!("expected event");
        };
        assert_eq!(event.kind, EventKind::ThreadStart);
        assert_eq!(event.thread.as_deref(), Some("main"));
        assert_eq!(event.location, 0);
        assert!(!event.caught);
    }

    #[test]
    fn test_reply_shapes() {
        let reply = Reply::Event { event: 4, matched: vec![1], expired: vec![] };
        assert_eq!(serde_json::to_string(&reply).unwrap(), r#"{"event":4,"matched":[1]}"#);

        let reply = Reply::Error { line: 2, error: "boom".to_string(), code: Some(110) };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"line":2,"error":"boom","code":110}"#
        );
    }
}
