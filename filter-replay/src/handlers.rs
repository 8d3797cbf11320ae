// Script line handlers
//
// Parses each script line and routes it to the replay session

use crate::protocol::*;
use crate::session::ReplaySession;
use anyhow::Result;
use jdwp_filter::AgentError;
use tracing::{debug, warn};

pub struct ScriptHandler {
    session: ReplaySession,
}

impl ScriptHandler {
    pub fn new() -> Self {
        Self {
            session: ReplaySession::new(),
        }
    }

    /// Handle script line number `line_no` (1-based, counting blank and
    /// comment lines). Definitions are silent; requests, events and
    /// failures produce a reply.
    pub fn handle_line(&mut self, line_no: usize, line: &str) -> Option<Reply> {
        let result = serde_json::from_str::<ScriptOp>(line)
            .map_err(anyhow::Error::from)
            .and_then(|op| self.handle_op(line_no, op));

        match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Line {}: {:#}", line_no, e);
                Some(Reply::Error {
                    line: line_no,
                    error: format!("{:#}", e),
                    code: e.downcast_ref::<AgentError>().map(AgentError::jdwp_error_code),
                })
            }
        }
    }

    fn handle_op(&mut self, line_no: usize, op: ScriptOp) -> Result<Option<Reply>> {
        debug!("Line {}: {:?}", line_no, op);

        let session = &mut self.session;
        let reply = match op {
            ScriptOp::Configure { global_ref_capacity } => {
                session.configure(global_ref_capacity);
                None
            }
            ScriptOp::Thread { name } => {
                session.define_thread(&name)?;
                None
            }
            ScriptOp::Class {
                name,
                signature,
                superclass,
            } => {
                session.define_class(&name, &signature, superclass.as_deref())?;
                None
            }
            ScriptOp::Object { name } => {
                session.define_object(&name)?;
                None
            }
            ScriptOp::Method { name, is_static } => {
                session.define_method(&name, is_static)?;
                None
            }
            ScriptOp::Field { name } => {
                session.define_field(&name)?;
                None
            }
            ScriptOp::Frame { thread, this } => {
                session.set_frame(&thread, this.as_deref())?;
                None
            }
            ScriptOp::Set {
                event_kind,
                suspend_policy,
                modifiers,
            } => {
                let request_id = session.set_request(event_kind, suspend_policy, &modifiers)?;
                Some(Reply::RequestSet { request_id })
            }
            ScriptOp::Clear { request_id } => {
                session.clear_request(request_id)?;
                Some(Reply::RequestCleared {
                    cleared: request_id,
                })
            }
            ScriptOp::Event(event) => {
                let dispatch = session.raise_event(&event)?;
                Some(Reply::Event {
                    event: dispatch.event,
                    matched: dispatch.matched,
                    expired: dispatch.expired,
                })
            }
        };

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(handler: &mut ScriptHandler, lines: &[&str]) -> Vec<Reply> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| handler.handle_line(i + 1, l))
            .collect()
    }

    #[test]
    fn test_exception_filter_script() {
        let mut handler = ScriptHandler::new();
        let replies = run(
            &mut handler,
            &[
                r#"{"op":"thread","name":"main"}"#,
                r#"{"op":"class","name":"app","signature":"LApp;"}"#,
                r#"{"op":"class","name":"throwable","signature":"Ljava/lang/Throwable;"}"#,
                r#"{"op":"class","name":"ioe","signature":"Ljava/io/IOException;","superclass":"throwable"}"#,
                r#"{"op":"class","name":"err","signature":"Ljava/lang/Error;"}"#,
                r#"{"op":"method","name":"main","is_static":true}"#,
                r#"{"op":"set","event_kind":"exception","modifiers":[{"kind":"exception_only","class":"throwable","caught":false,"uncaught":true}]}"#,
                r#"{"op":"event","kind":"exception","thread":"main","class":"app","method":"main","aux_class":"ioe"}"#,
                r#"{"op":"event","kind":"exception","thread":"main","class":"app","method":"main","aux_class":"ioe","caught":true}"#,
                r#"{"op":"event","kind":"exception","thread":"main","class":"app","method":"main","aux_class":"err"}"#,
            ],
        );

        assert_eq!(
            replies,
            vec![
                Reply::RequestSet { request_id: 1 },
                Reply::Event { event: 1, matched: vec![1], expired: vec![] },
                Reply::Event { event: 2, matched: vec![], expired: vec![] },
                Reply::Event { event: 3, matched: vec![], expired: vec![] },
            ]
        );
    }

    #[test]
    fn test_errors_carry_line_and_code() {
        let mut handler = ScriptHandler::new();
        let replies = run(
            &mut handler,
            &[
                "not json",
                r#"{"op":"thread","name":"main"}"#,
                r#"{"op":"set","event_kind":"breakpoint","modifiers":[{"kind":"count","count":0}]}"#,
                r#"{"op":"set","event_kind":"breakpoint","modifiers":[{"kind":"step","thread":"main","size":1,"depth":0}]}"#,
            ],
        );

        assert_eq!(replies.len(), 3);
        assert!(matches!(&replies[0], Reply::Error { line: 1, code: None, .. }));
        assert!(matches!(&replies[1], Reply::Error { line: 3, code: Some(512), .. }));
        assert!(matches!(&replies[2], Reply::Error { line: 4, code: Some(103), .. }));
    }
}
