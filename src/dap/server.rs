use super::protocol::{read_message, write_message, DapMessage, DapMessageContent};
use crate::config::LaunchConfig;
use crate::debugger::{render_execution_trace, DebugState, FormulaDebugger, RunMode};
use crate::executor::MapVariables;
use crate::parser::parse_formula;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

const THREAD_ID: u64 = 1;
const VARIABLES_REF: u64 = 1;
const TRACE_REF: u64 = 2;

enum Flow {
    Continue,
    Disconnect,
}

/// Debug Adapter Protocol front end for one formula at a time.
///
/// The formula and its debugger only live inside [`DapServer::debug`], which keeps
/// answering requests until the client disconnects.
pub struct DapServer<W: Write> {
    writer: W,
    seq: u64,
    pending: Option<LaunchConfig>,
    configured: bool,
}

impl<W: Write> DapServer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            seq: 0,
            pending: None,
            configured: false,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn run<R: BufRead>(&mut self, reader: &mut R) -> io::Result<()> {
        while let Some(msg) = read_message(reader)? {
            let DapMessageContent::Request { command, arguments } = msg.content else {
                debug!("ignoring non-request message");
                continue;
            };
            debug!(%command, seq = msg.seq, "request");

            match command.as_str() {
                "initialize" => self.handle_initialize(msg.seq, command)?,
                "launch" => self.handle_launch(msg.seq, command, arguments)?,
                "configurationDone" => {
                    self.configured = true;
                    self.send_response(msg.seq, command, true, None)?;
                }
                "setBreakpoints" => self.handle_set_breakpoints(msg.seq, command, arguments)?,
                "threads" => self.handle_threads(msg.seq, command)?,
                "disconnect" => {
                    self.send_response(msg.seq, command, true, None)?;
                    return Ok(());
                }
                _ => self.send_error(msg.seq, command, "no formula has been launched")?,
            }

            if !self.configured {
                continue;
            }
            if let Some(config) = self.pending.take() {
                if let Flow::Disconnect = self.debug(config, reader)? {
                    return Ok(());
                }
            }
        }
        debug!("client closed the stream");
        Ok(())
    }

    fn debug<R: BufRead>(&mut self, config: LaunchConfig, reader: &mut R) -> io::Result<Flow> {
        let variables = match config.to_variables() {
            Ok(variables) => variables,
            Err(err) => return self.abort_launch(&err.to_string()),
        };
        let formula = match parse_formula(&config.formula) {
            Ok(formula) => formula,
            Err(err) => return self.abort_launch(&err.to_string()),
        };

        info!(formula = %config.formula, "dap session started");
        let mut debugger = FormulaDebugger::new(&formula, &variables);
        if let Err(err) = debugger.launch(config.stop_on_entry) {
            debug!(%err, "launch stopped on an error");
        }
        self.report_stop(&debugger, "entry")?;

        while let Some(msg) = read_message(reader)? {
            let DapMessageContent::Request { command, arguments } = msg.content else {
                continue;
            };
            debug!(%command, seq = msg.seq, "request");

            match command.as_str() {
                "threads" => self.handle_threads(msg.seq, command)?,
                "stackTrace" => self.handle_stack_trace(msg.seq, command, &debugger)?,
                "scopes" => self.handle_scopes(msg.seq, command)?,
                "variables" => {
                    self.handle_variables(msg.seq, command, arguments, &debugger, &variables)?
                }
                "evaluate" => self.handle_evaluate(msg.seq, command, arguments, &variables)?,
                "continue" | "next" | "stepIn" | "stepOut" => {
                    self.handle_step(msg.seq, command, &mut debugger)?
                }
                "setBreakpoints" => self.handle_set_breakpoints(msg.seq, command, arguments)?,
                "configurationDone" => self.send_response(msg.seq, command, true, None)?,
                "disconnect" => {
                    self.send_response(msg.seq, command, true, None)?;
                    return Ok(Flow::Disconnect);
                }
                _ => {
                    warn!(%command, "unhandled dap command");
                    self.send_error(msg.seq, command, "unsupported request")?;
                }
            }
        }
        Ok(Flow::Disconnect)
    }

    pub fn send_response(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
    ) -> io::Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success,
                command,
                message: None,
                body,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    fn send_error(&mut self, request_seq: u64, command: String, message: &str) -> io::Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success: false,
                command,
                message: Some(message.to_string()),
                body: None,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    pub fn send_event(&mut self, event: &str, body: Option<Value>) -> io::Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "event".to_string(),
            content: DapMessageContent::Event {
                event: event.to_string(),
                body,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    fn handle_initialize(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsEvaluateForHovers": true,
            "supportsStepBack": false,
            "supportsFunctionBreakpoints": false,
            "supportsConditionalBreakpoints": false,
            "supportsSetVariable": false,
        });
        self.send_response(seq, command, true, Some(body))?;
        self.send_event("initialized", None)
    }

    fn handle_launch(&mut self, seq: u64, command: String, args: Option<Value>) -> io::Result<()> {
        match LaunchConfig::from_json(args.unwrap_or(Value::Null)) {
            Ok(config) => {
                self.pending = Some(config);
                self.send_response(seq, command, true, None)
            }
            Err(err) => self.send_error(seq, command, &err.to_string()),
        }
    }

    /// Formulas have no lines, so every requested breakpoint is reported unverified.
    fn handle_set_breakpoints(
        &mut self,
        seq: u64,
        command: String,
        args: Option<Value>,
    ) -> io::Result<()> {
        let requested = args
            .as_ref()
            .and_then(|v| v.get("breakpoints"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let breakpoints: Vec<Value> = (0..requested)
            .map(|_| {
                json!({
                    "verified": false,
                    "message": "formulas have no line breakpoints; use the stepping commands"
                })
            })
            .collect();
        self.send_response(seq, command, true, Some(json!({ "breakpoints": breakpoints })))
    }

    fn handle_threads(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({ "threads": [{ "id": THREAD_ID, "name": "Formula" }] });
        self.send_response(seq, command, true, Some(body))
    }

    fn handle_stack_trace(
        &mut self,
        seq: u64,
        command: String,
        debugger: &FormulaDebugger<'_>,
    ) -> io::Result<()> {
        let frames: Vec<Value> = debugger
            .get_call_stack()
            .iter()
            .rev()
            .map(|frame| {
                let name = match frame.value() {
                    Some(value) => format!("{}: ({}) = {value}", frame.name(), frame.source_text()),
                    None => format!("{}: ({})", frame.name(), frame.source_text()),
                };
                json!({
                    "id": frame.counter(),
                    "name": name,
                    "line": 1,
                    "column": frame.node().span().start + 1,
                })
            })
            .collect();
        let body = json!({ "totalFrames": frames.len(), "stackFrames": frames });
        self.send_response(seq, command, true, Some(body))
    }

    fn handle_scopes(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({
            "scopes": [
                { "name": "Variables", "variablesReference": VARIABLES_REF, "expensive": false },
                { "name": "Execution Trace", "variablesReference": TRACE_REF, "expensive": false }
            ]
        });
        self.send_response(seq, command, true, Some(body))
    }

    fn handle_variables(
        &mut self,
        seq: u64,
        command: String,
        args: Option<Value>,
        debugger: &FormulaDebugger<'_>,
        variables: &MapVariables,
    ) -> io::Result<()> {
        let reference = args
            .as_ref()
            .and_then(|v| v.get("variablesReference"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let listed: Vec<Value> = match reference {
            VARIABLES_REF => variables
                .iter()
                .map(|(name, value)| {
                    json!({
                        "name": name,
                        "value": value.to_debug_string(),
                        "type": value.type_name(),
                        "variablesReference": 0
                    })
                })
                .collect(),
            TRACE_REF => debugger
                .get_execution_trace()
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    let line = render_execution_trace(std::slice::from_ref(entry));
                    json!({
                        "name": index.to_string(),
                        "value": line.trim_end(),
                        "variablesReference": 0
                    })
                })
                .collect(),
            _ => Vec::new(),
        };
        self.send_response(seq, command, true, Some(json!({ "variables": listed })))
    }

    fn handle_evaluate(
        &mut self,
        seq: u64,
        command: String,
        args: Option<Value>,
        variables: &MapVariables,
    ) -> io::Result<()> {
        let expression = args
            .as_ref()
            .and_then(|v| v.get("expression"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let outcome = parse_formula(expression)
            .map_err(|err| err.to_string())
            .and_then(|node| node.evaluate(variables).map_err(|err| err.to_string()));
        match outcome {
            Ok(value) => {
                let body = json!({ "result": value.to_debug_string(), "variablesReference": 0 });
                self.send_response(seq, command, true, Some(body))
            }
            Err(message) => self.send_error(seq, command, &message),
        }
    }

    fn handle_step(
        &mut self,
        seq: u64,
        command: String,
        debugger: &mut FormulaDebugger<'_>,
    ) -> io::Result<()> {
        let Some(mode) = RunMode::from_command(&command) else {
            return self.send_error(seq, command, "unknown step command");
        };
        if debugger.is_finished() {
            return self.send_error(seq, command, "debug session already finished");
        }

        let body = (mode == RunMode::Continue).then(|| json!({ "allThreadsContinued": true }));
        self.send_response(seq, command, true, body)?;
        if let Err(err) = debugger.run(mode) {
            debug!(%err, ?mode, "step stopped on an error");
        }
        self.report_stop(debugger, "step")
    }

    /// Tell the client where the debugger ended up after a command.
    fn report_stop(&mut self, debugger: &FormulaDebugger<'_>, reason: &str) -> io::Result<()> {
        match debugger.state() {
            DebugState::Finished => {
                let output = match debugger.result() {
                    Some(value) => format!("{}\n", value.to_debug_string()),
                    None => "\n".to_string(),
                };
                self.send_event("output", Some(json!({ "category": "stdout", "output": output })))?;
                self.send_event("terminated", None)
            }
            DebugState::Failed => {
                let output = match debugger.failure() {
                    Some(err) => format!("{err}\n"),
                    None => "evaluation failed\n".to_string(),
                };
                self.send_event("output", Some(json!({ "category": "stderr", "output": output })))?;
                self.send_event("terminated", None)
            }
            DebugState::Idle | DebugState::Running | DebugState::Suspended => {
                let description = debugger
                    .get_current_breakpoint()
                    .map_or("", |bp| bp.name());
                self.send_event(
                    "stopped",
                    Some(json!({
                        "reason": reason,
                        "description": description,
                        "threadId": THREAD_ID,
                        "allThreadsStopped": true
                    })),
                )
            }
        }
    }

    fn abort_launch(&mut self, message: &str) -> io::Result<Flow> {
        warn!(%message, "launch failed");
        self.send_event(
            "output",
            Some(json!({ "category": "stderr", "output": format!("{message}\n") })),
        )?;
        self.send_event("terminated", None)?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn script(requests: &[(&str, Option<Value>)]) -> Cursor<Vec<u8>> {
        let mut input = Vec::new();
        for (seq, (command, arguments)) in requests.iter().enumerate() {
            let msg = DapMessage::request(seq as u64 + 1, *command, arguments.clone());
            write_message(&mut input, &msg).expect("write");
        }
        Cursor::new(input)
    }

    fn replies(output: Vec<u8>) -> Vec<Value> {
        let mut reader = Cursor::new(output);
        let mut messages = Vec::new();
        while let Some(msg) = read_message(&mut reader).expect("read") {
            messages.push(serde_json::to_value(&msg).expect("json"));
        }
        messages
    }

    fn events(messages: &[Value]) -> Vec<&str> {
        messages
            .iter()
            .filter_map(|m| m.get("event").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn launch_stops_on_entry_then_continues_to_the_end() {
        let mut input = script(&[
            ("initialize", None),
            ("launch", Some(json!({ "formula": "x * 2", "variables": { "x": 21 } }))),
            ("configurationDone", None),
            ("stackTrace", Some(json!({ "threadId": 1 }))),
            ("continue", Some(json!({ "threadId": 1 }))),
            ("disconnect", None),
        ]);
        let mut server = DapServer::new(Vec::new());
        server.run(&mut input).expect("run");
        let messages = replies(server.into_writer());

        assert_eq!(
            events(&messages),
            vec!["initialized", "stopped", "output", "terminated"]
        );
        let stack = messages
            .iter()
            .find(|m| m["command"] == "stackTrace")
            .expect("stackTrace response");
        assert_eq!(stack["body"]["stackFrames"][0]["name"], "*: (x * 2)");
        let output = messages
            .iter()
            .find(|m| m["event"] == "output")
            .expect("output event");
        assert_eq!(output["body"]["output"], "42\n");
    }

    #[test]
    fn requests_before_launch_fail_cleanly() {
        let mut input = script(&[("stackTrace", None), ("disconnect", None)]);
        let mut server = DapServer::new(Vec::new());
        server.run(&mut input).expect("run");
        let messages = replies(server.into_writer());
        assert_eq!(messages[0]["success"], false);
        assert_eq!(messages[1]["command"], "disconnect");
    }

    #[test]
    fn parse_errors_terminate_the_launch() {
        let mut input = script(&[
            ("launch", Some(json!({ "formula": "1 +" }))),
            ("configurationDone", None),
            ("disconnect", None),
        ]);
        let mut server = DapServer::new(Vec::new());
        server.run(&mut input).expect("run");
        let messages = replies(server.into_writer());
        assert_eq!(events(&messages), vec!["output", "terminated"]);
    }

    #[test]
    fn deeply_nested_formula_is_rejected_at_launch() {
        let formula = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let mut input = script(&[
            ("launch", Some(json!({ "formula": formula }))),
            ("configurationDone", None),
            ("threads", None),
            ("disconnect", None),
        ]);
        let mut server = DapServer::new(Vec::new());
        server.run(&mut input).expect("run");
        let messages = replies(server.into_writer());

        assert_eq!(events(&messages), vec!["output", "terminated"]);
        let output = messages
            .iter()
            .find(|m| m["event"] == "output")
            .expect("output event");
        assert_eq!(output["body"]["category"], "stderr");
        assert!(output["body"]["output"]
            .as_str()
            .unwrap_or_default()
            .contains("nests deeper than"));
        let threads = messages
            .iter()
            .find(|m| m["command"] == "threads")
            .expect("threads response");
        assert_eq!(threads["success"], true);
    }

    #[test]
    fn evaluate_and_trace_scope() {
        let mut input = script(&[
            ("launch", Some(json!({ "formula": "1 + y", "variables": { "y": 2 } }))),
            ("configurationDone", None),
            ("stepIn", Some(json!({ "threadId": 1 }))),
            ("evaluate", Some(json!({ "expression": "y * 10" }))),
            ("variables", Some(json!({ "variablesReference": 2 }))),
            ("variables", Some(json!({ "variablesReference": 1 }))),
            ("disconnect", None),
        ]);
        let mut server = DapServer::new(Vec::new());
        server.run(&mut input).expect("run");
        let messages = replies(server.into_writer());

        let evaluate = messages
            .iter()
            .find(|m| m["command"] == "evaluate")
            .expect("evaluate response");
        assert_eq!(evaluate["body"]["result"], "20");

        let listings: Vec<&Value> = messages
            .iter()
            .filter(|m| m["command"] == "variables")
            .collect();
        assert_eq!(listings[0]["body"]["variables"][1]["value"], "  #2: \"1\": (1)");
        assert_eq!(listings[1]["body"]["variables"][0]["name"], "y");
        assert_eq!(listings[1]["body"]["variables"][0]["value"], "2");
    }
}
