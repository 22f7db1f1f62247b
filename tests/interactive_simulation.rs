// Simulates interactive and DAP debugging sessions over in-memory streams

use formula_debugger::dap::{write_message, DapMessage, DapServer};
use formula_debugger::debugger::{DebugState, FormulaDebugger};
use formula_debugger::executor::{run_interactive, MapVariables};
use formula_debugger::parser::parse_formula;
use formula_debugger::value::Value;
use serde_json::{json, Value as Json};
use std::io::Cursor;

#[cfg(test)]
mod interactive_tests {
    use super::*;

    fn simulate(formula: &str, vars: &MapVariables, script: &str) -> (String, DebugState) {
        let node = parse_formula(formula).expect("parse");
        let mut debugger = FormulaDebugger::new(&node, vars);
        let mut out = Vec::new();
        run_interactive(&mut debugger, true, Cursor::new(script), &mut out).expect("run");
        let state = debugger.state();
        (String::from_utf8(out).expect("utf8"), state)
    }

    #[test]
    fn test_step_into_simulation() {
        let (out, state) = simulate("(1 + 2) * 3", &MapVariables::new(), "s\ns\ns\n");

        // Four stops: launch plus three steps, the last one at the exit of `1`.
        assert_eq!(out.matches("🔍 Stopped (Step into)").count(), 4);
        assert!(out.contains("=== Call Stack (3 frames) ==="));
        assert!(out.contains("    #3: \"1\": (1) = 1\n"));
        assert_eq!(state, DebugState::Suspended);
    }

    #[test]
    fn test_step_out_simulation() {
        let (out, state) = simulate("1 + max(2, 3)", &MapVariables::new(), "s\ns\ns\nout\nc\n");

        assert!(out.contains("🔍 Stopped (Step out)"));
        assert!(out.contains("  #3: \"max\": (max(2, 3)) = 3\n"));
        assert!(out.contains("✅ Result: 4"));
        assert_eq!(state, DebugState::Finished);
    }

    #[test]
    fn test_next_simulation() {
        let (out, _) = simulate("[1 + 2, 3]", &MapVariables::new(), "s\nn\nn\nq\n");
        assert_eq!(out.matches("🔍 Stopped (Next)").count(), 2);
        assert!(out.contains("  #2: \"+\": (1 + 2) = 3\n"));
    }

    #[test]
    fn test_variables_and_print() {
        let vars = MapVariables::new()
            .with("hp", Value::Int(12))
            .with("name", Value::String("Konrad".into()));
        let (out, state) = simulate(
            "if(hp > 10, name + ' is fine', 'hurt')",
            &vars,
            "print \"name + '!'\"\ntrace\ncontinue\n",
        );

        assert!(out.contains("> 'Konrad!'\n"));
        assert!(out.contains("✅ Result: 'Konrad is fine'"));
        assert_eq!(state, DebugState::Finished);
    }

    #[test]
    fn test_failure_simulation() {
        let (out, state) = simulate("sum([1, 'a']) * 2", &MapVariables::new(), "c\n");
        assert!(out.contains("❌ Evaluation failed: "));
        assert!(out.contains("=== Call Stack (2 frames) ==="));
        assert_eq!(state, DebugState::Failed);
    }
}

#[cfg(test)]
mod dap_tests {
    use super::*;

    fn session(requests: Vec<(&str, Option<Json>)>) -> Vec<Json> {
        let mut input = Vec::new();
        for (seq, (command, arguments)) in requests.into_iter().enumerate() {
            let msg = DapMessage::request(seq as u64 + 1, command, arguments);
            write_message(&mut input, &msg).expect("write");
        }

        let mut server = DapServer::new(Vec::new());
        server.run(&mut Cursor::new(input)).expect("run");
        let output = String::from_utf8(server.into_writer()).expect("utf8");

        output
            .split("Content-Length: ")
            .filter(|frame| !frame.is_empty())
            .map(|frame| {
                let (_, body) = frame.split_once("\r\n\r\n").expect("header");
                serde_json::from_str(body).expect("json")
            })
            .collect()
    }

    fn stop_reasons(messages: &[Json]) -> Vec<String> {
        messages
            .iter()
            .filter(|m| m["event"] == "stopped")
            .map(|m| m["body"]["reason"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_full_dap_session() {
        let messages = session(vec![
            ("initialize", Some(json!({ "adapterID": "formula" }))),
            ("launch", Some(json!({ "formula": "(1 + 2) * 3" }))),
            ("setBreakpoints", Some(json!({ "breakpoints": [{ "line": 1 }] }))),
            ("configurationDone", None),
            ("stepIn", Some(json!({ "threadId": 1 }))),
            ("stepOut", Some(json!({ "threadId": 1 }))),
            ("stackTrace", Some(json!({ "threadId": 1 }))),
            ("next", Some(json!({ "threadId": 1 }))),
            ("continue", Some(json!({ "threadId": 1 }))),
            ("continue", Some(json!({ "threadId": 1 }))),
            ("disconnect", None),
        ]);

        let initialize = &messages[0];
        assert_eq!(initialize["body"]["supportsConfigurationDoneRequest"], true);

        let breakpoints = messages
            .iter()
            .find(|m| m["command"] == "setBreakpoints")
            .expect("setBreakpoints response");
        assert_eq!(breakpoints["body"]["breakpoints"][0]["verified"], false);

        assert_eq!(stop_reasons(&messages), vec!["entry", "step", "step", "step"]);

        let stack = messages
            .iter()
            .find(|m| m["command"] == "stackTrace")
            .expect("stackTrace response");
        let frames = stack["body"]["stackFrames"].as_array().expect("frames");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["id"], 2);
        assert_eq!(frames[0]["name"], "+: (1 + 2) = 3");
        assert_eq!(frames[1]["id"], 1);

        let output = messages
            .iter()
            .find(|m| m["event"] == "output")
            .expect("output event");
        assert_eq!(output["body"]["output"], "9\n");

        let continues: Vec<&Json> = messages
            .iter()
            .filter(|m| m["command"] == "continue")
            .collect();
        assert_eq!(continues[0]["success"], true);
        assert_eq!(continues[1]["success"], false);

        let last = messages.last().expect("messages");
        assert_eq!(last["command"], "disconnect");
    }

    #[test]
    fn test_launch_without_stop_on_entry() {
        let messages = session(vec![
            ("launch", Some(json!({ "formula": "abs(x)", "variables": { "x": -3 }, "stopOnEntry": false }))),
            ("configurationDone", None),
            ("disconnect", None),
        ]);

        assert!(stop_reasons(&messages).is_empty());
        let events: Vec<&str> = messages
            .iter()
            .filter_map(|m| m["event"].as_str())
            .collect();
        assert_eq!(events, vec!["output", "terminated"]);
        let output = messages
            .iter()
            .find(|m| m["event"] == "output")
            .expect("output event");
        assert_eq!(output["body"]["output"], "3\n");
    }

    #[test]
    fn test_evaluation_error_is_reported() {
        let messages = session(vec![
            ("launch", Some(json!({ "formula": "1 + nope", "stopOnEntry": false }))),
            ("configurationDone", None),
            ("disconnect", None),
        ]);
        let output = messages
            .iter()
            .find(|m| m["event"] == "output")
            .expect("output event");
        assert_eq!(output["body"]["category"], "stderr");
        assert!(output["body"]["output"]
            .as_str()
            .unwrap_or_default()
            .contains("undefined variable 'nope'"));
    }
}
