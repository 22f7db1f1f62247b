use formula_debugger::debugger::{Breakpoint, DebugSession, DebugState, FormulaDebugger, TraceEntry};
use formula_debugger::error::{DebugError, EvaluationError};
use formula_debugger::executor::MapVariables;
use formula_debugger::parser::{parse_formula, ExpressionNode};
use formula_debugger::value::Value;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn parse(formula: &str) -> ExpressionNode {
    parse_formula(formula).expect("formula should parse")
}

/// (counter, level, name, value) for each trace line.
fn trace_lines(entries: &[TraceEntry<'_>]) -> Vec<(u64, usize, String, Option<String>)> {
    entries
        .iter()
        .map(|e| (e.counter(), e.level(), e.name().to_string(), e.value()))
        .collect()
}

fn event_count(node: &ExpressionNode, vars: &MapVariables) -> usize {
    let mut session = DebugSession::new();
    node.evaluate_traced(vars, &mut session)
        .expect("formula should evaluate");
    session.trace().len()
}

#[cfg(test)]
mod debugger_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_continue_to_end_scenario() {
        let node = parse("(1 + 2) * 3");
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);

        debugger.launch(false).expect("launch");

        let some = |s: &str| Some(s.to_string());
        assert_eq!(
            trace_lines(debugger.get_execution_trace()),
            vec![
                (1, 0, "*".to_string(), None),
                (2, 1, "+".to_string(), None),
                (3, 2, "1".to_string(), None),
                (3, 2, "1".to_string(), some("1")),
                (4, 2, "2".to_string(), None),
                (4, 2, "2".to_string(), some("2")),
                (2, 1, "+".to_string(), some("3")),
                (5, 1, "3".to_string(), None),
                (5, 1, "3".to_string(), some("3")),
                (1, 0, "*".to_string(), some("9")),
            ]
        );
        assert!(debugger.get_call_stack().is_empty());
        assert_eq!(debugger.get_current_breakpoint(), Some(Breakpoint::End));
        assert_eq!(debugger.result(), Some(&Value::Int(9)));
    }

    #[test]
    fn test_step_into_event_count_reaches_end() {
        let node = parse("max(1, 2 * 3) - abs(-4)");
        let vars = MapVariables::new();
        let events = event_count(&node, &vars);
        assert_eq!(events, 2 * node.node_count());

        let mut debugger = FormulaDebugger::new(&node, &vars);
        for _ in 1..events {
            debugger.add_breakpoint_step_into().expect("step");
            assert_eq!(debugger.state(), DebugState::Suspended);
        }
        debugger.add_breakpoint_step_into().expect("last step");
        assert_eq!(debugger.state(), DebugState::Finished);
        assert_eq!(debugger.get_current_breakpoint(), Some(Breakpoint::End));
        assert!(debugger.get_call_stack().is_empty());
        assert_eq!(debugger.result(), Some(&Value::Int(2)));
    }

    #[test]
    fn test_step_out_at_top_level_runs_to_end() {
        let node = parse("if(1 > 0, 'yes', 'no')");
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);

        debugger.launch(true).expect("launch");
        assert_eq!(debugger.get_call_stack().len(), 1);
        debugger.add_breakpoint_step_out().expect("step out");

        assert_eq!(debugger.get_current_breakpoint(), Some(Breakpoint::End));
        assert_eq!(debugger.result(), Some(&Value::String("yes".into())));
        assert_eq!(debugger.get_execution_trace().len(), event_count(&node, &vars));
    }

    #[test]
    fn test_step_out_of_nested_call() {
        let node = parse("1 + max(2, 3 * 4)");
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);

        debugger.launch(true).expect("launch");
        // + -> 1 -> exit 1 -> max -> 2 -> exit 2 -> *
        for _ in 0..6 {
            debugger.add_breakpoint_step_into().expect("step");
        }
        let names: Vec<&str> = debugger.get_call_stack().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["+", "max", "*"]);

        debugger.add_breakpoint_step_out().expect("step out");
        let stack = debugger.get_call_stack();
        let names: Vec<&str> = stack.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["+", "max", "*"]);
        assert_eq!(stack[2].value(), Some("12".to_string()));

        debugger.add_breakpoint_step_out().expect("step out");
        let stack = debugger.get_call_stack();
        let names: Vec<&str> = stack.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["+", "max"]);
        assert_eq!(stack[1].value(), Some("12".to_string()));
    }

    #[test]
    fn test_next_skips_over_children() {
        let node = parse("[1 + 2, 3]");
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);

        debugger.launch(true).expect("launch");
        debugger.add_breakpoint_step_into().expect("step");
        assert_eq!(debugger.get_call_stack().len(), 2);

        debugger.add_breakpoint_next().expect("next");
        let top = debugger.get_call_stack().last().expect("frame");
        assert_eq!(top.name(), "+");
        assert_eq!(top.value(), Some("3".to_string()));

        debugger.add_breakpoint_next().expect("next");
        let top = debugger.get_call_stack().last().expect("frame");
        assert_eq!(top.name(), "3");
        assert!(!top.evaluated());
    }

    #[test]
    fn test_next_before_launch_runs_to_end() {
        let node = parse("2 ^ 10");
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);
        debugger.add_breakpoint_next().expect("next");
        assert_eq!(debugger.state(), DebugState::Finished);
        assert_eq!(debugger.result(), Some(&Value::Int(1024)));
    }

    #[test]
    fn test_failure_keeps_partial_views() {
        let node = parse("size([1, 2]) / (x - x)");
        let vars = MapVariables::new().with("x", Value::Int(3));
        let mut debugger = FormulaDebugger::new(&node, &vars);

        debugger.launch(true).expect("launch");
        let err = debugger
            .add_breakpoint_continue_to_end()
            .expect_err("division by zero");

        assert_eq!(
            err,
            DebugError::Evaluation(EvaluationError::DivisionByZero("/".into()))
        );
        assert_eq!(debugger.state(), DebugState::Failed);
        assert_eq!(debugger.get_current_breakpoint(), None);
        assert_eq!(debugger.result(), None);
        assert_eq!(debugger.get_call_stack()[0].name(), "/");
        assert!(!debugger.get_execution_trace().is_empty());

        let trace_len = debugger.get_execution_trace().len();
        assert_eq!(
            debugger.add_breakpoint_step_into(),
            Err(DebugError::SessionFinished)
        );
        assert_eq!(debugger.get_execution_trace().len(), trace_len);
    }

    #[test]
    fn test_commands_after_end_are_rejected() {
        let node = parse("'done'");
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);
        debugger.launch(false).expect("launch");

        for result in [
            debugger.add_breakpoint_step_into(),
            debugger.add_breakpoint_step_out(),
            debugger.add_breakpoint_next(),
            debugger.add_breakpoint_continue_to_end(),
        ] {
            assert_eq!(result, Err(DebugError::SessionFinished));
        }
        assert_eq!(debugger.get_current_breakpoint(), Some(Breakpoint::End));
    }

    #[test]
    fn test_short_circuit_is_visible_in_trace() {
        let node = parse("x > 0 or missing");
        let vars = MapVariables::new().with("x", Value::Int(1));
        let mut debugger = FormulaDebugger::new(&node, &vars);
        debugger.launch(false).expect("launch");

        let names: Vec<&str> = debugger
            .get_execution_trace()
            .iter()
            .filter(|e| !e.evaluated())
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["or", ">", "x", "0"]);
        assert_eq!(debugger.result(), Some(&Value::Int(1)));
    }
}

fn formula_strategy() -> impl Strategy<Value = String> {
    let leaf = (0i64..10).prop_map(|n| n.to_string());
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "and", "or", "<", "="]),
                inner.clone()
            )
                .prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, a, b)| format!("if({c}, {a}, {b})")),
            prop::collection::vec(inner, 1..4).prop_map(|items| format!("max({})", items.join(", "))),
        ]
    })
}

proptest! {
    #[test]
    fn prop_step_into_reaches_end_after_every_event(formula in formula_strategy()) {
        let node = parse(&formula);
        let vars = MapVariables::new();
        let events = event_count(&node, &vars);
        let mut debugger = FormulaDebugger::new(&node, &vars);
        let mut max_depth = 0;

        for step in 1..=events {
            debugger.add_breakpoint_step_into().expect("step");
            if step == events {
                break;
            }
            prop_assert_eq!(debugger.state(), DebugState::Suspended);

            let stack = debugger.get_call_stack();
            max_depth = max_depth.max(stack.len());
            for (index, frame) in stack.iter().enumerate() {
                prop_assert_eq!(frame.level(), index);
            }
            for pair in stack.windows(2) {
                prop_assert!(pair[0].counter() < pair[1].counter());
            }
            for entry in debugger.get_execution_trace() {
                prop_assert!(entry.level() < max_depth);
            }
        }

        prop_assert_eq!(debugger.state(), DebugState::Finished);
        prop_assert_eq!(debugger.get_current_breakpoint(), Some(Breakpoint::End));
        prop_assert!(debugger.get_call_stack().is_empty());
        prop_assert_eq!(debugger.result().cloned(), node.evaluate(&vars).ok());
    }

    #[test]
    fn prop_every_enter_has_one_result(formula in formula_strategy()) {
        let node = parse(&formula);
        let vars = MapVariables::new();
        let mut debugger = FormulaDebugger::new(&node, &vars);
        debugger.launch(false).expect("launch");

        let trace = debugger.get_execution_trace();
        let mut open: Vec<u64> = Vec::new();
        let mut last_counter = 0;
        for entry in trace {
            if entry.evaluated() {
                prop_assert_eq!(open.pop(), Some(entry.counter()));
            } else {
                prop_assert!(entry.counter() > last_counter);
                last_counter = entry.counter();
                prop_assert_eq!(entry.level(), open.len());
                open.push(entry.counter());
            }
        }
        prop_assert!(open.is_empty());
    }

    #[test]
    fn prop_step_out_at_top_level_matches_continue(formula in formula_strategy()) {
        let node = parse(&formula);
        let vars = MapVariables::new();

        let mut stepped = FormulaDebugger::new(&node, &vars);
        stepped.launch(true).expect("launch");
        stepped.add_breakpoint_step_out().expect("step out");

        let mut continued = FormulaDebugger::new(&node, &vars);
        continued.launch(true).expect("launch");
        continued.add_breakpoint_continue_to_end().expect("continue");

        prop_assert_eq!(stepped.state(), DebugState::Finished);
        prop_assert_eq!(
            trace_lines(stepped.get_execution_trace()),
            trace_lines(continued.get_execution_trace())
        );
        prop_assert_eq!(stepped.result(), continued.result());
    }
}
