//! Plain-text views of a debugger, one line per frame or trace entry.

use super::breakpoints::Breakpoint;
use super::stack::EvaluationFrame;
use super::trace::TraceEntry;
use std::fmt::Write;

const INDENT: &str = "  ";

/// Outermost frame first, each nested frame indented one step further.
pub fn render_call_stack(frames: &[EvaluationFrame<'_>]) -> String {
    let mut out = String::new();
    for (depth, frame) in frames.iter().enumerate() {
        push_indent(&mut out, depth);
        let _ = write!(
            out,
            "#{}: \"{}\": ({})",
            frame.counter(),
            frame.name(),
            frame.source_text()
        );
        if let Some(value) = frame.value() {
            let _ = write!(out, " = {value}");
        }
        out.push('\n');
    }
    out
}

pub fn render_execution_trace(entries: &[TraceEntry<'_>]) -> String {
    let mut out = String::new();
    for entry in entries {
        push_indent(&mut out, entry.level());
        let _ = write!(
            out,
            "#{}: \"{}\": ({})",
            entry.counter(),
            entry.name(),
            entry.source_text()
        );
        if let Some(value) = entry.value() {
            let _ = write!(out, " = {value}");
        }
        out.push('\n');
    }
    out
}

/// The current breakpoint's name, or an empty label before the first stop.
pub fn render_state(current: Option<Breakpoint>) -> &'static str {
    current.map_or("", |bp| bp.name())
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::DebugSession;
    use crate::executor::MapVariables;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;

    #[test]
    fn trace_is_indented_by_level() {
        let node = parse_formula("(1 + 2) * 3").expect("parse");
        let vars = MapVariables::new();
        let mut session = DebugSession::new();
        node.evaluate_traced(&vars, &mut session).expect("evaluate");

        let expected = "\
#1: \"*\": ((1 + 2) * 3)
  #2: \"+\": (1 + 2)
    #3: \"1\": (1)
    #3: \"1\": (1) = 1
    #4: \"2\": (2)
    #4: \"2\": (2) = 2
  #2: \"+\": (1 + 2) = 3
  #5: \"3\": (3)
  #5: \"3\": (3) = 3
#1: \"*\": ((1 + 2) * 3) = 9
";
        assert_eq!(render_execution_trace(session.trace()), expected);
    }

    #[test]
    fn empty_views_render_empty() {
        assert_eq!(render_call_stack(&[]), "");
        assert_eq!(render_execution_trace(&[]), "");
        assert_eq!(render_state(None), "");
        assert_eq!(render_state(Some(Breakpoint::End)), "End");
    }
}
