use crate::debugger::{
    render_call_stack, render_execution_trace, render_state, DebugState, FormulaDebugger, RunMode,
};
use crate::parser::parse_formula;
use std::io::{self, BufRead, Write};
use tracing::debug;

const HELP: &str = "Commands: (s)tep/stepIn, (o)ut/stepOut, (n)ext, (c)ontinue, stack, trace, (p)rint \"<formula>\", (q)uit";

/// Drive a debugger from typed commands until the formula finishes or the user quits.
///
/// An empty line steps into. Lines are split with shell quoting, so a formula given to
/// `print` that contains string literals must be wrapped in double quotes.
pub fn run_interactive<R: BufRead, W: Write>(
    debugger: &mut FormulaDebugger<'_>,
    stop_on_entry: bool,
    mut input: R,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "🐞 Debugging: {}", debugger.formula().source_text())?;
    if let Err(err) = debugger.launch(stop_on_entry) {
        debug!(%err, "launch stopped on an error");
    }

    'run: loop {
        match debugger.state() {
            DebugState::Finished => {
                print_views(debugger, out)?;
                match debugger.result() {
                    Some(value) => writeln!(out, "\n✅ Result: {}", value.to_debug_string())?,
                    None => writeln!(out, "\n✅ Evaluation completed")?,
                }
                break 'run;
            }
            DebugState::Failed => {
                print_views(debugger, out)?;
                match debugger.failure() {
                    Some(err) => writeln!(out, "\n❌ Evaluation failed: {err}")?,
                    None => writeln!(out, "\n❌ Evaluation failed")?,
                }
                break 'run;
            }
            DebugState::Idle | DebugState::Running | DebugState::Suspended => {}
        }

        writeln!(
            out,
            "\n🔍 Stopped ({})",
            render_state(debugger.get_current_breakpoint())
        )?;
        print_views(debugger, out)?;

        'prompt: loop {
            writeln!(out, "\n{HELP}")?;
            write!(out, "> ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                debug!("input closed");
                break 'run;
            }

            let Some(words) = shlex::split(line.trim()) else {
                writeln!(out, "❌ Unbalanced quotes")?;
                continue 'prompt;
            };
            let (command, args) = match words.split_first() {
                Some((command, args)) => (command.as_str(), args),
                None => ("", &[][..]),
            };

            let mode = match command {
                "" => Some(RunMode::StepInto),
                other => RunMode::from_command(other),
            };
            if let Some(mode) = mode {
                debug!(?mode, "command");
                if let Err(err) = debugger.run(mode) {
                    debug!(%err, ?mode, "command stopped on an error");
                }
                break 'prompt;
            }

            match command {
                "stack" => {
                    write!(out, "{}", render_call_stack(debugger.get_call_stack()))?;
                }
                "trace" => {
                    write!(out, "{}", render_execution_trace(debugger.get_execution_trace()))?;
                }
                "p" | "print" => print_formula(debugger, &args.join(" "), out)?,
                "q" | "quit" => break 'run,
                "h" | "help" => {}
                other => writeln!(out, "❓ Unknown command: {other}")?,
            }
        }
    }

    Ok(())
}

fn print_views<W: Write>(debugger: &FormulaDebugger<'_>, out: &mut W) -> io::Result<()> {
    let stack = debugger.get_call_stack();
    if stack.is_empty() {
        writeln!(out, "\n=== Call Stack: <empty> ===")?;
    } else {
        writeln!(out, "\n=== Call Stack ({} frames) ===", stack.len())?;
        write!(out, "{}", render_call_stack(stack))?;
    }
    writeln!(out, "\n=== Execution Trace ===")?;
    write!(out, "{}", render_execution_trace(debugger.get_execution_trace()))
}

/// Evaluate `formula` against the session's variables without stepping.
fn print_formula<W: Write>(
    debugger: &FormulaDebugger<'_>,
    formula: &str,
    out: &mut W,
) -> io::Result<()> {
    if formula.trim().is_empty() {
        return writeln!(out, "❌ Usage: print \"<formula>\"");
    }
    match parse_formula(formula) {
        Ok(node) => match node.evaluate(debugger.variables()) {
            Ok(value) => writeln!(out, "{}", value.to_debug_string()),
            Err(err) => writeln!(out, "❌ {err}"),
        },
        Err(err) => writeln!(out, "❌ {err}"),
    }
}
