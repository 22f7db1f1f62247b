use super::breakpoints::Breakpoint;
use super::stack::{CallStack, EvaluationFrame};
use super::stepping::StepEvent;
use super::trace::{ExecutionTrace, TraceEntry};
use crate::error::{DebugError, DebugResult};
use crate::executor::Step;
use crate::parser::ExpressionNode;
use tracing::trace;

/// State of one debug session: the live call stack, the trace so far and the
/// breakpoint rules.
#[derive(Debug, Default)]
pub struct DebugSession<'f> {
    call_stack: CallStack<'f>,
    trace: ExecutionTrace<'f>,
    active: Option<Breakpoint>,
    current: Option<Breakpoint>,
}

impl<'f> DebugSession<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_stack(&self) -> &CallStack<'f> {
        &self.call_stack
    }

    pub fn frames(&self) -> &[EvaluationFrame<'f>] {
        self.call_stack.frames()
    }

    pub fn trace(&self) -> &[TraceEntry<'f>] {
        self.trace.entries()
    }

    pub fn active_breakpoint(&self) -> Option<Breakpoint> {
        self.active
    }

    /// The breakpoint that last suspended evaluation, or `End` once complete.
    pub fn current_breakpoint(&self) -> Option<Breakpoint> {
        self.current
    }

    /// Replace the active breakpoint.
    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.active = Some(breakpoint);
    }

    pub(crate) fn set_current(&mut self, breakpoint: Option<Breakpoint>) {
        self.current = breakpoint;
    }

    pub fn should_suspend(&self, event: StepEvent) -> bool {
        self.active.is_some_and(|bp| bp.is_break_now(event))
    }

    /// Mirror one evaluator step onto the stack and trace.
    ///
    /// Returns the event to test against breakpoints, or `None` on completion.
    pub fn observe(&mut self, step: &Step<'f>) -> DebugResult<Option<StepEvent>> {
        self.leave_evaluated()?;
        match *step {
            Step::Enter(node) => {
                let frame = self.call_stack.push(node);
                trace!(counter = frame.counter(), name = frame.name(), "enter");
                self.trace.record_enter(frame);
                Ok(Some(StepEvent::enter(self.call_stack.depth())))
            }
            Step::Exit(node, ref value) => {
                let frame = self
                    .call_stack
                    .top_mut()
                    .ok_or(DebugError::StackUnderflow)?;
                ensure_same_node(frame.node(), node)?;
                frame.set_result(value.clone());
                trace!(counter = frame.counter(), name = frame.name(), "exit");
                self.trace.record_result(frame, value.clone());
                Ok(Some(StepEvent::exit(self.call_stack.depth())))
            }
            Step::Complete(_) => match self.call_stack.top() {
                Some(frame) => Err(DebugError::FrameMismatch {
                    expected: "empty call stack".to_string(),
                    found: frame.name().to_string(),
                }),
                None => Ok(None),
            },
        }
    }

    /// Pop the frame that exited on the previous event.
    fn leave_evaluated(&mut self) -> DebugResult<()> {
        if self.call_stack.top().is_some_and(EvaluationFrame::evaluated) {
            self.call_stack.pop()?;
        }
        Ok(())
    }
}

fn ensure_same_node(on_stack: &ExpressionNode, reported: &ExpressionNode) -> DebugResult<()> {
    if std::ptr::eq(on_stack, reported) {
        return Ok(());
    }
    Err(DebugError::FrameMismatch {
        expected: reported.name().to_string(),
        found: on_stack.name().to_string(),
    })
}
