use super::breakpoints::Breakpoint;
use super::session::DebugSession;
use super::stack::EvaluationFrame;
use super::stepping::{EventKind, RunMode, StepEvent};
use super::trace::TraceEntry;
use crate::error::{DebugError, DebugResult};
use crate::executor::{Evaluation, Step, Variables};
use crate::parser::ExpressionNode;
use crate::value::Value;
use tracing::{debug, info, warn};

/// Lifecycle of a debugged evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugState {
    /// No command has been issued yet.
    Idle,
    Running,
    Suspended,
    /// Evaluation completed; the current breakpoint is `End`.
    Finished,
    /// Evaluation stopped on an error. Distinct from `Finished`.
    Failed,
}

impl DebugState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DebugState::Finished | DebugState::Failed)
    }
}

/// Drives one stepped evaluation of a formula.
///
/// Every command installs a breakpoint and runs the evaluator synchronously until that
/// breakpoint matches or evaluation ends. Between commands nothing changes, so the views
/// can be read at any time.
pub struct FormulaDebugger<'f> {
    formula: &'f ExpressionNode,
    variables: &'f dyn Variables,
    evaluation: Evaluation<'f>,
    session: DebugSession<'f>,
    state: DebugState,
    result: Option<Value>,
    failure: Option<DebugError>,
}

impl<'f> FormulaDebugger<'f> {
    pub fn new(formula: &'f ExpressionNode, variables: &'f dyn Variables) -> Self {
        Self {
            formula,
            variables,
            evaluation: Evaluation::new(formula),
            session: DebugSession::new(),
            state: DebugState::Idle,
            result: None,
            failure: None,
        }
    }

    pub fn get_call_stack(&self) -> &[EvaluationFrame<'f>] {
        self.session.frames()
    }

    pub fn get_execution_trace(&self) -> &[TraceEntry<'f>] {
        self.session.trace()
    }

    /// `None` before the first command and after a failure, `Some(End)` once complete.
    pub fn get_current_breakpoint(&self) -> Option<Breakpoint> {
        self.session.current_breakpoint()
    }

    pub fn session(&self) -> &DebugSession<'f> {
        &self.session
    }

    pub fn formula(&self) -> &'f ExpressionNode {
        self.formula
    }

    pub fn variables(&self) -> &'f dyn Variables {
        self.variables
    }

    pub fn state(&self) -> DebugState {
        self.state
    }

    /// Value of the formula, once evaluation has finished.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&DebugError> {
        self.failure.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn add_breakpoint_step_into(&mut self) -> DebugResult<()> {
        self.resume_with(Breakpoint::StepInto)
    }

    pub fn add_breakpoint_step_out(&mut self) -> DebugResult<()> {
        let breakpoint = Breakpoint::step_out(self.session.call_stack());
        self.resume_with(breakpoint)
    }

    pub fn add_breakpoint_next(&mut self) -> DebugResult<()> {
        let breakpoint = Breakpoint::next(self.session.call_stack());
        self.resume_with(breakpoint)
    }

    pub fn add_breakpoint_continue_to_end(&mut self) -> DebugResult<()> {
        self.resume_with(Breakpoint::ContinueToEnd)
    }

    pub fn run(&mut self, mode: RunMode) -> DebugResult<()> {
        match mode {
            RunMode::StepInto => self.add_breakpoint_step_into(),
            RunMode::StepOut => self.add_breakpoint_step_out(),
            RunMode::StepOver => self.add_breakpoint_next(),
            RunMode::Continue => self.add_breakpoint_continue_to_end(),
        }
    }

    /// Start evaluating. With `stop_on_entry` the first suspension is the root's entry.
    pub fn launch(&mut self, stop_on_entry: bool) -> DebugResult<()> {
        if stop_on_entry {
            self.run(RunMode::StepInto)
        } else {
            self.run(RunMode::Continue)
        }
    }

    fn resume_with(&mut self, breakpoint: Breakpoint) -> DebugResult<()> {
        if self.state.is_terminal() {
            return Err(DebugError::SessionFinished);
        }
        if self.state == DebugState::Idle {
            info!(formula = self.formula.source_text(), "debug session started");
        }
        debug!(breakpoint = breakpoint.name(), "resume");
        self.session.set_breakpoint(breakpoint);
        self.state = DebugState::Running;

        loop {
            let (step, event) = self.advance().map_err(|err| self.fail(err))?;
            match event {
                // Leaving the root runs straight into completion.
                Some(StepEvent {
                    kind: EventKind::Exit,
                    depth: 1,
                }) => continue,
                Some(event) if self.session.should_suspend(event) => {
                    self.session.set_current(Some(breakpoint));
                    self.state = DebugState::Suspended;
                    debug!(
                        breakpoint = breakpoint.name(),
                        depth = event.depth,
                        "suspended"
                    );
                    return Ok(());
                }
                Some(_) => continue,
                None => {
                    if let Step::Complete(value) = step {
                        info!(result = %value, "evaluation complete");
                        self.result = Some(value);
                    }
                    self.session.set_current(Some(Breakpoint::End));
                    self.state = DebugState::Finished;
                    return Ok(());
                }
            }
        }
    }

    fn advance(&mut self) -> DebugResult<(Step<'f>, Option<StepEvent>)> {
        let step = self.evaluation.step(self.variables)?;
        let event = self.session.observe(&step)?;
        Ok((step, event))
    }

    /// Abort into `Failed`, keeping the partial stack and trace.
    fn fail(&mut self, err: DebugError) -> DebugError {
        warn!(error = %err, depth = self.session.call_stack().depth(), "debug session failed");
        self.state = DebugState::Failed;
        self.session.set_current(None);
        self.failure = Some(err.clone());
        err
    }
}
