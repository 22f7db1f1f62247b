use super::stack::CallStack;
use super::stepping::{EventKind, StepEvent};

/// The rule deciding where evaluation suspends next. Only one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    StepInto,
    /// Suspend when the innermost of the `depth` frames live at set time is left.
    StepOut { depth: usize },
    /// Suspend at the next event at exactly `depth`.
    Next { depth: usize },
    ContinueToEnd,
    /// Evaluation is complete.
    End,
}

impl Breakpoint {
    pub fn step_out(stack: &CallStack<'_>) -> Self {
        Breakpoint::StepOut {
            depth: stack.live_depth(),
        }
    }

    pub fn next(stack: &CallStack<'_>) -> Self {
        Breakpoint::Next {
            depth: stack.depth(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Breakpoint::StepInto => "Step into",
            Breakpoint::StepOut { .. } => "Step out",
            Breakpoint::Next { .. } => "Next",
            Breakpoint::ContinueToEnd => "Continue",
            Breakpoint::End => "End",
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Breakpoint::End)
    }

    pub fn is_break_now(&self, event: StepEvent) -> bool {
        match *self {
            Breakpoint::StepInto => true,
            // Leaving the root is completion, not a return into a caller.
            Breakpoint::StepOut { depth } => {
                let resulting = event.depth.saturating_sub(1);
                event.kind == EventKind::Exit && resulting < depth && resulting > 0
            }
            Breakpoint::Next { depth } => event.depth == depth,
            Breakpoint::ContinueToEnd | Breakpoint::End => false,
        }
    }
}
