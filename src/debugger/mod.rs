mod breakpoints;
mod controller;
mod render;
mod session;
mod stack;
mod stepping;
mod trace;

pub use breakpoints::Breakpoint;
pub use controller::{DebugState, FormulaDebugger};
pub use render::{render_call_stack, render_execution_trace, render_state};
pub use session::DebugSession;
pub use stack::{CallStack, EvaluationFrame};
pub use stepping::{EventKind, RunMode, StepEvent};
pub use trace::{ExecutionTrace, TraceEntry};
