/// Run modes for the debugger, one per control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Continue,
    StepOver,
    StepInto,
    StepOut,
}

impl RunMode {
    /// Parse the command names used by the terminal front end and DAP clients.
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "c" | "continue" => Some(RunMode::Continue),
            "n" | "next" | "stepOver" => Some(RunMode::StepOver),
            "s" | "step" | "stepIn" | "stepInto" => Some(RunMode::StepInto),
            "o" | "out" | "stepOut" => Some(RunMode::StepOut),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Enter,
    Exit,
}

/// An entry or exit, with the stack depth counting the event's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEvent {
    pub kind: EventKind,
    pub depth: usize,
}

impl StepEvent {
    pub fn enter(depth: usize) -> Self {
        Self {
            kind: EventKind::Enter,
            depth,
        }
    }

    pub fn exit(depth: usize) -> Self {
        Self {
            kind: EventKind::Exit,
            depth,
        }
    }
}
