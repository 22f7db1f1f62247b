use super::stack::EvaluationFrame;
use crate::parser::ExpressionNode;
use crate::value::Value;

/// One line of the execution trace: a node was entered, or it was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry<'f> {
    counter: u64,
    level: usize,
    node: &'f ExpressionNode,
    result: Option<Value>,
}

impl<'f> TraceEntry<'f> {
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn name(&self) -> &'f str {
        self.node.name()
    }

    pub fn source_text(&self) -> &'f str {
        self.node.source_text()
    }

    pub fn evaluated(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn value(&self) -> Option<String> {
        self.result.as_ref().map(Value::to_debug_string)
    }
}

/// Append-only history of every entry and exit in a session.
#[derive(Debug, Default)]
pub struct ExecutionTrace<'f> {
    entries: Vec<TraceEntry<'f>>,
}

impl<'f> ExecutionTrace<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enter(&mut self, frame: &EvaluationFrame<'f>) {
        self.push(frame, None);
    }

    /// Appends a separate entry; the matching enter entry is left untouched.
    pub fn record_result(&mut self, frame: &EvaluationFrame<'f>, result: Value) {
        self.push(frame, Some(result));
    }

    pub fn entries(&self) -> &[TraceEntry<'f>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, frame: &EvaluationFrame<'f>, result: Option<Value>) {
        self.entries.push(TraceEntry {
            counter: frame.counter(),
            level: frame.level(),
            node: frame.node(),
            result,
        });
    }
}
