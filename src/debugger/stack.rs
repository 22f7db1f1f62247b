use crate::error::{DebugError, DebugResult};
use crate::parser::ExpressionNode;
use crate::value::Value;

/// Activation record for one node on the call stack.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFrame<'f> {
    counter: u64,
    level: usize,
    node: &'f ExpressionNode,
    result: Option<Value>,
}

impl<'f> EvaluationFrame<'f> {
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Nesting depth of this frame; the root is level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn name(&self) -> &'f str {
        self.node.name()
    }

    pub fn source_text(&self) -> &'f str {
        self.node.source_text()
    }

    pub fn node(&self) -> &'f ExpressionNode {
        self.node
    }

    /// Whether the node has produced its value and is about to be left.
    pub fn evaluated(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn value(&self) -> Option<String> {
        self.result.as_ref().map(Value::to_debug_string)
    }

    pub(crate) fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }
}

/// Frames of the nodes currently being evaluated, outermost first.
#[derive(Debug, Default)]
pub struct CallStack<'f> {
    frames: Vec<EvaluationFrame<'f>>,
    last_counter: u64,
}

impl<'f> CallStack<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a frame for `node` with a counter never handed out before.
    pub fn push(&mut self, node: &'f ExpressionNode) -> &EvaluationFrame<'f> {
        self.last_counter += 1;
        let level = self.frames.len();
        self.frames.push(EvaluationFrame {
            counter: self.last_counter,
            level,
            node,
            result: None,
        });
        &self.frames[level]
    }

    pub fn pop(&mut self) -> DebugResult<EvaluationFrame<'f>> {
        self.frames.pop().ok_or(DebugError::StackUnderflow)
    }

    pub fn frames(&self) -> &[EvaluationFrame<'f>] {
        &self.frames
    }

    pub fn top(&self) -> Option<&EvaluationFrame<'f>> {
        self.frames.last()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut EvaluationFrame<'f>> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames still waiting for their value. An evaluated frame only lingers on top.
    pub fn live_depth(&self) -> usize {
        match self.top() {
            Some(top) if top.evaluated() => self.frames.len() - 1,
            _ => self.frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
