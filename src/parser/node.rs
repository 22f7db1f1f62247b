use super::types::Span;
use crate::debugger::DebugSession;
use crate::error::{DebugResult, EvaluationError};
use crate::executor::{Evaluation, Function, Step, Variables};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
        }
    }

    /// `and` / `or` only evaluate their right operand when the left does not decide.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Integer(i64),
    Decimal(f64),
    String(String),
    Identifier(String),
    List,
    Unary(UnaryOp),
    Binary(BinaryOp),
    Call(Function),
}

/// One parsed sub-expression. Immutable once the parser hands it out.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    kind: NodeKind,
    children: Vec<ExpressionNode>,
    text: String,
    span: Span,
    height: usize,
}

impl ExpressionNode {
    pub(crate) fn new(
        kind: NodeKind,
        children: Vec<ExpressionNode>,
        text: impl Into<String>,
        span: Span,
    ) -> Self {
        let height = 1 + children.iter().map(ExpressionNode::height).max().unwrap_or(0);
        Self {
            kind,
            children,
            text: text.into(),
            span,
            height,
        }
    }

    /// Widen the span to enclosing parentheses. The source text is left as is.
    pub(crate) fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[ExpressionNode] {
        &self.children
    }

    /// The formula text this node was parsed from.
    pub fn source_text(&self) -> &str {
        &self.text
    }

    /// Location in the formula, including any parentheses around this node.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Label shown in the call stack and trace: the literal, variable, operator or
    /// function name.
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Integer(_) | NodeKind::Decimal(_) | NodeKind::String(_) => &self.text,
            NodeKind::Identifier(name) => name,
            NodeKind::List => "[]",
            NodeKind::Unary(op) => op.symbol(),
            NodeKind::Binary(op) => op.symbol(),
            NodeKind::Call(function) => function.name(),
        }
    }

    /// Nodes on the longest path from here to a leaf, this node included.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ExpressionNode::node_count).sum::<usize>()
    }

    pub fn evaluate(&self, variables: &dyn Variables) -> Result<Value, EvaluationError> {
        Evaluation::new(self).run(variables)
    }

    /// Evaluate to completion while reporting every entry and exit to `session`.
    ///
    /// The session's breakpoints are not consulted; use `FormulaDebugger` for stepped
    /// execution.
    pub fn evaluate_traced<'f>(
        &'f self,
        variables: &dyn Variables,
        session: &mut DebugSession<'f>,
    ) -> DebugResult<Value> {
        let mut evaluation = Evaluation::new(self);
        loop {
            let step = evaluation.step(variables)?;
            session.observe(&step)?;
            if let Step::Complete(value) = step {
                return Ok(value);
            }
        }
    }
}
