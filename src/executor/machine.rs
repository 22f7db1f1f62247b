use super::functions::Function;
use super::variables::Variables;
use crate::error::EvaluationError;
use crate::parser::{BinaryOp, ExpressionNode, NodeKind, UnaryOp};
use crate::value::Value;

/// One observable point in the evaluation of a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<'f> {
    /// `node` starts evaluating; it is now the innermost active node.
    Enter(&'f ExpressionNode),
    /// `node` produced its value. It stays innermost until the next step.
    Exit(&'f ExpressionNode, Value),
    /// The root node has been left; no further events follow.
    Complete(Value),
}

struct Activation<'f> {
    node: &'f ExpressionNode,
    values: Vec<Value>,
    /// Child whose value was appended to `values` most recently.
    last: Option<usize>,
    /// Child currently being evaluated.
    pending: Option<usize>,
    result: Option<Value>,
}

impl<'f> Activation<'f> {
    fn new(node: &'f ExpressionNode) -> Self {
        Self {
            node,
            values: Vec::with_capacity(node.children().len()),
            last: None,
            pending: None,
            result: None,
        }
    }

    fn accept(&mut self, value: Value) {
        self.values.push(value);
        self.last = self.pending.take();
    }
}

enum Plan {
    Child(usize),
    Done(Value),
}

/// Resumable evaluation of a borrowed formula tree.
///
/// Each call to [`Evaluation::step`] performs the smallest amount of work that produces
/// one [`Step`], so a caller can stop between any two events and pick up later.
pub struct Evaluation<'f> {
    root: &'f ExpressionNode,
    stack: Vec<Activation<'f>>,
    started: bool,
    outcome: Option<Value>,
}

impl<'f> Evaluation<'f> {
    pub fn new(root: &'f ExpressionNode) -> Self {
        Self {
            root,
            stack: Vec::new(),
            started: false,
            outcome: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn step(&mut self, variables: &dyn Variables) -> Result<Step<'f>, EvaluationError> {
        if let Some(value) = &self.outcome {
            return Ok(Step::Complete(value.clone()));
        }

        if !self.started {
            self.started = true;
            self.stack.push(Activation::new(self.root));
            return Ok(Step::Enter(self.root));
        }

        // Leave the node that exited on the previous step.
        if let Some(value) = self.stack.last_mut().and_then(|top| top.result.take()) {
            self.stack.pop();
            match self.stack.last_mut() {
                Some(parent) => parent.accept(value),
                None => {
                    self.outcome = Some(value.clone());
                    return Ok(Step::Complete(value));
                }
            }
        }

        let Some(top) = self.stack.last_mut() else {
            return Err(EvaluationError::StackExhausted);
        };
        let node = top.node;
        match plan(top, variables)? {
            Plan::Child(index) => {
                top.pending = Some(index);
                let child = &node.children()[index];
                self.stack.push(Activation::new(child));
                Ok(Step::Enter(child))
            }
            Plan::Done(value) => {
                top.result = Some(value.clone());
                Ok(Step::Exit(node, value))
            }
        }
    }

    /// Step until the formula is fully evaluated.
    pub fn run(&mut self, variables: &dyn Variables) -> Result<Value, EvaluationError> {
        loop {
            if let Step::Complete(value) = self.step(variables)? {
                return Ok(value);
            }
        }
    }
}

fn plan(act: &Activation<'_>, variables: &dyn Variables) -> Result<Plan, EvaluationError> {
    let node = act.node;
    let value = match node.kind() {
        NodeKind::Integer(n) => Value::Int(*n),
        NodeKind::Decimal(d) => Value::Decimal(*d),
        NodeKind::String(s) => Value::String(s.clone()),
        NodeKind::Identifier(name) => variables
            .get(name)
            .ok_or_else(|| EvaluationError::UndefinedVariable(name.clone()))?,
        NodeKind::Binary(op) if op.is_short_circuit() => return Ok(plan_logical(*op, act)),
        NodeKind::Call(Function::If) => return Ok(plan_if(act, node.children().len())),
        _ if act.values.len() < node.children().len() => {
            return Ok(Plan::Child(act.values.len()));
        }
        NodeKind::List => Value::List(act.values.clone()),
        NodeKind::Unary(UnaryOp::Neg) => act.values[0].neg()?,
        NodeKind::Unary(UnaryOp::Not) => Value::from_bool(!act.values[0].is_truthy()),
        NodeKind::Binary(op) => binary(*op, &act.values[0], &act.values[1])?,
        NodeKind::Call(function) => function.apply(&act.values)?,
    };
    Ok(Plan::Done(value))
}

fn plan_logical(op: BinaryOp, act: &Activation<'_>) -> Plan {
    match (act.last, act.values.as_slice()) {
        (None, _) => Plan::Child(0),
        (Some(0), [left]) => {
            let left = left.is_truthy();
            let decided = match op {
                BinaryOp::And => !left,
                _ => left,
            };
            if decided {
                Plan::Done(Value::from_bool(left))
            } else {
                Plan::Child(1)
            }
        }
        (_, values) => Plan::Done(Value::from_bool(
            values.last().is_some_and(Value::is_truthy),
        )),
    }
}

/// Children alternate condition / value; an odd trailing child is the else branch.
fn plan_if(act: &Activation<'_>, arg_count: usize) -> Plan {
    let Some(last) = act.last else {
        return Plan::Child(0);
    };
    let value = act.values.last().cloned().unwrap_or(Value::Null);
    let is_condition = last % 2 == 0 && last + 1 < arg_count;
    if !is_condition {
        return Plan::Done(value);
    }
    if value.is_truthy() {
        Plan::Child(last + 1)
    } else if last + 2 < arg_count {
        Plan::Child(last + 2)
    } else {
        Plan::Done(Value::Null)
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    use std::cmp::Ordering::{Greater, Less};

    let symbol = op.symbol();
    match op {
        BinaryOp::Add => left.add(right),
        BinaryOp::Sub => left.sub(right),
        BinaryOp::Mul => left.mul(right),
        BinaryOp::Div => left.div(right),
        BinaryOp::Rem => left.rem(right),
        BinaryOp::Pow => left.pow(right),
        BinaryOp::Eq => Ok(Value::from_bool(left.loose_eq(right))),
        BinaryOp::Ne => Ok(Value::from_bool(!left.loose_eq(right))),
        BinaryOp::Lt => Ok(Value::from_bool(left.compare(right, symbol)? == Less)),
        BinaryOp::Le => Ok(Value::from_bool(left.compare(right, symbol)? != Greater)),
        BinaryOp::Gt => Ok(Value::from_bool(left.compare(right, symbol)? == Greater)),
        BinaryOp::Ge => Ok(Value::from_bool(left.compare(right, symbol)? != Less)),
        BinaryOp::And | BinaryOp::Or => Ok(Value::from_bool(right.is_truthy())),
    }
}
