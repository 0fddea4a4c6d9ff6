#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use strand_ir::{BinaryOp, Node, NodeId, NodeKind, Payload, Tree, TreeBuilder, UnaryOp};
use strand_runtime::{
    Classification, EvalContext, EvalError, Evaluator, Recurse, Runtime, RuntimeConfig,
    SharedState, Value,
};
use strand_syntax::{DiagnosticKind, Span};

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Small expression language used to drive the runtime in tests.
///
/// - literals, identifiers, unary and binary arithmetic are pure
/// - `Block`/`Program` open a scope and yield their last child
/// - `Assign` binds locally, `Export` binds and exports at module level
/// - `Call` with an `Int` payload is one step of a countdown: it adds its
///   payload to the `acc` binding, then evaluates its child if any
/// - `Tool` named `fail` raises, `cancel` trips the cancellation flag
///   before evaluating its children
/// - `Prompt` joins its children's values into a string
pub struct Calc {
    tree: Arc<Tree>,
    visits: AtomicUsize,
    deepest: AtomicUsize,
    per_node: Mutex<HashMap<NodeId, usize>>,
}

impl Calc {
    pub fn new(tree: Arc<Tree>) -> Self {
        Self {
            tree,
            visits: AtomicUsize::new(0),
            deepest: AtomicUsize::new(0),
            per_node: Mutex::new(HashMap::new()),
        }
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn visits(&self) -> usize {
        self.visits.load(Ordering::SeqCst)
    }

    /// Deepest guard depth seen from inside any visit.
    pub fn deepest(&self) -> usize {
        self.deepest.load(Ordering::SeqCst)
    }

    pub fn visits_of(&self, id: NodeId) -> usize {
        self.per_node.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    fn child(&self, node: &Node, i: usize) -> Result<&Node, EvalError> {
        node.children
            .get(i)
            .and_then(|id| self.tree.get(*id))
            .ok_or_else(|| {
                EvalError::raise(DiagnosticKind::Raw(format!("missing operand {i}")), node.span)
            })
    }

    fn collect_pure(&self, id: NodeId, vars: &mut Vec<Arc<str>>, path: &mut Vec<NodeId>) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        if path.contains(&id) {
            return false;
        }
        match node.kind {
            NodeKind::Literal => true,
            NodeKind::Identifier => match &node.payload {
                Payload::Name(n) => {
                    if !vars.contains(n) {
                        vars.push(n.clone());
                    }
                    true
                }
                _ => false,
            },
            NodeKind::Unary | NodeKind::Binary => {
                path.push(id);
                let pure = node.children.iter().all(|c| self.collect_pure(*c, vars, path));
                path.pop();
                pure
            }
            _ => false,
        }
    }
}

fn literal(payload: &Payload) -> Value {
    match payload {
        Payload::Int(i) => Value::Int(*i),
        Payload::Float(f) => Value::Float(*f),
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Str(s) => Value::Str(s.clone()),
        _ => Value::Unit,
    }
}

fn mismatch(expected: &str, actual: &Value, span: Span) -> EvalError {
    EvalError::raise(
        DiagnosticKind::TypeMismatch {
            expected: expected.into(),
            actual: actual.type_name().into(),
        },
        span,
    )
}

pub fn binary(op: BinaryOp, l: Value, r: Value, span: Span) -> Result<Value, EvalError> {
    use BinaryOp::*;
    let overflow = || EvalError::raise(DiagnosticKind::IntegerOverflow, span);
    match op {
        And => return Ok(Value::Bool(l.is_truthy() && r.is_truthy())),
        Or => return Ok(Value::Bool(l.is_truthy() || r.is_truthy())),
        Eq => return Ok(Value::Bool(l == r)),
        Ne => return Ok(Value::Bool(l != r)),
        _ => {}
    }
    if let (Value::Int(a), Value::Int(b)) = (&l, &r) {
        let (a, b) = (*a, *b);
        return match op {
            Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            Div | Mod if b == 0 => Err(EvalError::raise(DiagnosticKind::DivisionByZero, span)),
            Div => a.checked_div(b).map(Value::Int).ok_or_else(overflow),
            Mod => a.checked_rem(b).map(Value::Int).ok_or_else(overflow),
            Gt => Ok(Value::Bool(a > b)),
            Lt => Ok(Value::Bool(a < b)),
            Ge => Ok(Value::Bool(a >= b)),
            Le => Ok(Value::Bool(a <= b)),
            And | Or | Eq | Ne => unreachable!(),
        };
    }
    let a = l.as_f64().ok_or_else(|| mismatch("number", &l, span))?;
    let b = r.as_f64().ok_or_else(|| mismatch("number", &r, span))?;
    Ok(match op {
        Add => Value::Float(a + b),
        Sub => Value::Float(a - b),
        Mul => Value::Float(a * b),
        Div => Value::Float(a / b),
        Mod => Value::Float(a % b),
        Gt => Value::Bool(a > b),
        Lt => Value::Bool(a < b),
        Ge => Value::Bool(a >= b),
        Le => Value::Bool(a <= b),
        And | Or | Eq | Ne => unreachable!(),
    })
}

impl Evaluator for Calc {
    fn classify(&self, node: &Node) -> Classification {
        let mut vars = Vec::new();
        if self.collect_pure(node.id, &mut vars, &mut Vec::new()) {
            Classification::pure(vars)
        } else {
            Classification::opaque()
        }
    }

    fn visit(
        &self,
        node: &Node,
        ctx: &mut EvalContext,
        recurse: &dyn Recurse,
    ) -> Result<Value, EvalError> {
        self.visits.fetch_add(1, Ordering::SeqCst);
        self.deepest
            .fetch_max(ctx.state().depth().current(), Ordering::SeqCst);
        *self.per_node.lock().unwrap().entry(node.id).or_default() += 1;

        match node.kind {
            NodeKind::Literal => Ok(literal(&node.payload)),
            NodeKind::Identifier => {
                let name = node.name().unwrap_or_default();
                ctx.lookup(name).ok_or_else(|| {
                    EvalError::raise(DiagnosticKind::UndefinedIdentifier(name.into()), node.span)
                })
            }
            NodeKind::Unary => {
                let v = recurse.evaluate(self.child(node, 0)?, ctx)?;
                match (&node.payload, &v) {
                    (Payload::Unary(UnaryOp::Neg), Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| {
                            EvalError::raise(DiagnosticKind::IntegerOverflow, node.span)
                        }),
                    (Payload::Unary(UnaryOp::Neg), Value::Float(f)) => Ok(Value::Float(-f)),
                    (Payload::Unary(UnaryOp::Not), v) => Ok(Value::Bool(!v.is_truthy())),
                    _ => Err(EvalError::raise(
                        DiagnosticKind::InvalidUnaryOperand { op: '-', expected: "number".into() },
                        node.span,
                    )),
                }
            }
            NodeKind::Binary => {
                let l = recurse.evaluate(self.child(node, 0)?, ctx)?;
                let r = recurse.evaluate(self.child(node, 1)?, ctx)?;
                let Payload::Binary(op) = node.payload else {
                    let kind = DiagnosticKind::Raw("missing operator".into());
                    return Err(EvalError::raise(kind, node.span));
                };
                binary(op, l, r, node.span)
            }
            NodeKind::Program | NodeKind::Block => {
                ctx.env_mut().push();
                let mut last = Value::Unit;
                for child in self.tree.children(node) {
                    match recurse.evaluate(child, ctx) {
                        Ok(v) => last = v,
                        Err(e) => {
                            ctx.env_mut().pop();
                            return Err(e);
                        }
                    }
                }
                ctx.env_mut().pop();
                Ok(last)
            }
            NodeKind::Assign => {
                let name = node.name().unwrap_or_default().to_string();
                let v = recurse.evaluate(self.child(node, 0)?, ctx)?;
                if !ctx.env_mut().assign(&name, v.clone()) {
                    ctx.env_mut().define(name.as_str(), v.clone());
                }
                Ok(v)
            }
            NodeKind::Export => {
                let name = node.name().unwrap_or_default().to_string();
                let v = recurse.evaluate(self.child(node, 0)?, ctx)?;
                ctx.assign_global(&name, v.clone());
                ctx.shared().export(ctx.module(), &name);
                Ok(v)
            }
            NodeKind::Call => {
                let step = match node.payload {
                    Payload::Int(k) => k,
                    _ => {
                        let kind = DiagnosticKind::NotCallable("call".into());
                        return Err(EvalError::raise(kind, node.span));
                    }
                };
                let acc = ctx.lookup("acc").and_then(|v| v.as_int()).unwrap_or(0) + step;
                if !ctx.env_mut().assign("acc", Value::Int(acc)) {
                    ctx.env_mut().define("acc", Value::Int(acc));
                }
                match node.children.first() {
                    Some(_) => recurse.evaluate(self.child(node, 0)?, ctx),
                    None => Ok(Value::Int(acc)),
                }
            }
            NodeKind::Tool => match node.name() {
                Some("fail") => Err(EvalError::raise(
                    DiagnosticKind::ExternalCallFailed {
                        target: "fail".into(),
                        message: "tool failed".into(),
                    },
                    node.span,
                )),
                Some("cancel") => {
                    ctx.cancel_token().cancel();
                    let mut last = Value::Unit;
                    for child in self.tree.children(node) {
                        last = recurse.evaluate(child, ctx)?;
                    }
                    Ok(last)
                }
                other => Err(EvalError::raise(
                    DiagnosticKind::NotCallable(other.unwrap_or("?").into()),
                    node.span,
                )),
            },
            NodeKind::Prompt => {
                let mut parts = Vec::new();
                for child in self.tree.children(node) {
                    parts.push(recurse.evaluate(child, ctx)?.to_string());
                }
                Ok(Value::str(&parts.join(" ")))
            }
            NodeKind::If => {
                let cond = recurse.evaluate(self.child(node, 0)?, ctx)?;
                if cond.is_truthy() {
                    recurse.evaluate(self.child(node, 1)?, ctx)
                } else if node.children.len() > 2 {
                    recurse.evaluate(self.child(node, 2)?, ctx)
                } else {
                    Ok(Value::Unit)
                }
            }
            other => Err(EvalError::raise(
                DiagnosticKind::Raw(format!("unsupported node kind: {other}")),
                node.span,
            )),
        }
    }
}

/// Evaluates without the runtime in between: the evaluator recurses into
/// itself directly.
pub struct Direct<'a>(pub &'a Calc);

impl Recurse for Direct<'_> {
    fn evaluate(&self, node: &Node, ctx: &mut EvalContext) -> Result<Value, EvalError> {
        self.0.visit(node, ctx, self)
    }
}

/// Tree construction shorthand.
pub struct Src {
    b: TreeBuilder,
    pos: u32,
}

impl Src {
    pub fn new() -> Self {
        Self {
            b: TreeBuilder::new(),
            pos: 0,
        }
    }

    fn span(&mut self) -> Span {
        let s = Span::new(self.pos, self.pos + 1);
        self.pos += 2;
        s
    }

    fn node(&mut self, kind: NodeKind, payload: Payload, children: &[NodeId]) -> NodeId {
        let span = self.span();
        self.b.add(kind, payload, children, span)
    }

    pub fn builder(&mut self) -> &mut TreeBuilder {
        &mut self.b
    }

    pub fn int(&mut self, i: i64) -> NodeId {
        self.node(NodeKind::Literal, Payload::Int(i), &[])
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::Identifier, Payload::Name(name.into()), &[])
    }

    pub fn neg(&mut self, operand: NodeId) -> NodeId {
        self.node(NodeKind::Unary, Payload::Unary(UnaryOp::Neg), &[operand])
    }

    pub fn bin(&mut self, op: BinaryOp, l: NodeId, r: NodeId) -> NodeId {
        self.node(NodeKind::Binary, Payload::Binary(op), &[l, r])
    }

    pub fn block(&mut self, children: &[NodeId]) -> NodeId {
        self.node(NodeKind::Block, Payload::None, children)
    }

    pub fn assign(&mut self, name: &str, value: NodeId) -> NodeId {
        self.node(NodeKind::Assign, Payload::Name(name.into()), &[value])
    }

    pub fn export(&mut self, name: &str, value: NodeId) -> NodeId {
        self.node(NodeKind::Export, Payload::Name(name.into()), &[value])
    }

    pub fn tool(&mut self, name: &str, children: &[NodeId]) -> NodeId {
        self.node(NodeKind::Tool, Payload::Name(name.into()), children)
    }

    pub fn prompt(&mut self, children: &[NodeId]) -> NodeId {
        self.node(NodeKind::Prompt, Payload::None, children)
    }

    /// Countdown from `from` to 0 as nested `Call` steps; returns the
    /// outermost step. Evaluating it nests `from + 1` delegations.
    pub fn countdown(&mut self, from: i64) -> NodeId {
        let mut inner = self.node(NodeKind::Call, Payload::Int(0), &[]);
        for k in 1..=from {
            inner = self.node(NodeKind::Call, Payload::Int(k), &[inner]);
        }
        inner
    }

    /// `depth - 1` countdown steps ending in a failing tool call, so the
    /// error is raised at exactly `depth`.
    pub fn failing_chain(&mut self, depth: usize) -> NodeId {
        let mut inner = self.tool("fail", &[]);
        for _ in 1..depth {
            inner = self.node(NodeKind::Call, Payload::Int(1), &[inner]);
        }
        inner
    }

    pub fn finish(self, root: NodeId) -> Arc<Tree> {
        Arc::new(self.b.build(Some(root)))
    }
}

pub fn runtime(tree: &Arc<Tree>, config: RuntimeConfig) -> Runtime<Calc> {
    init_tracing();
    Runtime::with_config(Calc::new(Arc::clone(tree)), config)
}

pub fn context(rt: &Runtime<Calc>) -> EvalContext {
    let shared = Arc::new(SharedState::new());
    rt.attach(&shared);
    rt.new_context(shared)
}

pub fn eval(rt: &Runtime<Calc>, id: NodeId, ctx: &mut EvalContext) -> Result<Value, EvalError> {
    let tree = Arc::clone(rt.evaluator().tree());
    rt.evaluate(&tree[id], ctx)
}
