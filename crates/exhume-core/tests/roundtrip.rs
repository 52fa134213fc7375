//! Round-trip semantics: for a lifted CFG and its structured statement
//! tree, the trace of visited blocks must agree under every valuation of
//! the input predicates.
//!
//! The CFG side runs as a state machine over the *original* (pre-
//! normalization) graph: execute the block body, then follow the unique
//! outgoing edge whose condition holds. The AST side interprets the
//! structured tree. Both emit the marker of every visited block; selector
//! assignments introduced by redirector blocks update interpreter state
//! without appearing in traces. Executions are cut off after a bounded
//! number of markers so looping valuations compare on a common prefix.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use exhume_core::ast::passes::{flatten_sequences, simplify_conditions};
use exhume_core::ast::{AstContext, Expr, ExprId, NaryOp, Stmt, StmtId};
use exhume_core::cfg::builder::CfgBuilder;
use exhume_core::cfg::Cfg;
use exhume_core::structurize::structurize_function;

const TRACE_LIMIT: usize = 48;

// ---------------------------------------------------------------------------
// Expression and statement interpreter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    fn as_bool(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Int(v) => panic!("expected a Boolean, got {v}"),
        }
    }
}

struct State {
    valuation: HashMap<String, bool>,
    selectors: HashMap<u32, i64>,
    trace: Vec<String>,
}

impl State {
    fn new(valuation: HashMap<String, bool>) -> Self {
        Self {
            valuation,
            selectors: HashMap::new(),
            trace: Vec::new(),
        }
    }

    fn done(&self) -> bool {
        self.trace.len() >= TRACE_LIMIT
    }
}

fn eval(ctx: &AstContext, state: &State, expr: ExprId) -> Value {
    match ctx.expr(expr) {
        Expr::True => Value::Bool(true),
        Expr::Var(name) => Value::Bool(
            *state
                .valuation
                .get(name)
                .unwrap_or_else(|| panic!("unbound predicate {name}")),
        ),
        Expr::Int(v) => Value::Int(*v),
        Expr::Selector(index) => Value::Int(state.selectors.get(index).copied().unwrap_or(-1)),
        Expr::Not(operand) => Value::Bool(!eval(ctx, state, *operand).as_bool()),
        Expr::Nary { op, operands } => Value::Bool(match op {
            NaryOp::ShortCircuitAnd => operands
                .iter()
                .all(|&operand| eval(ctx, state, operand).as_bool()),
            NaryOp::ShortCircuitOr => operands
                .iter()
                .any(|&operand| eval(ctx, state, operand).as_bool()),
        }),
        Expr::Equals { lhs, rhs } => {
            Value::Bool(eval(ctx, state, *lhs) == eval(ctx, state, *rhs))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Break,
    Stop,
}

fn exec(ctx: &AstContext, state: &mut State, stmt: StmtId) -> Flow {
    if state.done() {
        return Flow::Stop;
    }
    match ctx.stmt(stmt) {
        Stmt::Sequence(items) => {
            for &item in items {
                match exec(ctx, state, item) {
                    Flow::Next => {}
                    other => return other,
                }
            }
            Flow::Next
        }
        Stmt::IfElse {
            condition,
            then_body,
            else_body,
        } => {
            if eval(ctx, state, *condition).as_bool() {
                exec(ctx, state, *then_body)
            } else if let Some(else_body) = else_body {
                exec(ctx, state, *else_body)
            } else {
                Flow::Next
            }
        }
        Stmt::Loop {
            condition, body, ..
        } => {
            loop {
                if state.done() {
                    return Flow::Stop;
                }
                if !eval(ctx, state, *condition).as_bool() {
                    return Flow::Next;
                }
                match exec(ctx, state, *body) {
                    Flow::Next => {}
                    Flow::Break => return Flow::Next,
                    Flow::Stop => return Flow::Stop,
                }
            }
        }
        Stmt::Break { condition } => {
            if eval(ctx, state, *condition).as_bool() {
                Flow::Break
            } else {
                Flow::Next
            }
        }
        Stmt::Assign { target, value } => {
            let index = match ctx.expr(*target) {
                Expr::Selector(index) => *index,
                other => panic!("assignment to non-selector {other:?}"),
            };
            let value = match eval(ctx, state, *value) {
                Value::Int(v) => v,
                Value::Bool(_) => panic!("Boolean selector value"),
            };
            state.selectors.insert(index, value);
            Flow::Next
        }
        Stmt::Expr(expr) => {
            if let Expr::Var(name) = ctx.expr(*expr) {
                state.trace.push(name.clone());
            }
            Flow::Next
        }
    }
}

// ---------------------------------------------------------------------------
// CFG state-machine executor
// ---------------------------------------------------------------------------

fn run_cfg(ctx: &AstContext, cfg: &Cfg, valuation: HashMap<String, bool>) -> Vec<String> {
    let mut state = State::new(valuation);
    let mut current = cfg.entry();
    loop {
        if state.done() {
            break;
        }
        if let Some(stmt) = cfg.blocks[current].statement {
            if exec(ctx, &mut state, stmt) == Flow::Stop {
                break;
            }
        }
        let taken: Vec<_> = cfg.blocks[current]
            .succs
            .iter()
            .filter(|&&e| eval(ctx, &state, cfg.edges[e].condition).as_bool())
            .collect();
        match taken.as_slice() {
            [] if cfg.blocks[current].succs.is_empty() => break,
            [&edge] => current = cfg.edges[edge].to,
            other => panic!(
                "edge conditions not exclusive and exhaustive at {current:?}: {} taken",
                other.len()
            ),
        }
    }
    state.trace
}

fn run_ast(ctx: &AstContext, body: StmtId, valuation: HashMap<String, bool>) -> Vec<String> {
    let mut state = State::new(valuation);
    exec(ctx, &mut state, body);
    state.trace
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn valuations(vars: &[String], rng: &mut StdRng) -> Vec<HashMap<String, bool>> {
    if vars.len() <= 6 {
        (0..1usize << vars.len())
            .map(|bits| {
                vars.iter()
                    .enumerate()
                    .map(|(i, v)| (v.clone(), (bits >> i) & 1 == 1))
                    .collect()
            })
            .collect()
    } else {
        (0..40)
            .map(|_| vars.iter().map(|v| (v.clone(), rng.gen())).collect())
            .collect()
    }
}

/// Structurize a copy of the CFG and compare traces under every valuation,
/// before and after the cleanup passes.
fn assert_round_trip(ctx: &AstContext, cfg: &Cfg, vars: &[String], rng: &mut StdRng) {
    let mut structured_ctx = ctx.clone();
    let mut structured_cfg = cfg.clone();
    let body = structurize_function(&mut structured_ctx, &mut structured_cfg);
    structured_cfg.validate().expect("CFG consistent after structurization");

    let mut simplified_ctx = structured_ctx.clone();
    flatten_sequences(&mut simplified_ctx, body);
    simplify_conditions(&mut simplified_ctx, body);

    for valuation in valuations(vars, rng) {
        let expected = run_cfg(ctx, cfg, valuation.clone());
        let actual = run_ast(&structured_ctx, body, valuation.clone());
        assert_eq!(
            expected, actual,
            "trace mismatch under {valuation:?}"
        );
        let cleaned = run_ast(&simplified_ctx, body, valuation.clone());
        assert_eq!(
            expected, cleaned,
            "cleanup passes changed semantics under {valuation:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Scenario graphs
// ---------------------------------------------------------------------------

#[test]
fn diamond_round_trip() {
    let mut bd = CfgBuilder::new();
    let a = bd.labeled("a");
    let b = bd.labeled("b");
    let c = bd.labeled("c");
    let d = bd.labeled("d");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    bd.edge(a, b, p);
    bd.edge(a, c, np);
    bd.edge_true(b, d);
    bd.edge_true(c, d);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(1);
    assert_round_trip(&ctx, &cfg, &["p".into()], &mut rng);
}

#[test]
fn while_loop_round_trip() {
    let mut bd = CfgBuilder::new();
    let h = bd.labeled("h");
    let b = bd.labeled("b");
    let x = bd.labeled("x");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    bd.edge(h, b, p);
    bd.edge(h, x, np);
    bd.edge_true(b, h);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(2);
    assert_round_trip(&ctx, &cfg, &["p".into()], &mut rng);
}

#[test]
fn self_loop_round_trip() {
    let mut bd = CfgBuilder::new();
    let a = bd.labeled("a");
    let x = bd.labeled("x");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    bd.edge(a, a, p);
    bd.edge(a, x, np);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(3);
    assert_round_trip(&ctx, &cfg, &["p".into()], &mut rng);
}

#[test]
fn nested_if_in_loop_round_trip() {
    let mut bd = CfgBuilder::new();
    let h = bd.labeled("h");
    let b1 = bd.labeled("b1");
    let b2 = bd.labeled("b2");
    let m = bd.labeled("m");
    let x = bd.labeled("x");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    let q = bd.ctx.var("q");
    let nq = bd.ctx.not(q);
    bd.edge(h, b1, p);
    bd.edge(h, x, np);
    bd.edge(b1, b2, q);
    bd.edge(b1, m, nq);
    bd.edge_true(b2, m);
    bd.edge_true(m, h);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(4);
    assert_round_trip(&ctx, &cfg, &["p".into(), "q".into()], &mut rng);
}

#[test]
fn multi_exit_loop_round_trip() {
    let mut bd = CfgBuilder::new();
    let h = bd.labeled("h");
    let b = bd.labeled("b");
    let x1 = bd.labeled("x1");
    let x2 = bd.labeled("x2");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    let q = bd.ctx.var("q");
    let nq = bd.ctx.not(q);
    bd.edge(h, b, p);
    bd.edge(h, x1, np);
    bd.edge(b, h, q);
    bd.edge(b, x2, nq);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(5);
    assert_round_trip(&ctx, &cfg, &["p".into(), "q".into()], &mut rng);
}

#[test]
fn guarded_loop_round_trip() {
    let mut bd = CfgBuilder::new();
    let e = bd.labeled("e");
    let h = bd.labeled("h");
    let b = bd.labeled("b");
    let x = bd.labeled("x");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    let q = bd.ctx.var("q");
    let nq = bd.ctx.not(q);
    bd.edge(e, h, p);
    bd.edge(e, x, np);
    bd.edge(h, b, q);
    bd.edge(h, x, nq);
    bd.edge_true(b, h);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(6);
    assert_round_trip(&ctx, &cfg, &["p".into(), "q".into()], &mut rng);
}

#[test]
fn irreducible_cycle_with_exit_round_trip() {
    // e -> a [p], e -> b [!p], a -> c, b -> d, c -> d, d -> c [r],
    // d -> x [!r]. Two entries into the cycle {c, d}; normalization makes
    // the redirector the single entry and the loop still exits through x.
    let mut bd = CfgBuilder::new();
    let e = bd.labeled("e");
    let a = bd.labeled("a");
    let b = bd.labeled("b");
    let c = bd.labeled("c");
    let d = bd.labeled("d");
    let x = bd.labeled("x");
    let p = bd.ctx.var("p");
    let np = bd.ctx.not(p);
    let r = bd.ctx.var("r");
    let nr = bd.ctx.not(r);
    bd.edge(e, a, p);
    bd.edge(e, b, np);
    bd.edge_true(a, c);
    bd.edge_true(b, d);
    bd.edge_true(c, d);
    bd.edge(d, c, r);
    bd.edge(d, x, nr);
    let (ctx, cfg) = bd.finish();
    let mut rng = StdRng::seed_from_u64(7);
    assert_round_trip(&ctx, &cfg, &["p".into(), "r".into()], &mut rng);
}

// ---------------------------------------------------------------------------
// Randomized graphs
// ---------------------------------------------------------------------------

struct RandomCfg {
    ctx: AstContext,
    cfg: Cfg,
    vars: Vec<String>,
}

/// A random acyclic CFG: a chain `0 -> 1 -> ... -> n-1` guaranteeing
/// reachability and a single final exit, with extra forward branches that
/// split a block's single `true` edge into a `p` / `!p` pair.
fn random_dag(rng: &mut StdRng) -> RandomCfg {
    let n = rng.gen_range(4..10);
    let mut bd = CfgBuilder::new();
    let blocks: Vec<_> = (0..n).map(|i| bd.labeled(&format!("n{i}"))).collect();
    let mut vars = Vec::new();

    for i in 0..n - 1 {
        let next = blocks[i + 1];
        // Candidate for a second, further forward target.
        let skip = if i + 2 < n && rng.gen_bool(0.5) {
            Some(blocks[rng.gen_range(i + 2..n)])
        } else {
            None
        };
        match skip {
            Some(target) => {
                let name = format!("p{i}");
                let var = bd.ctx.var(&name);
                let not_var = bd.ctx.not(var);
                vars.push(name);
                bd.edge(blocks[i], next, var);
                bd.edge(blocks[i], target, not_var);
            }
            None => {
                bd.edge_true(blocks[i], next);
            }
        }
    }

    let (ctx, cfg) = bd.finish();
    RandomCfg { ctx, cfg, vars }
}

/// Like `random_dag`, but one block's `true` edge is split into a
/// continue / back-edge pair, forming a single natural loop.
fn random_looped(rng: &mut StdRng) -> RandomCfg {
    let n = rng.gen_range(4..9);
    let mut bd = CfgBuilder::new();
    let blocks: Vec<_> = (0..n).map(|i| bd.labeled(&format!("n{i}"))).collect();
    let mut vars = Vec::new();

    let latch = rng.gen_range(1..n - 1);
    let header = rng.gen_range(0..=latch);

    for i in 0..n - 1 {
        let next = blocks[i + 1];
        if i == latch {
            let name = format!("p{i}");
            let var = bd.ctx.var(&name);
            let not_var = bd.ctx.not(var);
            vars.push(name);
            bd.edge(blocks[i], next, var);
            bd.edge(blocks[i], blocks[header], not_var);
        } else if i + 2 < n && rng.gen_bool(0.4) {
            let target = bd.ctx.var(&format!("p{i}"));
            let not_target = bd.ctx.not(target);
            vars.push(format!("p{i}"));
            bd.edge(blocks[i], next, target);
            bd.edge(blocks[i], blocks[rng.gen_range(i + 2..n)], not_target);
        } else {
            bd.edge_true(blocks[i], next);
        }
    }

    let (ctx, cfg) = bd.finish();
    RandomCfg { ctx, cfg, vars }
}

#[test]
fn random_acyclic_round_trips() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..150 {
        let RandomCfg { ctx, cfg, vars } = random_dag(&mut rng);
        assert_round_trip(&ctx, &cfg, &vars, &mut rng);
    }
}

#[test]
fn random_single_loop_round_trips() {
    let mut rng = StdRng::seed_from_u64(0x100b);
    for _ in 0..100 {
        let RandomCfg { ctx, cfg, vars } = random_looped(&mut rng);
        assert_round_trip(&ctx, &cfg, &vars, &mut rng);
    }
}

// ---------------------------------------------------------------------------
// Normalization idempotence over random graphs
// ---------------------------------------------------------------------------

#[test]
fn random_normalization_idempotent() {
    use exhume_core::cfg::sese::normalize_cycles;

    let mut rng = StdRng::seed_from_u64(77);
    for _ in 0..100 {
        let RandomCfg {
            mut ctx, mut cfg, ..
        } = random_looped(&mut rng);
        normalize_cycles(&mut ctx, &mut cfg);
        let blocks = cfg.blocks.len();
        let edges = cfg.edges.len();
        normalize_cycles(&mut ctx, &mut cfg);
        assert_eq!(cfg.blocks.len(), blocks);
        assert_eq!(cfg.edges.len(), edges);
        cfg.validate().unwrap();
    }
}
