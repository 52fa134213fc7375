//! AST-to-AST rewrite passes.
//!
//! These run after structurization, over all emitted function nodes, in
//! registration order. The structurizer builds reaching conditions purely
//! syntactically and wraps every reduced region in its own sequence;
//! cleaning that up is deliberately left to this layer.

use crate::ast::{AstContext, Expr, ExprId, NaryOp, Stmt, StmtId};
use crate::error::CoreError;
use crate::module::FunctionNode;

/// A module-level rewrite pass over emitted function nodes.
pub trait AstPass {
    /// Name of this pass.
    fn name(&self) -> &str;

    /// Rewrite all function nodes in place.
    fn run(&self, nodes: &mut [FunctionNode]) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Sequence flattening
// ---------------------------------------------------------------------------

/// Splice nested sequences into their parents, recursively.
///
/// Region reduction leaves every collapsed region as a sequence nested in
/// the enclosing fold's sequence; after this pass each statement body is a
/// single flat sequence.
pub fn flatten_sequences(ctx: &mut AstContext, root: StmtId) {
    match ctx.stmt(root).clone() {
        Stmt::Sequence(items) => {
            let mut flat = Vec::with_capacity(items.len());
            for item in items {
                flatten_sequences(ctx, item);
                match ctx.stmt(item) {
                    Stmt::Sequence(inner) => flat.extend(inner.iter().copied()),
                    _ => flat.push(item),
                }
            }
            *ctx.stmt_mut(root) = Stmt::Sequence(flat);
        }
        Stmt::IfElse {
            then_body,
            else_body,
            ..
        } => {
            flatten_sequences(ctx, then_body);
            if let Some(else_body) = else_body {
                flatten_sequences(ctx, else_body);
            }
        }
        Stmt::Loop { body, .. } => flatten_sequences(ctx, body),
        Stmt::Break { .. } | Stmt::Assign { .. } | Stmt::Expr(_) => {}
    }
}

pub struct SequenceFlattening;

impl AstPass for SequenceFlattening {
    fn name(&self) -> &str {
        "sequence-flattening"
    }

    fn run(&self, nodes: &mut [FunctionNode]) -> Result<(), CoreError> {
        for node in nodes.iter_mut() {
            if let Some(body) = node.body {
                flatten_sequences(&mut node.ctx, body);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Condition simplification
// ---------------------------------------------------------------------------

/// Simplify the Boolean expressions hanging off a statement tree.
///
/// Rules applied bottom-up:
/// - `!!x` becomes `x`
/// - same-operator n-ary children are spliced into their parent
/// - `true` conjuncts are dropped; an all-`true` conjunction is `true`
/// - a disjunction containing `true` is `true`
/// - duplicate operands (by node id) collapse
/// - a single-operand n-ary node is replaced by its operand
pub fn simplify_conditions(ctx: &mut AstContext, root: StmtId) {
    match ctx.stmt(root).clone() {
        Stmt::Sequence(items) => {
            for item in items {
                simplify_conditions(ctx, item);
            }
        }
        Stmt::IfElse {
            condition,
            then_body,
            else_body,
        } => {
            let simplified = simplify_expr(ctx, condition);
            if let Stmt::IfElse { condition, .. } = ctx.stmt_mut(root) {
                *condition = simplified;
            }
            simplify_conditions(ctx, then_body);
            if let Some(else_body) = else_body {
                simplify_conditions(ctx, else_body);
            }
        }
        Stmt::Loop {
            condition, body, ..
        } => {
            let simplified = simplify_expr(ctx, condition);
            if let Stmt::Loop { condition, .. } = ctx.stmt_mut(root) {
                *condition = simplified;
            }
            simplify_conditions(ctx, body);
        }
        Stmt::Break { condition } => {
            let simplified = simplify_expr(ctx, condition);
            if let Stmt::Break { condition } = ctx.stmt_mut(root) {
                *condition = simplified;
            }
        }
        Stmt::Assign { .. } | Stmt::Expr(_) => {}
    }
}

/// Simplify one expression, returning the replacement id (possibly the
/// original).
pub fn simplify_expr(ctx: &mut AstContext, expr: ExprId) -> ExprId {
    match ctx.expr(expr).clone() {
        Expr::Not(operand) => {
            let operand = simplify_expr(ctx, operand);
            if let Expr::Not(inner) = *ctx.expr(operand) {
                return inner;
            }
            ctx.not(operand)
        }
        Expr::Nary { op, operands } => {
            let t = ctx.expr_true();
            let mut flat: Vec<ExprId> = Vec::with_capacity(operands.len());
            for operand in operands {
                let simplified = simplify_expr(ctx, operand);
                match ctx.expr(simplified) {
                    Expr::Nary {
                        op: inner_op,
                        operands: inner,
                    } if *inner_op == op => flat.extend(inner.iter().copied()),
                    _ => flat.push(simplified),
                }
            }
            match op {
                NaryOp::ShortCircuitAnd => flat.retain(|&x| x != t),
                NaryOp::ShortCircuitOr => {
                    if flat.contains(&t) {
                        return t;
                    }
                }
            }
            let mut unique: Vec<ExprId> = Vec::with_capacity(flat.len());
            for x in flat {
                if !unique.contains(&x) {
                    unique.push(x);
                }
            }
            match unique.len() {
                0 => t,
                1 => unique[0],
                _ => ctx.nary_all(op, unique),
            }
        }
        Expr::Equals { lhs, rhs } => {
            let new_lhs = simplify_expr(ctx, lhs);
            let new_rhs = simplify_expr(ctx, rhs);
            if new_lhs == lhs && new_rhs == rhs {
                expr
            } else {
                ctx.equals(new_lhs, new_rhs)
            }
        }
        Expr::True | Expr::Var(_) | Expr::Int(_) | Expr::Selector(_) => expr,
    }
}

pub struct ConditionSimplify;

impl AstPass for ConditionSimplify {
    fn name(&self) -> &str {
        "condition-simplify"
    }

    fn run(&self, nodes: &mut [FunctionNode]) -> Result<(), CoreError> {
        for node in nodes.iter_mut() {
            if let Some(body) = node.body {
                simplify_conditions(&mut node.ctx, body);
            }
        }
        Ok(())
    }
}
