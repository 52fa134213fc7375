//! The AST context: arena ownership of expressions and statements.
//!
//! One `AstContext` owns every expression and statement of a single function.
//! Nodes refer to each other by id, so the statement tree produced by the
//! structurizer can share subtrees freely and mutate sequences in place
//! (appending a `Break` to a block body that is already part of a larger
//! sequence).
//!
//! The `true` literal is interned: `expr_true` always returns the same id,
//! and id equality against it is how callers apply the `true && x == x`
//! identity.

use serde::{Deserialize, Serialize};

use crate::define_entity;
use crate::entity::PrimaryMap;

define_entity!(ExprId);
define_entity!(StmtId);

/// Operator of an n-ary short-circuit expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NaryOp {
    ShortCircuitAnd,
    ShortCircuitOr,
}

/// Where a loop tests its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    PreTested,
    PostTested,
}

/// A Boolean-valued (or selector-valued) expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// The interned `true` literal.
    True,
    /// An opaque predicate supplied by the lifting front-end.
    Var(String),
    /// An integer literal (selector case values).
    Int(i64),
    /// A synthesized dispatch variable. Each redirector block gets its own.
    Selector(u32),
    Not(ExprId),
    Nary { op: NaryOp, operands: Vec<ExprId> },
    Equals { lhs: ExprId, rhs: ExprId },
}

/// A statement node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    /// Ordered list of statements; mutable by append.
    Sequence(Vec<StmtId>),
    IfElse {
        condition: ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
    },
    Loop {
        condition: ExprId,
        kind: LoopKind,
        body: StmtId,
    },
    /// Conditional break; unconditional when the condition is the `true`
    /// literal.
    Break { condition: ExprId },
    Assign { target: ExprId, value: ExprId },
    /// An opaque lifted statement body, represented by its expression.
    Expr(ExprId),
}

/// Arena owning all expressions and statements of one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstContext {
    exprs: PrimaryMap<ExprId, Expr>,
    stmts: PrimaryMap<StmtId, Stmt>,
    true_expr: ExprId,
    next_selector: u32,
}

impl AstContext {
    pub fn new() -> Self {
        let mut exprs = PrimaryMap::new();
        let true_expr = exprs.push(Expr::True);
        Self {
            exprs,
            stmts: PrimaryMap::new(),
            true_expr,
            next_selector: 0,
        }
    }

    // -- expressions --------------------------------------------------------

    /// The interned `true` literal.
    pub fn expr_true(&self) -> ExprId {
        self.true_expr
    }

    pub fn var(&mut self, name: impl Into<String>) -> ExprId {
        self.exprs.push(Expr::Var(name.into()))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.exprs.push(Expr::Int(value))
    }

    /// Allocate a fresh selector variable for a redirector block.
    pub fn fresh_selector(&mut self) -> ExprId {
        let selector = self.next_selector;
        self.next_selector += 1;
        self.exprs.push(Expr::Selector(selector))
    }

    pub fn not(&mut self, operand: ExprId) -> ExprId {
        self.exprs.push(Expr::Not(operand))
    }

    pub fn nary(&mut self, op: NaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.exprs.push(Expr::Nary {
            op,
            operands: vec![lhs, rhs],
        })
    }

    pub fn nary_all(&mut self, op: NaryOp, operands: Vec<ExprId>) -> ExprId {
        self.exprs.push(Expr::Nary { op, operands })
    }

    pub fn equals(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.exprs.push(Expr::Equals { lhs, rhs })
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    // -- statements ---------------------------------------------------------

    /// Create an empty sequence.
    pub fn sequence(&mut self) -> StmtId {
        self.stmts.push(Stmt::Sequence(Vec::new()))
    }

    /// Append to an existing sequence.
    ///
    /// Panics if `seq` is not a sequence; callers are expected to have
    /// normalized the target first.
    pub fn push_to_sequence(&mut self, seq: StmtId, stmt: StmtId) {
        match &mut self.stmts[seq] {
            Stmt::Sequence(items) => items.push(stmt),
            other => panic!("push_to_sequence on non-sequence statement: {other:?}"),
        }
    }

    pub fn if_else(&mut self, condition: ExprId, then_body: StmtId) -> StmtId {
        self.stmts.push(Stmt::IfElse {
            condition,
            then_body,
            else_body: None,
        })
    }

    pub fn loop_stmt(&mut self, condition: ExprId, kind: LoopKind, body: StmtId) -> StmtId {
        self.stmts.push(Stmt::Loop {
            condition,
            kind,
            body,
        })
    }

    pub fn break_stmt(&mut self, condition: ExprId) -> StmtId {
        self.stmts.push(Stmt::Break { condition })
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> StmtId {
        self.stmts.push(Stmt::Assign { target, value })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmts.push(Stmt::Expr(expr))
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id]
    }

    pub fn is_sequence(&self, id: StmtId) -> bool {
        matches!(self.stmts[id], Stmt::Sequence(_))
    }
}

impl Default for AstContext {
    fn default() -> Self {
        Self::new()
    }
}
