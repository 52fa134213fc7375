//! The AST layer: expression/statement arenas, passes, and printing.

pub mod context;
pub mod passes;
pub mod print;

pub use context::{AstContext, Expr, ExprId, LoopKind, NaryOp, Stmt, StmtId};
