//! Pseudo-code printer for recovered statements.
//!
//! Used by driver debug dumps and by tests asserting on recovered shapes.
//! The output is C-like but makes conditional breaks explicit
//! (`break if (cond);`) rather than expanding them to an `if`.

use std::fmt;

use super::context::{AstContext, Expr, ExprId, LoopKind, NaryOp, Stmt, StmtId};

pub struct ExprDisplay<'a> {
    ctx: &'a AstContext,
    expr: ExprId,
}

pub struct StmtDisplay<'a> {
    ctx: &'a AstContext,
    stmt: StmtId,
}

impl AstContext {
    pub fn display_expr(&self, expr: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { ctx: self, expr }
    }

    pub fn display_stmt(&self, stmt: StmtId) -> StmtDisplay<'_> {
        StmtDisplay { ctx: self, stmt }
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self.ctx, self.expr, false)
    }
}

impl fmt::Display for StmtDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self.ctx, self.stmt, 0)
    }
}

/// Does this expression need parentheses when nested inside another one?
fn is_composite(expr: &Expr) -> bool {
    matches!(expr, Expr::Nary { .. } | Expr::Equals { .. })
}

fn write_expr(
    f: &mut fmt::Formatter<'_>,
    ctx: &AstContext,
    id: ExprId,
    parenthesize: bool,
) -> fmt::Result {
    let expr = ctx.expr(id);
    let wrap = parenthesize && is_composite(expr);
    if wrap {
        write!(f, "(")?;
    }
    match expr {
        Expr::True => write!(f, "true")?,
        Expr::Var(name) => write!(f, "{name}")?,
        Expr::Int(value) => write!(f, "{value}")?,
        Expr::Selector(index) => write!(f, "sel{index}")?,
        Expr::Not(operand) => {
            write!(f, "!")?;
            write_expr(f, ctx, *operand, true)?;
        }
        Expr::Nary { op, operands } => {
            let sep = match op {
                NaryOp::ShortCircuitAnd => " && ",
                NaryOp::ShortCircuitOr => " || ",
            };
            for (i, &operand) in operands.iter().enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write_expr(f, ctx, operand, true)?;
            }
        }
        Expr::Equals { lhs, rhs } => {
            write_expr(f, ctx, *lhs, true)?;
            write!(f, " == ")?;
            write_expr(f, ctx, *rhs, true)?;
        }
    }
    if wrap {
        write!(f, ")")?;
    }
    Ok(())
}

fn write_indent(f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        write!(f, "    ")?;
    }
    Ok(())
}

fn write_stmt(
    f: &mut fmt::Formatter<'_>,
    ctx: &AstContext,
    id: StmtId,
    indent: usize,
) -> fmt::Result {
    match ctx.stmt(id) {
        Stmt::Sequence(items) => {
            for &item in items {
                write_stmt(f, ctx, item, indent)?;
            }
        }
        Stmt::IfElse {
            condition,
            then_body,
            else_body,
        } => {
            write_indent(f, indent)?;
            writeln!(f, "if ({}) {{", ctx.display_expr(*condition))?;
            write_stmt(f, ctx, *then_body, indent + 1)?;
            if let Some(else_body) = else_body {
                write_indent(f, indent)?;
                writeln!(f, "}} else {{")?;
                write_stmt(f, ctx, *else_body, indent + 1)?;
            }
            write_indent(f, indent)?;
            writeln!(f, "}}")?;
        }
        Stmt::Loop {
            condition,
            kind,
            body,
        } => match kind {
            LoopKind::PreTested => {
                write_indent(f, indent)?;
                writeln!(f, "while ({}) {{", ctx.display_expr(*condition))?;
                write_stmt(f, ctx, *body, indent + 1)?;
                write_indent(f, indent)?;
                writeln!(f, "}}")?;
            }
            LoopKind::PostTested => {
                write_indent(f, indent)?;
                writeln!(f, "do {{")?;
                write_stmt(f, ctx, *body, indent + 1)?;
                write_indent(f, indent)?;
                writeln!(f, "}} while ({});", ctx.display_expr(*condition))?;
            }
        },
        Stmt::Break { condition } => {
            write_indent(f, indent)?;
            if matches!(ctx.expr(*condition), Expr::True) {
                writeln!(f, "break;")?;
            } else {
                writeln!(f, "break if ({});", ctx.display_expr(*condition))?;
            }
        }
        Stmt::Assign { target, value } => {
            write_indent(f, indent)?;
            writeln!(
                f,
                "{} = {};",
                ctx.display_expr(*target),
                ctx.display_expr(*value)
            )?;
        }
        Stmt::Expr(expr) => {
            write_indent(f, indent)?;
            writeln!(f, "{};", ctx.display_expr(*expr))?;
        }
    }
    Ok(())
}
