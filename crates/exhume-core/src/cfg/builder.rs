//! Convenience builder for assembling a function's pre-AST CFG.
//!
//! Lifting front-ends and tests use this instead of wiring `Cfg` and
//! `AstContext` by hand. The first created block is the function entry.

use crate::ast::{AstContext, ExprId, StmtId};

use super::{BlockId, Cfg, EdgeId};

pub struct CfgBuilder {
    pub ctx: AstContext,
    pub cfg: Cfg,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self {
            ctx: AstContext::new(),
            cfg: Cfg::new(),
        }
    }

    /// Create a block with no body.
    pub fn block(&mut self) -> BlockId {
        self.cfg.create_block()
    }

    /// Create a block with the given body statement.
    pub fn block_with(&mut self, statement: StmtId) -> BlockId {
        let block = self.cfg.create_block();
        self.cfg.blocks[block].statement = Some(statement);
        block
    }

    /// Create a block whose body is a single marker expression. Handy for
    /// tests and debug fixtures that only care about control flow.
    pub fn labeled(&mut self, label: &str) -> BlockId {
        let marker = self.ctx.var(label);
        let stmt = self.ctx.expr_stmt(marker);
        self.block_with(stmt)
    }

    pub fn edge(&mut self, from: BlockId, to: BlockId, condition: ExprId) -> EdgeId {
        self.cfg.create_edge(from, to, condition)
    }

    /// Create an edge with the `true` condition.
    pub fn edge_true(&mut self, from: BlockId, to: BlockId) -> EdgeId {
        let t = self.ctx.expr_true();
        self.cfg.create_edge(from, to, t)
    }

    pub fn finish(self) -> (AstContext, Cfg) {
        (self.ctx, self.cfg)
    }
}

impl Default for CfgBuilder {
    fn default() -> Self {
        Self::new()
    }
}
