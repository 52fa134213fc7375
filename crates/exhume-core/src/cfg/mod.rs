//! The pre-AST control-flow graph.
//!
//! A `Cfg` owns all basic blocks and edges of one function as entity arenas.
//! Blocks carry an optional statement body (the lifted code so far) and
//! ordered edge-id adjacency lists in both directions; insertion order is
//! semantically relevant, it determines the syntactic order of predecessor
//! disjuncts in reaching conditions.
//!
//! Nothing is ever freed while the graph is alive. Detached edges simply
//! drop out of both adjacency lists and linger in the arena.

pub mod builder;
pub mod dom;
pub mod region;
pub mod scc;
pub mod sese;

use serde::{Deserialize, Serialize};

use crate::ast::{AstContext, ExprId, StmtId};
use crate::define_entity;
use crate::entity::PrimaryMap;

define_entity!(BlockId);
define_entity!(EdgeId);

/// A basic block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    /// The lifted body, if any. Normalized to a sequence container before
    /// anything is appended to it.
    pub statement: Option<StmtId>,
    pub preds: Vec<EdgeId>,
    pub succs: Vec<EdgeId>,
}

/// A directed edge with the condition under which control takes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    pub condition: ExprId,
}

/// CFG of one function. The entry is always the first created block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cfg {
    pub blocks: PrimaryMap<BlockId, Block>,
    pub edges: PrimaryMap<EdgeId, Edge>,
}

impl Cfg {
    pub fn new() -> Self {
        Self::default()
    }

    /// The function entry block. Panics on an empty graph.
    pub fn entry(&self) -> BlockId {
        assert!(!self.blocks.is_empty(), "empty CFG has no entry");
        use crate::entity::EntityRef;
        BlockId::new(0)
    }

    pub fn create_block(&mut self) -> BlockId {
        self.blocks.push(Block::default())
    }

    /// Create an edge and register it in both adjacency lists.
    pub fn create_edge(&mut self, from: BlockId, to: BlockId, condition: ExprId) -> EdgeId {
        let edge = self.edges.push(Edge {
            from,
            to,
            condition,
        });
        self.blocks[from].succs.push(edge);
        self.blocks[to].preds.push(edge);
        edge
    }

    /// Successor blocks of `block`, in edge insertion order.
    pub fn succ_blocks(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks[block].succs.iter().map(|&e| self.edges[e].to)
    }

    /// Predecessor blocks of `block`, in edge insertion order.
    pub fn pred_blocks(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks[block].preds.iter().map(|&e| self.edges[e].from)
    }

    /// Normalize the block body to a sequence container and return it.
    pub fn sequence_statement(&mut self, ctx: &mut AstContext, block: BlockId) -> StmtId {
        match self.blocks[block].statement {
            Some(existing) if ctx.is_sequence(existing) => existing,
            existing => {
                let seq = ctx.sequence();
                if let Some(stmt) = existing {
                    ctx.push_to_sequence(seq, stmt);
                }
                self.blocks[block].statement = Some(seq);
                seq
            }
        }
    }

    /// Append a statement to the block body, normalizing it to a sequence
    /// first.
    pub fn append_statement(&mut self, ctx: &mut AstContext, block: BlockId, stmt: StmtId) {
        let seq = self.sequence_statement(ctx, block);
        ctx.push_to_sequence(seq, stmt);
    }

    /// Detach an edge from both adjacency lists. The edge record stays in
    /// the arena.
    pub fn detach_edge(&mut self, edge: EdgeId) {
        let (from, to) = {
            let e = &self.edges[edge];
            (e.from, e.to)
        };
        self.blocks[from].succs.retain(|&e| e != edge);
        self.blocks[to].preds.retain(|&e| e != edge);
    }

    /// Insert a redirector block dispatching the given edges.
    ///
    /// Each distinct edge target gets a unique integer selector value, in
    /// first-seen order. Every redirected edge is retargeted to the new
    /// block, and its source block records the selector value it was
    /// heading for; the assignment is guarded by the edge condition unless
    /// that condition is the `true` literal, so a source with several
    /// redirected edges still sets exactly one value on the taken path.
    /// The redirector gets one outgoing edge per distinct target, with
    /// condition `selector == value`.
    pub fn create_redirector_block(
        &mut self,
        ctx: &mut AstContext,
        redirected: &[EdgeId],
    ) -> BlockId {
        let redirector = self.create_block();
        let selector = ctx.fresh_selector();
        // (target, selector value) in first-seen target order
        let mut cases: Vec<(BlockId, ExprId)> = Vec::new();

        for &edge in redirected {
            let (from, to, condition) = {
                let e = &self.edges[edge];
                (e.from, e.to, e.condition)
            };

            let value = match cases.iter().find(|(target, _)| *target == to) {
                Some(&(_, value)) => value,
                None => {
                    let value = ctx.int(cases.len() as i64);
                    cases.push((to, value));
                    let dispatch = ctx.equals(selector, value);
                    self.create_edge(redirector, to, dispatch);
                    value
                }
            };

            let assign = ctx.assign(selector, value);
            let recorded = if condition == ctx.expr_true() {
                assign
            } else {
                ctx.if_else(condition, assign)
            };
            self.append_statement(ctx, from, recorded);

            // Retarget the edge into the redirector.
            let pos = self.blocks[to]
                .preds
                .iter()
                .position(|&e| e == edge)
                .expect("redirected edge missing from target preds");
            self.blocks[to].preds.remove(pos);
            self.edges[edge].to = redirector;
            self.blocks[redirector].preds.push(edge);
        }

        redirector
    }

    /// Check the edge bidirectionality invariant: every edge reachable from
    /// an adjacency list appears in `from.succs` and `to.preds` exactly
    /// once, and both sides agree.
    pub fn validate(&self) -> Result<(), String> {
        for (block_id, block) in self.blocks.iter() {
            for &edge in &block.succs {
                let e = &self.edges[edge];
                if e.from != block_id {
                    return Err(format!(
                        "{edge:?} listed in succs of {block_id:?} but runs from {:?}",
                        e.from
                    ));
                }
                if block.succs.iter().filter(|&&x| x == edge).count() != 1 {
                    return Err(format!("{edge:?} duplicated in succs of {block_id:?}"));
                }
                if self.blocks[e.to].preds.iter().filter(|&&x| x == edge).count() != 1 {
                    return Err(format!(
                        "{edge:?} in succs of {block_id:?} but not exactly once in preds of {:?}",
                        e.to
                    ));
                }
            }
            for &edge in &block.preds {
                let e = &self.edges[edge];
                if e.to != block_id {
                    return Err(format!(
                        "{edge:?} listed in preds of {block_id:?} but runs to {:?}",
                        e.to
                    ));
                }
                if block.preds.iter().filter(|&&x| x == edge).count() != 1 {
                    return Err(format!("{edge:?} duplicated in preds of {block_id:?}"));
                }
                if self.blocks[e.from].succs.iter().filter(|&&x| x == edge).count() != 1 {
                    return Err(format!(
                        "{edge:?} in preds of {block_id:?} but not exactly once in succs of {:?}",
                        e.from
                    ));
                }
            }
        }
        Ok(())
    }
}
