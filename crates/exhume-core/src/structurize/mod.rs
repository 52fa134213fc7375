//! Control-flow structurization.
//!
//! Consumes a normalized CFG and its region tree and produces one statement
//! for the whole function. Regions are reduced bottom-up: each child region
//! collapses into a synthetic block whose body is the already-structured
//! region, and a flat range of blocks folds into a sequence of statements
//! guarded by their reaching conditions. A range containing a back-edge
//! becomes a pre-tested `while (true)` whose exits are conditional breaks
//! attached to the blocks that originally branched out.
//!
//! The CFG is consumed: edges are retargeted and detached as regions
//! collapse, and the graph is not reusable afterwards.

pub mod order;

use std::collections::{HashMap, HashSet};

use crate::ast::{AstContext, ExprId, LoopKind, NaryOp, StmtId};
use crate::cfg::dom::DomInfo;
use crate::cfg::region::{RegionId, RegionTree};
use crate::cfg::{scc, sese, BlockId, Cfg};

use order::{BlockOrder, Pos};

/// Structurize one function: normalize cycles, compute regions, reduce.
pub fn structurize_function(ctx: &mut AstContext, cfg: &mut Cfg) -> StmtId {
    sese::normalize_cycles(ctx, cfg);
    let dom = DomInfo::compute(cfg);
    let tree = RegionTree::build(cfg, &dom);
    Structurizer::new(ctx, cfg).run(&tree)
}

pub struct Structurizer<'a> {
    ctx: &'a mut AstContext,
    cfg: &'a mut Cfg,
    order: BlockOrder,
}

impl<'a> Structurizer<'a> {
    pub fn new(ctx: &'a mut AstContext, cfg: &'a mut Cfg) -> Self {
        Self {
            ctx,
            cfg,
            order: BlockOrder::new(),
        }
    }

    /// Reduce the whole region tree to a single statement.
    pub fn run(mut self, tree: &RegionTree) -> StmtId {
        for block in scc::post_order(self.cfg) {
            self.order.push_front(block);
        }
        let begin = self.order.head().expect("cannot structurize an empty CFG");
        self.reduce_region(tree, tree.root, begin, None)
    }

    /// Reduce `region`, whose blocks occupy `[begin, end)` of the ordering.
    fn reduce_region(
        &mut self,
        tree: &RegionTree,
        region: RegionId,
        mut begin: Pos,
        end: Option<Pos>,
    ) -> StmtId {
        for &child_id in &tree.regions[region].children {
            let child = &tree.regions[child_id];
            let entry = child.entry;
            let exit = child.exit.expect("non-root region without exit");

            // Locate the child's range. Both bounds must exist; the region
            // tree was built against this ordering.
            let sub_begin = self
                .order
                .find_in(begin, end, entry)
                .unwrap_or_else(|| panic!("{entry:?}: region entry not in post-order range"));
            let sub_end = self
                .order
                .find_in(sub_begin, end, exit)
                .unwrap_or_else(|| panic!("{exit:?}: region exit not in post-order range"));

            // Reduce the child into a synthetic block and replace its range.
            let replaces_begin = sub_begin == begin;
            let synthetic = self.cfg.create_block();
            let body = self.reduce_region(tree, child_id, sub_begin, Some(sub_end));
            self.cfg.blocks[synthetic].statement = Some(body);
            let inserted = self.order.insert_before(Some(sub_end), synthetic);
            if replaces_begin {
                begin = inserted;
            }
            self.order.erase_range(sub_begin, Some(inserted));

            // External predecessors now reach the synthetic block. Edges
            // from inside the child are its consumed back-edges; retargeting
            // them would hand the synthetic block a predecessor unknown to
            // the outer fold and turn its reaching condition into `true`.
            let entry_preds = std::mem::take(&mut self.cfg.blocks[entry].preds);
            for edge in entry_preds {
                let from = self.cfg.edges[edge].from;
                if tree.regions[child_id].contains(from) {
                    self.cfg.blocks[from].succs.retain(|&e| e != edge);
                } else {
                    self.cfg.edges[edge].to = synthetic;
                    self.cfg.blocks[synthetic].preds.push(edge);
                }
            }

            // Collapse internal edges into the exit behind one `true` edge.
            let exit_preds = self.cfg.blocks[exit].preds.clone();
            for edge in exit_preds {
                if tree.regions[child_id].contains(self.cfg.edges[edge].from) {
                    self.cfg.detach_edge(edge);
                }
            }
            let t = self.ctx.expr_true();
            self.cfg.create_edge(synthetic, exit, t);
        }

        self.fold_basic_blocks(begin, end)
    }

    /// Fold a flat range of blocks into one statement.
    fn fold_basic_blocks(&mut self, begin: Pos, end: Option<Pos>) -> StmtId {
        let out = self.ctx.sequence();
        let mut reach: HashMap<BlockId, ExprId> = HashMap::new();
        let mut members: HashSet<BlockId> = HashSet::new();
        let mut is_loop = false;
        let t = self.ctx.expr_true();

        let mut cursor = Some(begin);
        while cursor != end {
            let pos = cursor.expect("range end not reachable from range start");
            let block = self.order.block(pos);
            cursor = self.order.next(pos);

            // Any successor edge back into the range means this is a loop.
            members.insert(block);
            if !is_loop {
                is_loop = self
                    .cfg
                    .succ_blocks(block)
                    .any(|target| members.contains(&target));
            }

            // The reaching condition: one disjunct per predecessor edge, in
            // insertion order. A predecessor without a recorded condition is
            // outside the range (or a back-edge source not yet folded) and
            // contributes plain `true`: the range entry is unconditional
            // once the range is entered.
            let mut disjunct: Option<ExprId> = None;
            for edge in self.cfg.blocks[block].preds.clone() {
                let from = self.cfg.edges[edge].from;
                let (edge_cond, parent) = match reach.get(&from) {
                    Some(&parent) => (self.cfg.edges[edge].condition, Some(parent)),
                    None => (t, None),
                };
                let combined = match parent {
                    None => edge_cond,
                    Some(parent) if edge_cond == t => parent,
                    Some(parent) if parent == t => edge_cond,
                    Some(parent) => self.ctx.nary(NaryOp::ShortCircuitAnd, parent, edge_cond),
                };
                disjunct = Some(match disjunct {
                    None => combined,
                    Some(d) => self.ctx.nary(NaryOp::ShortCircuitOr, d, combined),
                });
            }
            let reach_cond = disjunct.unwrap_or(t);

            // The body must be a sequence so a break can be appended later.
            let body = self.cfg.sequence_statement(self.ctx, block);
            let emitted = if reach_cond == t {
                body
            } else {
                self.ctx.if_else(reach_cond, body)
            };
            self.ctx.push_to_sequence(out, emitted);

            let previous = reach.insert(block, reach_cond);
            debug_assert!(previous.is_none(), "block folded twice: {block:?}");
        }

        // Loop wrap-up. The top-level range has no successor to break to
        // and is returned as-is.
        if is_loop {
            if let Some(end_pos) = end {
                let sentinel = self.order.block(end_pos);
                for edge in self.cfg.blocks[sentinel].preds.clone() {
                    let from = self.cfg.edges[edge].from;
                    if members.contains(&from) {
                        let condition = self.cfg.edges[edge].condition;
                        let brk = self.ctx.break_stmt(condition);
                        let body = self.cfg.blocks[from]
                            .statement
                            .expect("folded block lost its body");
                        assert!(
                            self.ctx.is_sequence(body),
                            "folded block body is not a sequence"
                        );
                        self.ctx.push_to_sequence(body, brk);
                    }
                }
                return self.ctx.loop_stmt(t, LoopKind::PreTested, out);
            }
        }

        out
    }
}
