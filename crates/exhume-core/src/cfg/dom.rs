//! Dominator and post-dominator trees (Lengauer-Tarjan) and dominance
//! frontiers.
//!
//! Post-dominators are computed on the reversed graph from a virtual exit
//! node that every block without successors flows to. Blocks that cannot
//! reach any exit (a cycle with no way out) have no post-dominator entry;
//! region analysis simply finds no regions among them and the structurizer
//! folds them flat.

use std::collections::{HashMap, HashSet};

use crate::entity::EntityRef;

use super::{BlockId, Cfg};

/// Dominance information for one CFG.
pub struct DomInfo {
    /// Immediate dominators. The entry maps to itself.
    pub idom: HashMap<BlockId, BlockId>,
    /// Immediate post-dominators, rooted at `virtual_exit`.
    pub ipdom: HashMap<BlockId, BlockId>,
    /// Dominance frontier of the forward dominator tree.
    pub frontier: HashMap<BlockId, HashSet<BlockId>>,
    /// Sentinel all function exits flow to; never a real block.
    pub virtual_exit: BlockId,
}

impl DomInfo {
    pub fn compute(cfg: &Cfg) -> Self {
        let (succs, preds) = adjacency(cfg);
        let entry = cfg.entry();
        let idom = compute_dominators_lt(entry, &preds, &succs);
        let virtual_exit = BlockId::new(u32::MAX);
        let ipdom = compute_post_dominators(cfg, &succs, virtual_exit);
        let frontier = dominance_frontier(&idom, &preds);
        Self {
            idom,
            ipdom,
            frontier,
            virtual_exit,
        }
    }

    /// Check if `a` dominates `b` (reflexively).
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.idom.get(&cur) {
                Some(&parent) if parent != cur => cur = parent,
                _ => return false,
            }
        }
    }

    pub fn properly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }
}

/// Successor and predecessor block maps for all reachable blocks.
fn adjacency(
    cfg: &Cfg,
) -> (
    HashMap<BlockId, Vec<BlockId>>,
    HashMap<BlockId, Vec<BlockId>>,
) {
    let mut succs: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    let mut preds: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    for block in super::scc::post_order(cfg) {
        succs.entry(block).or_default();
        preds.entry(block).or_default();
    }
    for edge in cfg.edges.values() {
        if succs.contains_key(&edge.from) {
            succs.entry(edge.from).or_default().push(edge.to);
            preds.entry(edge.to).or_default().push(edge.from);
        }
    }
    (succs, preds)
}

/// Iterative path compression for the Lengauer-Tarjan union-find forest.
///
/// Updates `label` entries so each node records the vertex with minimum
/// `semi` value on its path to the forest root, and compresses ancestor
/// pointers for future lookups. `usize::MAX` in `ancestor` means "root".
fn lt_compress(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) {
    let mut path = Vec::new();
    let mut u = v;
    while ancestor[u] != usize::MAX && ancestor[ancestor[u]] != usize::MAX {
        path.push(u);
        u = ancestor[u];
    }
    for &node in path.iter().rev() {
        let a = ancestor[node];
        if semi[label[a]] < semi[label[node]] {
            label[node] = label[a];
        }
        ancestor[node] = ancestor[a];
    }
}

/// EVAL: the vertex with minimum semidominator on the path from `v` to the
/// root of its tree in the forest.
fn lt_eval(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) -> usize {
    if ancestor[v] == usize::MAX {
        return v;
    }
    lt_compress(v, ancestor, label, semi);
    label[v]
}

/// Lengauer-Tarjan dominator tree computation over predecessor/successor
/// maps. Shared by the forward and the reversed (post-dominator) direction.
fn compute_dominators_lt(
    entry: BlockId,
    preds: &HashMap<BlockId, Vec<BlockId>>,
    succs: &HashMap<BlockId, Vec<BlockId>>,
) -> HashMap<BlockId, BlockId> {
    // Phase 1: iterative DFS numbering.
    let mut dfnum: HashMap<BlockId, usize> = HashMap::new();
    let mut vertex: Vec<BlockId> = Vec::new();
    let mut dfs_parent: Vec<usize> = Vec::new();

    let mut stack: Vec<(BlockId, usize)> = vec![(entry, usize::MAX)];
    while let Some((block, parent_df)) = stack.pop() {
        if dfnum.contains_key(&block) {
            continue;
        }
        let df = vertex.len();
        dfnum.insert(block, df);
        vertex.push(block);
        dfs_parent.push(parent_df);

        if let Some(s) = succs.get(&block) {
            for &succ in s.iter().rev() {
                if !dfnum.contains_key(&succ) {
                    stack.push((succ, df));
                }
            }
        }
    }

    let n = vertex.len();
    if n <= 1 {
        let mut idom = HashMap::new();
        idom.insert(entry, entry);
        return idom;
    }

    // Phase 2: semidominators and candidate immediate dominators.
    let mut semi: Vec<usize> = (0..n).collect();
    let mut idom_idx: Vec<usize> = vec![0; n];
    let mut ancestor: Vec<usize> = vec![usize::MAX; n];
    let mut label: Vec<usize> = (0..n).collect();
    let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in (1..n).rev() {
        let w = vertex[i];
        let p = dfs_parent[i];

        if let Some(w_preds) = preds.get(&w) {
            for &v in w_preds {
                if let Some(&v_df) = dfnum.get(&v) {
                    let u = lt_eval(v_df, &mut ancestor, &mut label, &semi);
                    if semi[u] < semi[i] {
                        semi[i] = semi[u];
                    }
                }
            }
        }

        bucket[semi[i]].push(i);
        ancestor[i] = p;

        for v in std::mem::take(&mut bucket[p]) {
            let u = lt_eval(v, &mut ancestor, &mut label, &semi);
            idom_idx[v] = if semi[u] < semi[v] { u } else { p };
        }
    }

    // Phase 3: final adjustment.
    for i in 1..n {
        if idom_idx[i] != semi[i] {
            idom_idx[i] = idom_idx[idom_idx[i]];
        }
    }

    let mut result = HashMap::with_capacity(n);
    result.insert(entry, entry);
    for i in 1..n {
        result.insert(vertex[i], vertex[idom_idx[i]]);
    }
    result
}

/// Post-dominators via a virtual exit all return blocks flow to.
fn compute_post_dominators(
    cfg: &Cfg,
    succs: &HashMap<BlockId, Vec<BlockId>>,
    virtual_exit: BlockId,
) -> HashMap<BlockId, BlockId> {
    let exits: Vec<BlockId> = succs
        .iter()
        .filter(|(_, s)| s.is_empty())
        .map(|(&b, _)| b)
        .collect();
    if exits.is_empty() {
        return HashMap::new();
    }

    // Reverse graph: forward edge a -> b becomes b -> a.
    let mut rev_succs: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    let mut rev_preds: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    for &block in succs.keys() {
        rev_succs.entry(block).or_default();
        rev_preds.entry(block).or_default();
    }
    for (&block, targets) in succs {
        for &target in targets {
            rev_succs.entry(target).or_default().push(block);
            rev_preds.entry(block).or_default().push(target);
        }
    }

    // Exit ordering must not depend on hash iteration.
    let mut exits = exits;
    exits.sort();
    rev_succs.insert(virtual_exit, exits.clone());
    rev_preds.entry(virtual_exit).or_default();
    for &exit in &exits {
        rev_preds.entry(exit).or_default().push(virtual_exit);
    }

    compute_dominators_lt(virtual_exit, &rev_preds, &rev_succs)
}

/// Dominance frontier of every block.
///
/// The usual join-point walk, except that the entry is not skipped when it
/// has predecessors: a back-edge to the function entry puts the entry in
/// the frontier of everything on the path from the edge source up the
/// dominator tree, and region analysis relies on those entries.
fn dominance_frontier(
    idom: &HashMap<BlockId, BlockId>,
    preds: &HashMap<BlockId, Vec<BlockId>>,
) -> HashMap<BlockId, HashSet<BlockId>> {
    let mut frontier: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
    for (&block, block_preds) in preds {
        let Some(&target_idom) = idom.get(&block) else {
            continue;
        };
        for &pred in block_preds {
            if !idom.contains_key(&pred) {
                continue;
            }
            let mut runner = pred;
            while runner != target_idom {
                frontier.entry(runner).or_default().insert(block);
                match idom.get(&runner) {
                    Some(&parent) if parent != runner => runner = parent,
                    _ => break,
                }
            }
        }
    }
    frontier
}
