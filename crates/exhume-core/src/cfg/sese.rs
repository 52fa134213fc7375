//! Single-entry/single-exit normalization of cycles.
//!
//! Every strongly connected subgraph with an internal edge is rewritten so
//! that exactly one block receives edges from outside it and exactly one
//! block outside it receives edges from inside. Multi-entry and multi-exit
//! cycles get a redirector block dispatching on a synthesized selector.
//!
//! Back-edges found inside a component are added to the entering-edge set,
//! so when a redirector is needed the loop's continuation also routes
//! through it and the redirector becomes the one true header. An edge only
//! counts as a back-edge when its target is on the active DFS path;
//! classifying mere already-visited targets would turn cross-edges inside a
//! previously normalized cycle into fresh entries and the pass would never
//! reach a fixpoint.

use std::collections::HashSet;

use crate::ast::AstContext;

use super::{scc, BlockId, Cfg, EdgeId};

/// Rewrite `cfg` so every cycle is single-entry/single-exit.
pub fn normalize_cycles(ctx: &mut AstContext, cfg: &mut Cfg) {
    let components: Vec<Vec<BlockId>> = scc::strongly_connected_components(cfg)
        .into_iter()
        .filter(|c| scc::has_internal_edge(cfg, c))
        .collect();

    for component in components {
        normalize_component(ctx, cfg, &component);
    }
}

fn normalize_component(ctx: &mut AstContext, cfg: &mut Cfg, component: &[BlockId]) {
    let members: HashSet<BlockId> = component.iter().copied().collect();

    let mut entry_nodes: Vec<BlockId> = Vec::new();
    let mut exit_nodes: Vec<BlockId> = Vec::new();
    let mut entering_edges: Vec<EdgeId> = Vec::new();
    let mut exiting_edges: Vec<EdgeId> = Vec::new();

    for &block in component {
        for &edge in &cfg.blocks[block].preds {
            if !members.contains(&cfg.edges[edge].from) {
                entering_edges.push(edge);
                push_unique(&mut entry_nodes, block);
            }
        }
        for &edge in &cfg.blocks[block].succs {
            let target = cfg.edges[edge].to;
            if !members.contains(&target) {
                exiting_edges.push(edge);
                push_unique(&mut exit_nodes, target);
            }
        }
    }

    // Depth-first walk restricted to the component, starting from its DFS
    // root. Edges closing back to the active path are the component's
    // back-edges; their targets join the entry set so a redirector (when
    // one is needed) captures the loop continuation too.
    let root = component[0];
    let mut visited: HashSet<BlockId> = HashSet::new();
    let mut on_path: HashSet<BlockId> = HashSet::new();
    let mut frames: Vec<(BlockId, usize)> = Vec::new();
    visited.insert(root);
    on_path.insert(root);
    frames.push((root, 0));

    while let Some(&mut (block, ref mut next)) = frames.last_mut() {
        let succs = &cfg.blocks[block].succs;
        if *next < succs.len() {
            let edge = succs[*next];
            *next += 1;
            let target = cfg.edges[edge].to;
            if on_path.contains(&target) {
                entering_edges.push(edge);
                push_unique(&mut entry_nodes, target);
            } else if members.contains(&target) && visited.insert(target) {
                on_path.insert(target);
                frames.push((target, 0));
            }
        } else {
            on_path.remove(&block);
            frames.pop();
        }
    }
    // A strongly connected component is reachable in full from any member.
    assert_eq!(
        visited.len(),
        component.len(),
        "SCC traversal failed to reach every member"
    );

    if entry_nodes.len() > 1 {
        cfg.create_redirector_block(ctx, &entering_edges);
    }
    if exit_nodes.len() > 1 {
        cfg.create_redirector_block(ctx, &exiting_edges);
    }
}

fn push_unique(nodes: &mut Vec<BlockId>, block: BlockId) {
    if !nodes.contains(&block) {
        nodes.push(block);
    }
}
