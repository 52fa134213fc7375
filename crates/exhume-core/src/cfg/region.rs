//! Region analysis: nested single-entry/single-exit subgraphs.
//!
//! A candidate pair `(entry, exit)` is tested with the classic
//! dominance-frontier formulation: walking up the post-dominator chain of
//! each block, a pair forms a region when no edge leaves the dominated zone
//! except through the exit and no edge enters it from beyond the exit. The
//! non-dominated branch of the test accepts loop-shaped regions whose exit
//! is a sibling of the header rather than a descendant.
//!
//! Candidates carry explicit member sets (everything reachable from the
//! entry without crossing the exit). Nesting is by member-set inclusion,
//! with two extra acceptance constraints the structurizer relies on:
//!
//! - a region's entry precedes its exit in the entry-first post-order list;
//! - a child's exit lies strictly inside its parent's member set, so the
//!   reduction loop can always locate it in the parent's range.
//!
//! A candidate that would break either constraint is dropped. That never
//! loses correctness: blocks of a dropped candidate are folded inline by
//! the structurizer with identical semantics, just less nesting.

use std::collections::{HashMap, HashSet};

use crate::define_entity;
use crate::entity::PrimaryMap;

use super::dom::DomInfo;
use super::{scc, BlockId, Cfg};

define_entity!(RegionId);

/// One region of the tree. Only the root has no exit; its range runs to
/// the end of the post-order list.
#[derive(Debug)]
pub struct Region {
    pub entry: BlockId,
    pub exit: Option<BlockId>,
    pub children: Vec<RegionId>,
    members: HashSet<BlockId>,
}

impl Region {
    pub fn contains(&self, block: BlockId) -> bool {
        self.members.contains(&block)
    }

    pub fn members(&self) -> &HashSet<BlockId> {
        &self.members
    }
}

/// The region tree of one function.
#[derive(Debug)]
pub struct RegionTree {
    pub regions: PrimaryMap<RegionId, Region>,
    pub root: RegionId,
}

struct Candidate {
    entry: BlockId,
    exit: BlockId,
    members: HashSet<BlockId>,
}

impl RegionTree {
    pub fn build(cfg: &Cfg, dom: &DomInfo) -> Self {
        let order = scc::post_order(cfg);
        // Entry-first position of every reachable block.
        let rpo: HashMap<BlockId, usize> = order
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &b)| (b, i))
            .collect();

        let mut candidates = collect_candidates(cfg, dom, &order, &rpo);
        candidates.sort_by_key(|c| (c.members.len(), rpo[&c.entry], rpo[&c.exit]));

        // Accept candidates smallest-first, nesting by member inclusion.
        let mut accepted: Vec<Candidate> = Vec::new();
        let mut parent: Vec<Option<usize>> = Vec::new();
        'next: for cand in candidates {
            for (i, prior) in accepted.iter().enumerate() {
                let nested = prior.members.is_subset(&cand.members);
                if nested && prior.members.len() == cand.members.len() {
                    continue 'next; // duplicate span
                }
                if !nested && !prior.members.is_disjoint(&cand.members) {
                    continue 'next; // partial overlap
                }
                if nested && parent[i].is_none() && !cand.members.contains(&prior.exit) {
                    continue 'next; // would orphan the smaller region's exit
                }
            }
            let index = accepted.len();
            for (i, prior) in accepted.iter().enumerate() {
                if parent[i].is_none() && prior.members.is_subset(&cand.members) {
                    parent[i] = Some(index);
                }
            }
            accepted.push(cand);
            parent.push(None);
        }

        // Materialize the tree.
        let mut regions: PrimaryMap<RegionId, Region> = PrimaryMap::new();
        let root = regions.push(Region {
            entry: cfg.entry(),
            exit: None,
            children: Vec::new(),
            members: order.iter().copied().collect(),
        });
        let mut ids = Vec::with_capacity(accepted.len());
        for cand in accepted {
            ids.push(regions.push(Region {
                entry: cand.entry,
                exit: Some(cand.exit),
                children: Vec::new(),
                members: cand.members,
            }));
        }
        for (i, p) in parent.iter().enumerate() {
            let target = p.map(|j| ids[j]).unwrap_or(root);
            regions[target].children.push(ids[i]);
        }
        // Children in entry order, so reduction is deterministic.
        for &id in ids.iter().chain(std::iter::once(&root)) {
            let mut children = std::mem::take(&mut regions[id].children);
            children.sort_by_key(|&c| rpo[&regions[c].entry]);
            regions[id].children = children;
        }

        Self { regions, root }
    }
}

fn collect_candidates(
    cfg: &Cfg,
    dom: &DomInfo,
    order: &[BlockId],
    rpo: &HashMap<BlockId, usize>,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for &entry in order.iter().rev() {
        let mut cursor = dom.ipdom.get(&entry).copied();
        while let Some(exit) = cursor {
            if exit == dom.virtual_exit {
                break;
            }
            if exit != entry && is_region(cfg, dom, entry, exit) {
                let members = collect_members(cfg, entry, exit);
                let ordered = rpo
                    .get(&exit)
                    .is_some_and(|&x| rpo[&entry] < x);
                let nontrivial = members.len() > 1 || has_self_loop(cfg, entry);
                if ordered && nontrivial {
                    candidates.push(Candidate {
                        entry,
                        exit,
                        members,
                    });
                }
            }
            cursor = dom.ipdom.get(&exit).copied();
        }
    }
    candidates
}

/// The dominance-frontier SESE test.
fn is_region(cfg: &Cfg, dom: &DomInfo, entry: BlockId, exit: BlockId) -> bool {
    let empty = HashSet::new();
    let df_entry = dom.frontier.get(&entry).unwrap_or(&empty);

    if !dom.dominates(entry, exit) {
        // Loop-shaped region: the exit is outside the zone the header
        // dominates, so the frontier may only contain the header itself
        // (the back-edge) and the exit.
        return df_entry.iter().all(|&s| s == entry || s == exit);
    }

    let df_exit = dom.frontier.get(&exit).unwrap_or(&empty);

    // No edge leaves the region except through the exit.
    for &s in df_entry {
        if s == entry || s == exit {
            continue;
        }
        if !df_exit.contains(&s) {
            return false;
        }
        if !common_frontier(cfg, dom, s, entry, exit) {
            return false;
        }
    }

    // No edge enters the region from beyond the exit.
    for &s in df_exit {
        if dom.properly_dominates(entry, s) && s != exit {
            return false;
        }
    }

    true
}

/// Every predecessor of `block` dominated by `entry` must also be
/// dominated by `exit`, otherwise `block` is an escape from inside the
/// candidate region.
fn common_frontier(cfg: &Cfg, dom: &DomInfo, block: BlockId, entry: BlockId, exit: BlockId) -> bool {
    cfg.pred_blocks(block)
        .all(|p| !dom.dominates(entry, p) || dom.dominates(exit, p))
}

/// Everything reachable from `entry` without crossing `exit`.
fn collect_members(cfg: &Cfg, entry: BlockId, exit: BlockId) -> HashSet<BlockId> {
    let mut members = HashSet::new();
    let mut stack = vec![entry];
    members.insert(entry);
    while let Some(block) = stack.pop() {
        for target in cfg.succ_blocks(block) {
            if target != exit && members.insert(target) {
                stack.push(target);
            }
        }
    }
    members
}

fn has_self_loop(cfg: &Cfg, block: BlockId) -> bool {
    cfg.succ_blocks(block).any(|t| t == block)
}
