//! The mutable block ordering the structurizer reduces over.
//!
//! Region reduction inserts synthetic blocks and erases consumed ranges
//! while positions into unrelated parts of the list stay live, so this is
//! an arena-backed doubly-linked list: a `Pos` is an index into the node
//! arena and survives any insertion or erasure that does not remove the
//! node it points at. Unlinked nodes stay in the arena.

use crate::cfg::BlockId;

/// Stable position handle. `None` as a range end means "past the tail".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos(u32);

#[derive(Debug)]
struct Node {
    block: BlockId,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Doubly-linked list of blocks, head-first.
#[derive(Debug, Default)]
pub struct BlockOrder {
    nodes: Vec<Node>,
    head: Option<u32>,
    tail: Option<u32>,
}

impl BlockOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<Pos> {
        self.head.map(Pos)
    }

    pub fn block(&self, pos: Pos) -> BlockId {
        self.nodes[pos.0 as usize].block
    }

    pub fn next(&self, pos: Pos) -> Option<Pos> {
        self.nodes[pos.0 as usize].next.map(Pos)
    }

    /// Prepend a block. Feeding a post-order traversal through this yields
    /// the entry-first ordering the structurizer works on.
    pub fn push_front(&mut self, block: BlockId) -> Pos {
        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            block,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(old) => self.nodes[old as usize].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        Pos(index)
    }

    /// Insert a block before `at`; `None` appends at the tail.
    pub fn insert_before(&mut self, at: Option<Pos>, block: BlockId) -> Pos {
        let index = self.nodes.len() as u32;
        let (prev, next) = match at {
            Some(Pos(at)) => (self.nodes[at as usize].prev, Some(at)),
            None => (self.tail, None),
        };
        self.nodes.push(Node { block, prev, next });
        match prev {
            Some(p) => self.nodes[p as usize].next = Some(index),
            None => self.head = Some(index),
        }
        match next {
            Some(n) => self.nodes[n as usize].prev = Some(index),
            None => self.tail = Some(index),
        }
        Pos(index)
    }

    /// Unlink `[from, to)`. Positions into the erased range become dead.
    ///
    /// An unlinked node keeps its last link fields. `from` may itself be a
    /// node that an earlier erase already unlinked, as long as its
    /// recorded predecessor is still live and adjacent to the remainder of
    /// the range; the region reducer relies on this when a child region
    /// shares its entry block with a nested region it reduced first.
    pub fn erase_range(&mut self, from: Pos, to: Option<Pos>) {
        let prev = self.nodes[from.0 as usize].prev;
        match prev {
            Some(p) => self.nodes[p as usize].next = to.map(|p| p.0),
            None => self.head = to.map(|p| p.0),
        }
        match to {
            Some(Pos(t)) => self.nodes[t as usize].prev = prev,
            None => self.tail = prev,
        }
    }

    /// Find `target` in `[start, end)`.
    pub fn find_in(&self, start: Pos, end: Option<Pos>, target: BlockId) -> Option<Pos> {
        let mut cursor = Some(start);
        while cursor != end {
            let pos = cursor.expect("range end not reachable from range start");
            if self.block(pos) == target {
                return Some(pos);
            }
            cursor = self.next(pos);
        }
        None
    }

    /// Blocks of `[start, end)` in list order.
    pub fn blocks_in(&self, start: Option<Pos>, end: Option<Pos>) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut cursor = start;
        while cursor != end {
            let pos = cursor.expect("range end not reachable from range start");
            out.push(self.block(pos));
            cursor = self.next(pos);
        }
        out
    }
}
