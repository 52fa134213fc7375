//! Decompiler AST back-end.
//!
//! Takes the unstructured control-flow graph of a lifted function and
//! recovers an equivalent structured statement tree of sequences,
//! conditionals and loops with explicit breaks, without `goto`:
//!
//! 1. [`cfg::sese`] normalizes every cycle to a single entry and a single
//!    exit by inserting redirector blocks dispatching on a synthesized
//!    selector.
//! 2. [`cfg::region`] computes nested single-entry/single-exit regions
//!    from dominance and post-dominance information.
//! 3. [`structurize`] reduces the region tree bottom-up, folding each flat
//!    block range into one statement via reaching conditions and wrapping
//!    back-edge ranges in pre-tested loops with conditional breaks.
//!
//! [`pipeline::AstBackend`] drives the whole module: it structurizes every
//! non-prototype function, orders the emitted nodes by virtual address and
//! name, and runs registered [`ast::passes`] over the result.

pub mod ast;
pub mod cfg;
pub mod entity;
pub mod error;
pub mod module;
pub mod pipeline;
pub mod structurize;
