//! Module-level containers: the driver's input and output.
//!
//! A `LiftedModule` is what the lifting front-end hands over: one CFG and
//! AST context per function, plus the metadata the driver sorts and filters
//! on. A `FunctionNode` is what comes out the other side, body structured.

use serde::{Deserialize, Serialize};

use crate::ast::{AstContext, StmtId};
use crate::cfg::Cfg;
use crate::define_entity;
use crate::entity::PrimaryMap;

define_entity!(FuncId);

/// A lifted function awaiting structurization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiftedFunction {
    pub name: String,
    pub virtual_address: u64,
    /// Prototypes have no body to recover and pass through untouched.
    pub prototype: bool,
    pub ctx: AstContext,
    pub cfg: Cfg,
}

/// The driver input: a module of lifted functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiftedModule {
    pub name: String,
    pub functions: PrimaryMap<FuncId, LiftedFunction>,
}

impl LiftedModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: PrimaryMap::new(),
        }
    }

    pub fn add_function(&mut self, function: LiftedFunction) -> FuncId {
        self.functions.push(function)
    }
}

/// An emitted function node: metadata plus the recovered body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionNode {
    pub name: String,
    pub virtual_address: u64,
    pub ctx: AstContext,
    /// `None` for prototypes.
    pub body: Option<StmtId>,
}
