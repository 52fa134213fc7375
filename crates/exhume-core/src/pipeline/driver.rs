//! The module driver.
//!
//! Runs the function driver over every non-prototype function of a lifted
//! module, sorts the emitted nodes by virtual address then name, and runs
//! registered AST passes in registration order.

use log::debug;

use crate::ast::passes::AstPass;
use crate::error::CoreError;
use crate::module::{FunctionNode, LiftedModule};
use crate::pipeline::config::DebugConfig;
use crate::structurize::structurize_function;

pub struct AstBackend {
    passes: Vec<Box<dyn AstPass>>,
    debug: DebugConfig,
}

impl AstBackend {
    pub fn new() -> Self {
        Self::with_debug(DebugConfig::none())
    }

    pub fn with_debug(debug: DebugConfig) -> Self {
        Self {
            passes: Vec::new(),
            debug,
        }
    }

    /// Register an AST pass. Passes run in registration order after all
    /// functions are structurized.
    pub fn add_pass(&mut self, pass: Box<dyn AstPass>) {
        self.passes.push(pass);
    }

    /// Structurize every function of `module` and run the registered
    /// passes over the emitted nodes.
    pub fn run(&self, module: LiftedModule) -> Result<Vec<FunctionNode>, CoreError> {
        let mut nodes = Vec::with_capacity(module.functions.len());
        for mut function in module.functions.into_values() {
            let body = if function.prototype {
                debug!("skipping prototype {}", function.name);
                None
            } else {
                if function.cfg.blocks.is_empty() {
                    return Err(CoreError::InvalidCfg {
                        function: function.name,
                        message: "lifted function has no blocks".into(),
                    });
                }
                debug!(
                    "structurizing {} at {:#x} ({} blocks)",
                    function.name,
                    function.virtual_address,
                    function.cfg.blocks.len()
                );
                Some(structurize_function(&mut function.ctx, &mut function.cfg))
            };
            nodes.push(FunctionNode {
                name: function.name,
                virtual_address: function.virtual_address,
                ctx: function.ctx,
                body,
            });
        }

        nodes.sort_by(|a, b| {
            a.virtual_address
                .cmp(&b.virtual_address)
                .then_with(|| a.name.cmp(&b.name))
        });

        if self.debug.dump_ast {
            for node in &nodes {
                if let Some(body) = node.body {
                    if self.debug.should_dump(&node.name) {
                        eprintln!(
                            "=== AST: {} ===\n{}=== end AST ===\n",
                            node.name,
                            node.ctx.display_stmt(body)
                        );
                    }
                }
            }
        }

        for pass in &self.passes {
            debug!("running AST pass {}", pass.name());
            pass.run(&mut nodes)?;
        }

        Ok(nodes)
    }
}

impl Default for AstBackend {
    fn default() -> Self {
        Self::new()
    }
}
