//! Lower intra-module call-site variable bindings.
//!
//! Call sites naming a function of the same module pass tensors; the codegen
//! calling convention passes raw buffers. Each tensor argument is lowered to
//! the buffer its binding resolves to — an unbound tensor at a call site is
//! a fatal error, exactly like an unbound tensor at a store.

use std::collections::HashSet;

use ingot_ir::{Expr, Module};

use super::helpers::walk_mut;
use crate::error::Result;

pub fn bind_call_vars(module: &mut Module) -> Result<()> {
    let local_functions: HashSet<String> = module.functions.iter().map(|f| f.name.clone()).collect();

    for func in &mut module.functions {
        let body = func.body;
        let mut failure = None;
        walk_mut(&mut func.arena, body, &mut |arena, id| {
            if failure.is_some() {
                return;
            }
            let Expr::Call { name, args, .. } = arena.expr(id) else {
                return;
            };
            if !local_functions.contains(name) {
                return;
            }
            let mut lowered = Vec::new();
            for (i, arg) in args.iter().enumerate() {
                let Expr::TensorRef { tensor } = arena.expr(*arg) else {
                    continue;
                };
                match arena.tensor(*tensor).binding {
                    Some(buffer) => lowered.push((i, buffer)),
                    None => {
                        failure = Some(ingot_ir::Error::UnboundTensor { name: arena.tensor(*tensor).name.clone() });
                        return;
                    }
                }
            }
            for (i, buffer) in lowered {
                let buffer_ref = arena.push(Expr::BufferRef { buffer });
                let Expr::Call { args, .. } = arena.expr_mut(id) else {
                    unreachable!("matched above");
                };
                args[i] = buffer_ref;
            }
        });
        if let Some(err) = failure {
            return Err(err.into());
        }
    }
    Ok(())
}
