//! Optimization pipeline for the ingot compiler.
//!
//! [`optimize`] rewrites one lowered function into the canonical form the
//! code generator is entitled to assume; [`optimize_module`] runs the
//! module-level subset over every function and lowers cross-function calls.
//! Both deep-copy their input before the first rewrite — the caller's tree
//! is never aliased or mutated, which is a checkable invariant.
//!
//! The pass order is fixed and is a correctness contract: each pass assumes
//! the postconditions of the ones before it (the external-call table, for
//! example, is keyed on normalized boolean argument types, so signature
//! mapping must follow boolean normalization). A pass meeting IR that
//! violates its precondition fails the whole compilation; no partial result
//! is ever produced.

pub mod context;
pub mod error;
pub mod passes;


pub use context::{IntrinsicTable, PassContext};
pub use error::{Error, Result};

use ingot_ir::{LoweredFunc, Module, Target};

/// Per-run pipeline switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeOpts {
    /// Insert runtime logging callees at statement boundaries.
    pub debug_info: bool,
    /// Remove accelerator loop wrappers after axis binding.
    pub strip_accel_loops: bool,
}

/// Rewrite a deep copy of `func` into canonical form for `target`.
pub fn optimize(func: &LoweredFunc, target: &Target, ctx: &PassContext, opts: OptimizeOpts) -> Result<LoweredFunc> {
    let mut copied = func.clone();

    passes::pack_call_args(&mut copied)?;
    passes::canonicalize_loops(&mut copied)?;
    passes::substitute_params(&mut copied, ctx)?;
    passes::normalize_bool(&mut copied)?;
    passes::simplify(&mut copied)?;

    passes::unroll_loops(&mut copied)?;
    tracing::debug!(func = %copied.arena.render(copied.body), "after unroll_loops");

    passes::vectorize_loops(&mut copied, target)?;
    tracing::debug!(func = %copied.arena.render(copied.body), "after vectorize_loops");

    if target.is_accelerator() {
        passes::bind_accel_axes(&mut copied)?;
        if opts.strip_accel_loops {
            passes::strip_accel_loops(&mut copied)?;
        }
        passes::insert_sync_barriers(&mut copied)?;
    }

    passes::flatten_blocks(&mut copied)?;
    tracing::debug!(func = %copied.arena.render(copied.body), "after flatten_blocks");

    passes::map_extern_calls(&mut copied, target, ctx)?;
    tracing::debug!(func = %copied.arena.render(copied.body), "after map_extern_calls");

    passes::materialize_multi_output_calls(&mut copied)?;

    passes::normalize_bool(&mut copied)?;
    passes::simplify(&mut copied)?;
    passes::fold_conditionals(&mut copied)?;
    tracing::debug!(func = %copied.arena.render(copied.body), "after fold_conditionals");

    if opts.debug_info {
        tracing::warn!("runtime debug information output enabled");
        passes::insert_debug_log(&mut copied)?;
    }
    Ok(copied)
}

/// Rewrite a deep copy of `module` into the canonical module handed to
/// codegen.
pub fn optimize_module(module: &Module, target: &Target, ctx: &PassContext) -> Result<Module> {
    let mut copied = module.clone();

    if ctx.schedule_ir {
        for func in &mut copied.functions {
            passes::unroll_loops(func)?;
            passes::vectorize_loops(func, target)?;
        }
        tracing::debug!(module = %copied.name, "after schedule-ir unroll+vectorize");
    }

    for func in &mut copied.functions {
        passes::remove_schedule_blocks(func)?;
    }
    passes::bind_call_vars(&mut copied)?;
    for func in &mut copied.functions {
        passes::pack_call_args(func)?;
        passes::lower_intrin(func, target)?;
    }
    tracing::debug!(module = %copied.name, "module pipeline complete");

    Ok(copied)
}
