//! The pipeline's passes, one per module.
//!
//! Every pass is a total transformation over a function (or module) that the
//! driver applies in a fixed order; later passes assume earlier ones'
//! postconditions, so the order in [`crate::optimize`] is a correctness
//! contract.

mod accel;
mod bind_call_vars;
mod canonicalize_loops;
mod debug_log;
mod flatten_blocks;
mod fold_conditionals;
mod helpers;
mod lower_intrin;
mod map_extern_calls;
mod multi_output_calls;
mod normalize_bool;
mod pack_call_args;
mod schedule_blocks;
mod simplify;
mod substitute_params;
mod unroll_loops;
mod vectorize_loops;

pub use accel::{ACCEL_BARRIER, bind_accel_axes, insert_sync_barriers, strip_accel_loops};
pub use bind_call_vars::bind_call_vars;
pub use canonicalize_loops::canonicalize_loops;
pub use debug_log::{DEBUG_LOG_CALLEE, insert_debug_log};
pub use flatten_blocks::flatten_blocks;
pub use fold_conditionals::fold_conditionals;
pub use lower_intrin::{FMA_INTRINSIC, lower_intrin};
pub use map_extern_calls::map_extern_calls;
pub use multi_output_calls::materialize_multi_output_calls;
pub use normalize_bool::normalize_bool;
pub use pack_call_args::pack_call_args;
pub use schedule_blocks::remove_schedule_blocks;
pub use simplify::simplify;
pub use substitute_params::substitute_params;
pub use unroll_loops::unroll_loops;
pub use vectorize_loops::vectorize_loops;
