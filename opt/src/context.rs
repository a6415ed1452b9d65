//! Explicitly constructed pipeline context.
//!
//! Everything a pass consults beyond the IR itself travels through
//! [`PassContext`]: symbolic parameter bindings, the per-target intrinsic
//! signature table, and the schedule-IR feature flag. There is no ambient
//! mutable registry; the one process-wide object is the builtin intrinsic
//! table behind a `OnceLock`, initialized exactly once and read-only
//! afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use ingot_dtype::ScalarType;
use ingot_ir::{ArchClass, Target};

/// Per-target mapping from an external callee (name + first-argument scalar
/// type) to the runtime/library symbol implementing it.
#[derive(Debug, Clone, Default)]
pub struct IntrinsicTable {
    entries: HashMap<(ArchClass, String, ScalarType), String>,
}

impl IntrinsicTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        arch: ArchClass,
        name: impl Into<String>,
        arg: ScalarType,
        symbol: impl Into<String>,
    ) {
        self.entries.insert((arch, name.into(), arg), symbol.into());
    }

    pub fn lookup(&self, target: &Target, name: &str, arg: ScalarType) -> Option<&str> {
        self.entries.get(&(target.arch, name.to_owned(), arg)).map(String::as_str)
    }

    /// The default host/accelerator math mapping.
    ///
    /// Float entries exist for 32- and 64-bit widths; the boolean reduction
    /// helpers (`any`, `all`) are keyed on int8 — the normalized boolean
    /// storage type — so only arguments that went through boolean-result
    /// normalization match.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for name in ["exp", "log", "sin", "cos", "tan", "tanh", "sqrt", "erf", "fabs", "pow"] {
            for bits in [32u16, 64] {
                let arg = ScalarType::float(bits);
                table.register(ArchClass::Cpu, name, arg, format!("ingot_cpu_{name}_fp{bits}"));
                table.register(ArchClass::Accelerator, name, arg, format!("accel.{name}.f{bits}"));
            }
        }
        for name in ["any", "all"] {
            table.register(ArchClass::Cpu, name, ScalarType::int8(), format!("ingot_cpu_{name}_i8"));
            table.register(ArchClass::Accelerator, name, ScalarType::int8(), format!("accel.{name}.i8"));
        }
        table
    }

    /// Shared builtin table. The first call performs the one-time
    /// synchronized initialization; call it once during startup, before
    /// spawning concurrent compilations, so no compilation ever races on
    /// table construction.
    pub fn builtin_shared() -> &'static Self {
        static BUILTIN: OnceLock<IntrinsicTable> = OnceLock::new();
        BUILTIN.get_or_init(Self::builtin)
    }
}

/// Context threaded through a pipeline run.
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Symbolic integer parameters resolvable to literals.
    pub const_params: BTreeMap<String, i64>,
    /// Per-target external-call signature table.
    pub intrinsics: IntrinsicTable,
    /// Enables the module-level unroll+vectorize subset.
    pub schedule_ir: bool,
}

impl PassContext {
    pub fn new(intrinsics: IntrinsicTable) -> Self {
        Self { const_params: BTreeMap::new(), intrinsics, schedule_ir: false }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: i64) -> Self {
        self.const_params.insert(name.into(), value);
        self
    }

    pub fn with_schedule_ir(mut self, enabled: bool) -> Self {
        self.schedule_ir = enabled;
        self
    }
}

impl Default for PassContext {
    fn default() -> Self {
        Self::new(IntrinsicTable::builtin_shared().clone())
    }
}
