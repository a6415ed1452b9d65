//! The native module handed to the emission/execution collaborator.

use cranelift_codegen::ir::Function;

/// One compiled function with its Cranelift body.
pub struct NativeFunc {
    pub name: String,
    pub func: Function,
}

impl std::fmt::Debug for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunc").field("name", &self.name).finish_non_exhaustive()
    }
}

impl NativeFunc {
    /// Rendered Cranelift IR text.
    pub fn clif(&self) -> String {
        self.func.display().to_string()
    }
}

/// Compiled native module: named functions in declaration order plus the
/// extern symbols they reference. Extern symbol index `i` corresponds to
/// Cranelift user external name `u1:i`; module functions are `u0:i` in
/// declaration order.
#[derive(Debug)]
pub struct NativeModule {
    pub name: String,
    functions: Vec<NativeFunc>,
    pub extern_symbols: Vec<String>,
    /// String constants referenced by emitted code as table indices.
    pub string_table: Vec<String>,
}

impl NativeModule {
    pub(crate) fn new(
        name: String,
        functions: Vec<NativeFunc>,
        extern_symbols: Vec<String>,
        string_table: Vec<String>,
    ) -> Self {
        Self { name, functions, extern_symbols, string_table }
    }

    /// Look up a compiled function by name.
    pub fn get(&self, name: &str) -> Option<&NativeFunc> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn functions(&self) -> &[NativeFunc] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
