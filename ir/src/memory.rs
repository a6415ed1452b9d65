//! Buffers, tensors, and shape extents.

use crate::arena::BufferId;
use ingot_dtype::ScalarType;

/// One dimension of a buffer or tensor shape: a resolved constant or a named
/// symbolic parameter, substituted by the pipeline when statically known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extent {
    Const(i64),
    Param(String),
}

impl Extent {
    pub fn as_const(&self) -> Option<i64> {
        match self {
            Extent::Const(v) => Some(*v),
            Extent::Param(_) => None,
        }
    }
}

/// Storage scope of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageScope {
    #[default]
    Global,
    /// Accelerator work-group local storage.
    Local,
}

/// Named, shaped memory region. Identity within a module is the name.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub name: String,
    pub elem: ScalarType,
    pub shape: Vec<Extent>,
    /// Explicit alignment override; `None` means the element type's natural
    /// alignment.
    pub alignment: Option<u32>,
    pub scope: StorageScope,
}

impl Buffer {
    pub fn new(name: impl Into<String>, elem: ScalarType, shape: Vec<Extent>) -> Self {
        Self { name: name.into(), elem, shape, alignment: None, scope: StorageScope::Global }
    }

    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_scope(mut self, scope: StorageScope) -> Self {
        self.scope = scope;
        self
    }

    /// Element count, if every extent is resolved. Negative extents never
    /// survive resolution.
    pub fn element_count(&self) -> Option<i64> {
        self.shape.iter().try_fold(1i64, |acc, e| Some(acc * e.as_const()?))
    }

    /// Effective alignment: the override, or the element's natural alignment.
    pub fn effective_alignment(&self) -> u32 {
        self.alignment.unwrap_or_else(|| self.elem.natural_alignment())
    }
}

/// Named multi-dimensional view over a buffer.
///
/// `domain` is the iteration shape used by scheduling; `shape` is the
/// allocated shape the row-major layout is computed against. Any store or
/// load through a tensor requires `binding` to be set.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub domain: Vec<Extent>,
    pub shape: Vec<Extent>,
    pub binding: Option<BufferId>,
}

impl Tensor {
    pub fn new(name: impl Into<String>, shape: Vec<Extent>) -> Self {
        Self { name: name.into(), domain: shape.clone(), shape, binding: None }
    }

    pub fn bound_to(mut self, buffer: BufferId) -> Self {
        self.binding = Some(buffer);
        self
    }
}
