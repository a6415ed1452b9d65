pub mod cast;

#[cfg(test)]
mod test;

/// Scalar type kind (base numeric category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray)]
#[cfg_attr(any(test, feature = "proptest"), derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    /// 8-bit storage, value domain {0, 1}.
    Bool,
    /// Signed two's-complement integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// IEEE float.
    Float,
}

/// Scalar type descriptor: kind, bit width, and SIMD lane count.
///
/// `lanes == 1` is a plain scalar; `lanes > 1` is a vector of the base
/// scalar. Booleans always use 8-bit storage regardless of how they were
/// produced; every comparison yields a boolean, never an operand-width
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarType {
    pub kind: TypeKind,
    pub bits: u16,
    pub lanes: u16,
}

impl ScalarType {
    pub const fn new(kind: TypeKind, bits: u16) -> Self {
        Self { kind, bits, lanes: 1 }
    }

    pub const fn int(bits: u16) -> Self {
        Self::new(TypeKind::Int, bits)
    }

    pub const fn uint(bits: u16) -> Self {
        Self::new(TypeKind::UInt, bits)
    }

    pub const fn float(bits: u16) -> Self {
        Self::new(TypeKind::Float, bits)
    }

    /// Boolean storage is always 8 bits.
    pub const fn bool_() -> Self {
        Self::new(TypeKind::Bool, 8)
    }

    pub const fn int8() -> Self {
        Self::int(8)
    }
    pub const fn int16() -> Self {
        Self::int(16)
    }
    pub const fn int32() -> Self {
        Self::int(32)
    }
    pub const fn int64() -> Self {
        Self::int(64)
    }
    pub const fn uint8() -> Self {
        Self::uint(8)
    }
    pub const fn uint16() -> Self {
        Self::uint(16)
    }
    pub const fn uint32() -> Self {
        Self::uint(32)
    }
    pub const fn uint64() -> Self {
        Self::uint(64)
    }
    pub const fn float16() -> Self {
        Self::float(16)
    }
    pub const fn float32() -> Self {
        Self::float(32)
    }
    pub const fn float64() -> Self {
        Self::float(64)
    }

    /// Vector of `lanes` copies of this scalar.
    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self { lanes, ..self }
    }

    /// The base scalar (lane count 1).
    pub const fn base(self) -> Self {
        Self { lanes: 1, ..self }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self.kind, TypeKind::Int)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self.kind, TypeKind::UInt)
    }

    pub const fn is_int(&self) -> bool {
        matches!(self.kind, TypeKind::Int | TypeKind::UInt)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self.kind, TypeKind::Float)
    }

    pub const fn is_vector(&self) -> bool {
        self.lanes > 1
    }

    /// Storage size of one lane, in bytes.
    pub const fn lane_bytes(&self) -> usize {
        self.bits as usize / 8
    }

    /// Total storage size, in bytes.
    pub const fn bytes(&self) -> usize {
        self.lane_bytes() * self.lanes as usize
    }

    /// Natural alignment: the byte size of one lane.
    pub const fn natural_alignment(&self) -> u32 {
        (self.bits / 8) as u32
    }

    /// Whether the descriptor is one the backends can represent.
    pub const fn is_valid(&self) -> bool {
        if self.lanes == 0 {
            return false;
        }
        match self.kind {
            TypeKind::Bool => self.bits == 8,
            TypeKind::Int | TypeKind::UInt => matches!(self.bits, 8 | 16 | 32 | 64),
            TypeKind::Float => matches!(self.bits, 16 | 32 | 64),
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TypeKind::Bool => write!(f, "bool")?,
            TypeKind::Int => write!(f, "int{}", self.bits)?,
            TypeKind::UInt => write!(f, "uint{}", self.bits)?,
            TypeKind::Float => write!(f, "float{}", self.bits)?,
        }
        if self.lanes > 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}
