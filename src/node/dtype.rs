//! Leaf type descriptors: element kind, count, and byte layout.
//!
//! A [`DataType`] is pure description. It owns no memory; it says how to
//! interpret bytes that live elsewhere (an owned node buffer or an external
//! allocation): element kind, element count, byte offset of the first
//! element, byte stride between elements, bytes per element, endianness.

use serde::{Deserialize, Serialize};

/// Closed set of node kinds.
///
/// `Empty`, `Object` and `List` are structural kinds and carry no numeric
/// layout; the rest are leaf kinds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum DTypeId {
    Empty,
    Object,
    List,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Raw bytes; used for strings.
    Char8,
}

impl DTypeId {
    /// Bytes per element for leaf kinds; 0 for structural kinds.
    pub fn element_bytes(self) -> usize {
        match self {
            DTypeId::Empty | DTypeId::Object | DTypeId::List => 0,
            DTypeId::Int8 | DTypeId::UInt8 | DTypeId::Char8 => 1,
            DTypeId::Int16 | DTypeId::UInt16 => 2,
            DTypeId::Int32 | DTypeId::UInt32 | DTypeId::Float32 => 4,
            DTypeId::Int64 | DTypeId::UInt64 | DTypeId::Float64 => 8,
        }
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            DTypeId::Int8 | DTypeId::Int16 | DTypeId::Int32 | DTypeId::Int64
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            DTypeId::UInt8 | DTypeId::UInt16 | DTypeId::UInt32 | DTypeId::UInt64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, DTypeId::Float32 | DTypeId::Float64)
    }

    pub fn is_number(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(self) -> bool {
        matches!(self, DTypeId::Char8)
    }

    /// Leaf kinds describe typed data; structural kinds do not.
    pub fn is_leaf(self) -> bool {
        !matches!(self, DTypeId::Empty | DTypeId::Object | DTypeId::List)
    }

    /// Canonical lowercase name, as used by the textual form.
    pub fn name(self) -> &'static str {
        match self {
            DTypeId::Empty => "empty",
            DTypeId::Object => "object",
            DTypeId::List => "list",
            DTypeId::Int8 => "int8",
            DTypeId::Int16 => "int16",
            DTypeId::Int32 => "int32",
            DTypeId::Int64 => "int64",
            DTypeId::UInt8 => "uint8",
            DTypeId::UInt16 => "uint16",
            DTypeId::UInt32 => "uint32",
            DTypeId::UInt64 => "uint64",
            DTypeId::Float32 => "float32",
            DTypeId::Float64 => "float64",
            DTypeId::Char8 => "char8_str",
        }
    }

    /// Inverse of [`DTypeId::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "empty" => DTypeId::Empty,
            "object" => DTypeId::Object,
            "list" => DTypeId::List,
            "int8" => DTypeId::Int8,
            "int16" => DTypeId::Int16,
            "int32" => DTypeId::Int32,
            "int64" => DTypeId::Int64,
            "uint8" => DTypeId::UInt8,
            "uint16" => DTypeId::UInt16,
            "uint32" => DTypeId::UInt32,
            "uint64" => DTypeId::UInt64,
            "float32" => DTypeId::Float32,
            "float64" => DTypeId::Float64,
            "char8_str" => DTypeId::Char8,
            _ => return None,
        })
    }
}

/// Byte order of a leaf's stored elements.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// The byte order of the running machine.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

/// Immutable layout descriptor for one node.
///
/// Invariants for leaf kinds: `stride >= element_bytes` and
/// `element_bytes == id.element_bytes()`. `num_elements == 0` describes an
/// empty leaf. Structural kinds carry no layout (all counts zero).
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    id: DTypeId,
    num_elements: usize,
    offset: usize,
    stride: usize,
    element_bytes: usize,
    endianness: Endianness,
}

impl Default for DataType {
    fn default() -> Self {
        DataType::empty()
    }
}

impl DataType {
    /// Compact descriptor for `num_elements` elements of kind `id`.
    pub fn new(id: DTypeId, num_elements: usize) -> Self {
        let eb = id.element_bytes();
        DataType {
            id,
            num_elements,
            offset: 0,
            stride: eb,
            element_bytes: eb,
            endianness: Endianness::native(),
        }
    }

    /// Fully explicit descriptor.
    pub fn with_layout(
        id: DTypeId,
        num_elements: usize,
        offset: usize,
        stride: usize,
        endianness: Endianness,
    ) -> Self {
        DataType {
            id,
            num_elements,
            offset,
            stride,
            element_bytes: id.element_bytes(),
            endianness,
        }
    }

    pub fn empty() -> Self {
        DataType {
            id: DTypeId::Empty,
            num_elements: 0,
            offset: 0,
            stride: 0,
            element_bytes: 0,
            endianness: Endianness::native(),
        }
    }

    pub fn object() -> Self {
        DataType { id: DTypeId::Object, ..DataType::empty() }
    }

    pub fn list() -> Self {
        DataType { id: DTypeId::List, ..DataType::empty() }
    }

    pub fn int8(n: usize) -> Self {
        DataType::new(DTypeId::Int8, n)
    }
    pub fn int16(n: usize) -> Self {
        DataType::new(DTypeId::Int16, n)
    }
    pub fn int32(n: usize) -> Self {
        DataType::new(DTypeId::Int32, n)
    }
    pub fn int64(n: usize) -> Self {
        DataType::new(DTypeId::Int64, n)
    }
    pub fn uint8(n: usize) -> Self {
        DataType::new(DTypeId::UInt8, n)
    }
    pub fn uint16(n: usize) -> Self {
        DataType::new(DTypeId::UInt16, n)
    }
    pub fn uint32(n: usize) -> Self {
        DataType::new(DTypeId::UInt32, n)
    }
    pub fn uint64(n: usize) -> Self {
        DataType::new(DTypeId::UInt64, n)
    }
    pub fn float32(n: usize) -> Self {
        DataType::new(DTypeId::Float32, n)
    }
    pub fn float64(n: usize) -> Self {
        DataType::new(DTypeId::Float64, n)
    }
    pub fn char8(n: usize) -> Self {
        DataType::new(DTypeId::Char8, n)
    }

    #[inline]
    pub fn id(&self) -> DTypeId {
        self.id
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn element_bytes(&self) -> usize {
        self.element_bytes
    }

    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn is_empty(&self) -> bool {
        self.id == DTypeId::Empty
    }

    pub fn is_object(&self) -> bool {
        self.id == DTypeId::Object
    }

    pub fn is_list(&self) -> bool {
        self.id == DTypeId::List
    }

    pub fn is_leaf(&self) -> bool {
        self.id.is_leaf()
    }

    pub fn is_number(&self) -> bool {
        self.id.is_number()
    }

    pub fn is_integer(&self) -> bool {
        self.id.is_integer()
    }

    pub fn is_float(&self) -> bool {
        self.id.is_float()
    }

    pub fn is_string(&self) -> bool {
        self.id.is_string()
    }

    /// True when elements are densely packed at offset 0 in native order.
    pub fn is_compact(&self) -> bool {
        self.offset == 0
            && self.stride == self.element_bytes
            && self.endianness.is_native()
    }

    /// Byte offset of element `i` from the start of the bound buffer.
    #[inline]
    pub fn element_offset(&self, i: usize) -> usize {
        self.offset + i * self.stride
    }

    /// Total bytes spanned by this layout, counting trailing stride gaps
    /// only up to the last element's end.
    pub fn spanned_bytes(&self) -> usize {
        if self.num_elements == 0 || !self.is_leaf() {
            0
        } else {
            self.offset + (self.num_elements - 1) * self.stride + self.element_bytes
        }
    }

    /// Bytes needed for a compact copy of the described data.
    pub fn compact_bytes(&self) -> usize {
        self.num_elements * self.element_bytes
    }

    /// A compact descriptor with the same kind and count.
    pub fn compact_form(&self) -> Self {
        DataType::new(self.id, self.num_elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanned_bytes_counts_stride_gaps() {
        let dt = DataType::with_layout(DTypeId::Int32, 3, 8, 12, Endianness::native());
        assert_eq!(dt.spanned_bytes(), 8 + 2 * 12 + 4);
        assert_eq!(dt.compact_bytes(), 12);
        assert!(!dt.is_compact());
        assert!(dt.compact_form().is_compact());
    }

    #[test]
    fn structural_kinds_have_no_layout() {
        assert_eq!(DataType::object().spanned_bytes(), 0);
        assert_eq!(DataType::list().element_bytes(), 0);
        assert!(DataType::empty().is_empty());
    }

    #[test]
    fn names_round_trip() {
        for id in [
            DTypeId::Empty,
            DTypeId::Object,
            DTypeId::List,
            DTypeId::Int8,
            DTypeId::Int16,
            DTypeId::Int32,
            DTypeId::Int64,
            DTypeId::UInt8,
            DTypeId::UInt16,
            DTypeId::UInt32,
            DTypeId::UInt64,
            DTypeId::Float32,
            DTypeId::Float64,
            DTypeId::Char8,
        ] {
            assert_eq!(DTypeId::from_name(id.name()), Some(id));
        }
    }
}
