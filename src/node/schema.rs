//! Schema: a tree of [`DataType`] describing the layout of a node tree.
//!
//! Interior schema nodes are either an insertion-ordered mapping from names
//! to child schemas (object) or an ordered child sequence (list); leaves
//! carry a [`DataType`]. A schema totals an offset layout for one contiguous
//! buffer: appending a field to an object assigns it the current total
//! extent as its base offset, so sibling fields pack back to back.

use hashbrown::HashMap;

use crate::error::BlueprintError;
use crate::node::dtype::{DTypeId, DataType};

#[derive(Clone, Debug, Default)]
pub struct Schema {
    dtype: DataType,
    children: Vec<Schema>,
    names: Vec<String>,
    name_map: HashMap<String, usize>,
}

impl Schema {
    pub fn empty() -> Self {
        Schema::default()
    }

    pub fn object() -> Self {
        Schema { dtype: DataType::object(), ..Schema::default() }
    }

    pub fn list() -> Self {
        Schema { dtype: DataType::list(), ..Schema::default() }
    }

    pub fn leaf(dtype: DataType) -> Self {
        Schema { dtype, ..Schema::default() }
    }

    #[inline]
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn is_object(&self) -> bool {
        self.dtype.is_object()
    }

    pub fn is_list(&self) -> bool {
        self.dtype.is_list()
    }

    pub fn is_leaf(&self) -> bool {
        self.dtype.is_leaf()
    }

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> impl Iterator<Item = &Schema> {
        self.children.iter()
    }

    pub fn child_names(&self) -> &[String] {
        &self.names
    }

    pub fn child(&self, i: usize) -> Option<&Schema> {
        self.children.get(i)
    }

    pub fn child_by_name(&self, name: &str) -> Option<&Schema> {
        self.name_map.get(name).map(|&i| &self.children[i])
    }

    /// Append a named field whose subtree is packed after the current
    /// extent. Turns an empty schema into an object.
    pub fn add_field(&mut self, name: &str, mut child: Schema) -> Result<(), BlueprintError> {
        if self.dtype.is_empty() {
            self.dtype = DataType::object();
        }
        if !self.is_object() {
            return Err(BlueprintError::NotALeaf(self.dtype.id()));
        }
        if self.name_map.contains_key(name) {
            return Err(BlueprintError::DuplicateChildName(name.to_string()));
        }
        child.shift_offsets(self.total_strided_bytes());
        self.name_map.insert(name.to_string(), self.children.len());
        self.names.push(name.to_string());
        self.children.push(child);
        Ok(())
    }

    /// Append an unnamed child (list semantics), packed after the current
    /// extent. Turns an empty schema into a list.
    pub fn add_child(&mut self, mut child: Schema) -> Result<(), BlueprintError> {
        if self.dtype.is_empty() {
            self.dtype = DataType::list();
        }
        if !self.is_list() {
            return Err(BlueprintError::NotALeaf(self.dtype.id()));
        }
        child.shift_offsets(self.total_strided_bytes());
        self.children.push(child);
        Ok(())
    }

    fn shift_offsets(&mut self, delta: usize) {
        if delta == 0 {
            return;
        }
        if self.dtype.is_leaf() {
            self.dtype = DataType::with_layout(
                self.dtype.id(),
                self.dtype.num_elements(),
                self.dtype.offset() + delta,
                self.dtype.stride(),
                self.dtype.endianness(),
            );
        }
        for c in &mut self.children {
            c.shift_offsets(delta);
        }
    }

    /// Total byte extent: the maximum end offset over all descendant
    /// leaves.
    pub fn total_strided_bytes(&self) -> usize {
        if self.dtype.is_leaf() {
            self.dtype.spanned_bytes()
        } else {
            self.children
                .iter()
                .map(Schema::total_strided_bytes)
                .max()
                .unwrap_or(0)
        }
    }

    /// Bytes needed for a compact (gap-free) rendition of the tree.
    pub fn total_compact_bytes(&self) -> usize {
        if self.dtype.is_leaf() {
            self.dtype.compact_bytes()
        } else {
            self.children.iter().map(Schema::total_compact_bytes).sum()
        }
    }

    /// Number of descendant leaves.
    pub fn number_of_leaves(&self) -> usize {
        if self.dtype.is_leaf() {
            1
        } else if self.dtype.id() == DTypeId::Empty {
            0
        } else {
            self.children.iter().map(Schema::number_of_leaves).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_pack_back_to_back() {
        let mut s = Schema::object();
        s.add_field("a", Schema::leaf(DataType::int32(4))).unwrap();
        s.add_field("b", Schema::leaf(DataType::float64(2))).unwrap();
        assert_eq!(s.child_by_name("a").unwrap().dtype().offset(), 0);
        assert_eq!(s.child_by_name("b").unwrap().dtype().offset(), 16);
        assert_eq!(s.total_strided_bytes(), 32);
        assert_eq!(s.total_compact_bytes(), 32);
    }

    #[test]
    fn nested_objects_accumulate_offsets() {
        let mut inner = Schema::object();
        inner.add_field("x", Schema::leaf(DataType::uint8(3))).unwrap();
        let mut s = Schema::object();
        s.add_field("head", Schema::leaf(DataType::int64(1))).unwrap();
        s.add_field("body", inner).unwrap();
        let x = s.child_by_name("body").unwrap().child_by_name("x").unwrap();
        assert_eq!(x.dtype().offset(), 8);
        assert_eq!(s.total_strided_bytes(), 11);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut s = Schema::object();
        s.add_field("a", Schema::leaf(DataType::int8(1))).unwrap();
        assert!(matches!(
            s.add_field("a", Schema::leaf(DataType::int8(1))),
            Err(BlueprintError::DuplicateChildName(_))
        ));
    }
}
