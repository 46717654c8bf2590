//! The runtime tree: a self-describing, typed, hierarchical container.
//!
//! Each [`Node`] carries a [`DataType`] plus exactly one of three data
//! states: it owns a contiguous byte buffer, it aliases an external buffer
//! whose lifetime is a caller responsibility, or it holds no bytes at all
//! (interior and empty nodes). Object children are kept in insertion order
//! with unique names and hashed lookup; list children are an ordered
//! sequence of unnamed nodes.
//!
//! Mutation follows two disciplines: `set_*` copies into freshly owned
//! memory (severing any external alias), while `set_external*` rebinds the
//! node to caller memory and never copies. Reads go through strict typed
//! views (`as_slice`, `as_scalar`), converting reads (`to_i64` and friends)
//! or the strided coercing [`Accessor`].

use hashbrown::HashMap;

use crate::error::{fatal_error, BlueprintError};
use crate::node::accessor::{read_element, write_element, Accessor, Scalar, ScalarValue};
use crate::node::dtype::{DTypeId, DataType};
use crate::node::schema::Schema;

/// Where a node's bytes live.
#[derive(Debug)]
pub(crate) enum NodeData {
    /// No bytes: interior (object/list) and empty nodes.
    Interior,
    /// Exclusively owned buffer; freed on drop.
    Owned(Vec<u8>),
    /// Borrowed view into caller-owned memory. The caller guarantees the
    /// buffer outlives the node and that the declared layout lies inside
    /// it; the node never frees it.
    External { ptr: *mut u8, len: usize },
}

/// A node in the data tree. See the module docs for the data-state model.
#[derive(Debug, Default)]
pub struct Node {
    pub(crate) dtype: DataType,
    pub(crate) data: NodeData,
    pub(crate) children: Vec<Node>,
    pub(crate) names: Vec<String>,
    pub(crate) name_map: HashMap<String, usize>,
}

impl Default for NodeData {
    fn default() -> Self {
        NodeData::Interior
    }
}

impl Node {
    /// A fresh empty node.
    pub fn new() -> Self {
        Node::default()
    }

    /// Drop all data and children, returning to the empty state.
    pub fn reset(&mut self) {
        self.dtype = DataType::empty();
        self.data = NodeData::Interior;
        self.children.clear();
        self.names.clear();
        self.name_map.clear();
    }

    #[inline]
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn is_empty(&self) -> bool {
        self.dtype.is_empty() && self.children.is_empty()
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

    pub fn is_owned(&self) -> bool {
        matches!(self.data, NodeData::Owned(_))
    }

    pub fn is_external(&self) -> bool {
        matches!(self.data, NodeData::External { .. })
    }

    /// Number of elements for leaves, number of children for interiors.
    pub fn len(&self) -> usize {
        if self.is_leaf() {
            self.dtype.num_elements()
        } else {
            self.children.len()
        }
    }

    // ---------------------------------------------------------------------
    // raw byte access
    // ---------------------------------------------------------------------

    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.data {
            NodeData::Interior => &[],
            NodeData::Owned(v) => v,
            // SAFETY: external binding contract (see NodeData::External).
            NodeData::External { ptr, len } => unsafe {
                std::slice::from_raw_parts(*ptr, *len)
            },
        }
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.data {
            NodeData::Interior => &mut [],
            NodeData::Owned(v) => v,
            // SAFETY: external binding contract (see NodeData::External).
            NodeData::External { ptr, len } => unsafe {
                std::slice::from_raw_parts_mut(*ptr, *len)
            },
        }
    }

    /// Total bytes of the bound buffer (0 for interiors).
    pub fn buffer_bytes(&self) -> usize {
        match &self.data {
            NodeData::Interior => 0,
            NodeData::Owned(v) => v.len(),
            NodeData::External { len, .. } => *len,
        }
    }

    // ---------------------------------------------------------------------
    // typed writes
    // ---------------------------------------------------------------------

    /// Set from a scalar, reallocating into owned storage.
    pub fn set<T: Scalar>(&mut self, v: T) {
        self.set_slice(&[v]);
    }

    /// Set from a typed slice by copy.
    pub fn set_slice<T: Scalar>(&mut self, vals: &[T]) {
        self.reset();
        self.dtype = DataType::new(T::DTYPE_ID, vals.len());
        self.data = NodeData::Owned(bytemuck::cast_slice(vals).to_vec());
    }

    /// Set from UTF-8 text (stored as a `char8` leaf).
    pub fn set_string(&mut self, s: &str) {
        self.reset();
        self.dtype = DataType::char8(s.len());
        self.data = NodeData::Owned(s.as_bytes().to_vec());
    }

    /// Allocate zero-initialized owned storage described by `dt`.
    pub fn set_dtype(&mut self, dt: &DataType) {
        self.reset();
        self.dtype = dt.clone();
        self.data = NodeData::Owned(vec![0u8; dt.spanned_bytes()]);
    }

    /// Deep copy of `other`: structure and names preserved, every leaf
    /// re-materialized into compact owned storage.
    pub fn set_node(&mut self, other: &Node) {
        self.reset();
        if other.is_leaf() {
            let dt = other.dtype.compact_form();
            let mut buf = vec![0u8; dt.compact_bytes()];
            for i in 0..dt.num_elements() {
                // both layouts were validated when `other` was built
                if let Ok(v) = read_element(other.bytes(), &other.dtype, i) {
                    let _ = write_element(&mut buf, &dt, i, v);
                }
            }
            self.dtype = dt;
            self.data = NodeData::Owned(buf);
        } else {
            self.dtype = other.dtype.clone();
            for (i, child) in other.children.iter().enumerate() {
                let mut copy = Node::new();
                copy.set_node(child);
                self.children.push(copy);
                if let Some(name) = other.names.get(i) {
                    self.names.push(name.clone());
                    self.name_map.insert(name.clone(), i);
                }
            }
        }
    }

    /// Rebind this node to caller memory without copying. Mutation through
    /// the node writes through to `data`; a later `set_*` severs the alias.
    pub fn set_external<T: Scalar>(&mut self, data: &mut [T]) {
        self.reset();
        self.dtype = DataType::new(T::DTYPE_ID, data.len());
        self.data = NodeData::External {
            ptr: data.as_mut_ptr().cast::<u8>(),
            len: std::mem::size_of_val(data),
        };
    }

    /// Rebind to raw caller memory with an explicit layout.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` bytes for as long
    /// as this node (or any alias made from it) can touch the data, and
    /// `dt` must describe a layout inside `[ptr, ptr+len)`.
    pub unsafe fn set_external_raw(&mut self, ptr: *mut u8, len: usize, dt: DataType) {
        self.reset();
        if dt.spanned_bytes() > len {
            fatal_error!(
                "external layout needs {} bytes, buffer holds {len}",
                dt.spanned_bytes()
            );
        }
        self.dtype = dt;
        self.data = NodeData::External { ptr, len };
    }

    /// Shallow alias of `other`: leaves point at `other`'s buffers, interior
    /// structure is rebuilt. The caller keeps `other` alive.
    pub fn set_external_node(&mut self, other: &mut Node) {
        self.reset();
        if other.is_leaf() {
            let dt = other.dtype.clone();
            let len = other.buffer_bytes();
            let ptr = other.bytes_mut().as_mut_ptr();
            self.dtype = dt;
            self.data = NodeData::External { ptr, len };
        } else {
            self.dtype = other.dtype.clone();
            let names = other.names.clone();
            for (i, child) in other.children.iter_mut().enumerate() {
                let mut alias = Node::new();
                alias.set_external_node(child);
                self.children.push(alias);
                if let Some(name) = names.get(i) {
                    self.names.push(name.clone());
                    self.name_map.insert(name.clone(), i);
                }
            }
        }
    }

    /// Allocate one contiguous owned buffer for `schema` and bind every
    /// descendant leaf into it at its schema offset.
    pub fn init_from_schema(&mut self, schema: &Schema) {
        self.reset();
        let total = schema.total_strided_bytes();
        let mut buf = vec![0u8; total];
        let base = buf.as_mut_ptr();
        if schema.is_leaf() {
            self.dtype = schema.dtype().clone();
            self.data = NodeData::Owned(buf);
            return;
        }
        self.dtype = schema.dtype().clone();
        self.data = NodeData::Owned(buf);
        let names: Vec<&String> = schema.child_names().iter().collect();
        for (i, cs) in schema.children().enumerate() {
            let mut child = Node::new();
            child.bind_schema_views(cs, base, total);
            self.children.push(child);
            if let Some(&name) = names.get(i) {
                self.names.push(name.clone());
                self.name_map.insert(name.clone(), i);
            }
        }
    }

    fn bind_schema_views(&mut self, schema: &Schema, base: *mut u8, total: usize) {
        self.dtype = schema.dtype().clone();
        if schema.is_leaf() {
            self.data = NodeData::External { ptr: base, len: total };
            return;
        }
        for (i, cs) in schema.children().enumerate() {
            let mut child = Node::new();
            child.bind_schema_views(cs, base, total);
            self.children.push(child);
            if let Some(name) = schema.child_names().get(i) {
                self.names.push(name.clone());
                self.name_map.insert(name.clone(), i);
            }
        }
    }

    /// Derive the schema describing this tree.
    pub fn schema(&self) -> Schema {
        if self.is_leaf() {
            Schema::leaf(self.dtype.clone())
        } else if self.is_object() {
            let mut s = Schema::object();
            for (name, child) in self.entries() {
                // names are unique by construction
                let _ = s.add_field(name.unwrap_or(""), child.schema());
            }
            s
        } else if self.is_list() {
            let mut s = Schema::list();
            for child in &self.children {
                let _ = s.add_child(child.schema());
            }
            s
        } else {
            Schema::empty()
        }
    }

    /// Write element `i` with conversion into the leaf's stored kind.
    pub(crate) fn set_element(&mut self, i: usize, v: ScalarValue) -> Result<(), BlueprintError> {
        let dt = self.dtype.clone();
        write_element(self.bytes_mut(), &dt, i, v)
    }

    pub(crate) fn element(&self, i: usize) -> Result<ScalarValue, BlueprintError> {
        read_element(self.bytes(), &self.dtype, i)
    }

    // ---------------------------------------------------------------------
    // typed reads
    // ---------------------------------------------------------------------

    /// Strict scalar read: the leaf kind must match `T` exactly.
    pub fn as_scalar<T: Scalar>(&self) -> Result<T, BlueprintError> {
        if self.dtype.id() != T::DTYPE_ID {
            return Err(BlueprintError::TypeMismatch {
                requested: T::DTYPE_ID,
                actual: self.dtype.id(),
            });
        }
        self.element(0).map(T::from_value)
    }

    pub fn as_i64(&self) -> Result<i64, BlueprintError> {
        self.as_scalar::<i64>()
    }

    pub fn as_u64(&self) -> Result<u64, BlueprintError> {
        self.as_scalar::<u64>()
    }

    pub fn as_f64(&self) -> Result<f64, BlueprintError> {
        self.as_scalar::<f64>()
    }

    /// Converting scalar read of element 0.
    pub fn to_i64(&self) -> Result<i64, BlueprintError> {
        self.element(0).map(ScalarValue::to_i64)
    }

    pub fn to_u64(&self) -> Result<u64, BlueprintError> {
        self.element(0).map(ScalarValue::to_u64)
    }

    pub fn to_f64(&self) -> Result<f64, BlueprintError> {
        self.element(0).map(ScalarValue::to_f64)
    }

    /// UTF-8 view of a `char8` leaf.
    pub fn as_str(&self) -> Result<&str, BlueprintError> {
        if !self.dtype.is_string() {
            return Err(BlueprintError::NotAString);
        }
        let dt = &self.dtype;
        if !dt.is_compact() {
            return Err(BlueprintError::NonContiguous {
                offset: dt.offset(),
                stride: dt.stride(),
            });
        }
        let bytes = &self.bytes()[..dt.num_elements()];
        std::str::from_utf8(bytes).map_err(|_| BlueprintError::NotAString)
    }

    /// Strict contiguous slice view: exact kind, native order, no gaps.
    pub fn as_slice<T: Scalar>(&self) -> Result<&[T], BlueprintError> {
        if self.dtype.id() != T::DTYPE_ID {
            return Err(BlueprintError::TypeMismatch {
                requested: T::DTYPE_ID,
                actual: self.dtype.id(),
            });
        }
        let dt = &self.dtype;
        if dt.stride() != dt.element_bytes() || !dt.endianness().is_native() {
            return Err(BlueprintError::NonContiguous {
                offset: dt.offset(),
                stride: dt.stride(),
            });
        }
        let start = dt.offset();
        let end = start + dt.compact_bytes();
        let bytes = self
            .bytes()
            .get(start..end)
            .ok_or(BlueprintError::LayoutOverrun { required: end, available: self.buffer_bytes() })?;
        bytemuck::try_cast_slice(bytes).map_err(|_| BlueprintError::NonContiguous {
            offset: dt.offset(),
            stride: dt.stride(),
        })
    }

    /// Coercing strided view over any numeric leaf.
    pub fn accessor<T: Scalar>(&self) -> Result<Accessor<'_, T>, BlueprintError> {
        if !self.dtype.is_leaf() {
            return Err(BlueprintError::NotALeaf(self.dtype.id()));
        }
        Ok(Accessor::new(self.bytes(), &self.dtype))
    }

    /// Materialize the leaf as a converted vector.
    pub fn to_vec<T: Scalar>(&self) -> Result<Vec<T>, BlueprintError> {
        Ok(self.accessor::<T>()?.to_vec())
    }

    // ---------------------------------------------------------------------
    // structure
    // ---------------------------------------------------------------------

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.children.iter_mut()
    }

    /// Ordered `(name, child)` pairs; names are `None` for list children.
    pub fn entries(&self) -> impl Iterator<Item = (Option<&str>, &Node)> {
        self.children
            .iter()
            .enumerate()
            .map(move |(i, c)| (self.names.get(i).map(String::as_str), c))
    }

    pub fn child_names(&self) -> &[String] {
        &self.names
    }

    pub fn child(&self, i: usize) -> Option<&Node> {
        self.children.get(i)
    }

    pub fn child_mut(&mut self, i: usize) -> Option<&mut Node> {
        self.children.get_mut(i)
    }

    pub fn child_by_name(&self, name: &str) -> Option<&Node> {
        self.name_map.get(name).map(|&i| &self.children[i])
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.try_fetch(path).is_some()
    }

    /// Append an unnamed child (list semantics). An empty node becomes a
    /// list; appending to an object or leaf is fatal.
    pub fn append(&mut self) -> &mut Node {
        if self.dtype.is_empty() {
            self.dtype = DataType::list();
        }
        if !self.dtype.is_list() {
            fatal_error!("append on a non-list node ({:?})", self.dtype.id());
        }
        self.children.push(Node::new());
        self.children.last_mut().expect("just pushed")
    }

    /// Remove a named child, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Result<Node, BlueprintError> {
        let idx = *self
            .name_map
            .get(name)
            .ok_or_else(|| BlueprintError::MissingChild(name.to_string()))?;
        self.name_map.remove(name);
        self.names.remove(idx);
        let removed = self.children.remove(idx);
        for v in self.name_map.values_mut() {
            if *v > idx {
                *v -= 1;
            }
        }
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // paths
    // ---------------------------------------------------------------------

    fn path_segments(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|s| !s.is_empty())
    }

    /// Descend named children along `a/b/c`.
    pub fn fetch(&self, path: &str) -> Result<&Node, BlueprintError> {
        let mut cur = self;
        for seg in Self::path_segments(path) {
            if cur.is_leaf() {
                return Err(BlueprintError::PathThroughLeaf(path.to_string()));
            }
            cur = cur
                .child_by_name(seg)
                .ok_or_else(|| BlueprintError::PathNotFound(path.to_string()))?;
        }
        Ok(cur)
    }

    pub fn try_fetch(&self, path: &str) -> Option<&Node> {
        self.fetch(path).ok()
    }

    /// Descend along `a/b/c`, creating missing object ancestors.
    /// Descending through a leaf is fatal.
    pub fn fetch_mut(&mut self, path: &str) -> &mut Node {
        let mut cur = self;
        for seg in Self::path_segments(path) {
            cur = cur.child_or_insert(seg);
        }
        cur
    }

    pub fn try_fetch_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut cur = self;
        for seg in Self::path_segments(path) {
            if !cur.has_child(seg) {
                return None;
            }
            let idx = cur.name_map[seg];
            cur = &mut cur.children[idx];
        }
        Some(cur)
    }

    fn child_or_insert(&mut self, name: &str) -> &mut Node {
        if self.dtype.is_empty() {
            self.dtype = DataType::object();
        }
        if !self.dtype.is_object() {
            fatal_error!("cannot create child `{name}` under a {:?} node", self.dtype.id());
        }
        let idx = match self.name_map.get(name) {
            Some(&i) => i,
            None => {
                let i = self.children.len();
                self.name_map.insert(name.to_string(), i);
                self.names.push(name.to_string());
                self.children.push(Node::new());
                i
            }
        };
        &mut self.children[idx]
    }

    // ---------------------------------------------------------------------
    // conversion / compaction
    // ---------------------------------------------------------------------

    /// Convert every numeric leaf to `target`, element by element, following
    /// the accessor promotion table. Structure, names and string leaves are
    /// preserved; the result is fully owned and compact.
    pub fn to_data_type(&self, target: DTypeId) -> Result<Node, BlueprintError> {
        let mut out = Node::new();
        if self.is_leaf() {
            if self.dtype.is_string() {
                out.set_node(self);
            } else {
                let n = self.dtype.num_elements();
                let dt = DataType::new(target, n);
                let mut buf = vec![0u8; dt.compact_bytes()];
                for i in 0..n {
                    let v = self.element(i)?;
                    write_element(&mut buf, &dt, i, v)?;
                }
                out.dtype = dt;
                out.data = NodeData::Owned(buf);
            }
        } else {
            out.dtype = self.dtype.clone();
            for (i, child) in self.children.iter().enumerate() {
                let converted = child.to_data_type(target)?;
                out.children.push(converted);
                if let Some(name) = self.names.get(i) {
                    out.names.push(name.clone());
                    out.name_map.insert(name.clone(), i);
                }
            }
        }
        Ok(out)
    }

    /// Re-pack every leaf into gap-free owned storage, in place.
    pub fn compact(&mut self) {
        if self.is_leaf() {
            if self.is_owned() && self.dtype.is_compact() {
                return;
            }
            let mut packed = Node::new();
            packed.set_node(self);
            *self = packed;
        } else {
            // an interior node holding a schema allocation drops it here;
            // children take ownership of their own compact copies
            for child in &mut self.children {
                child.compact();
            }
            if self.is_owned() {
                self.data = NodeData::Interior;
            }
        }
    }

    pub fn is_compact(&self) -> bool {
        if self.is_leaf() {
            self.dtype.is_compact()
        } else {
            self.children.iter().all(Node::is_compact)
        }
    }
}

impl Clone for Node {
    /// Deep copy: every leaf re-materialized into owned compact storage.
    /// Use [`Node::set_external_node`] for shallow aliasing.
    fn clone(&self) -> Self {
        let mut n = Node::new();
        n.set_node(self);
        n
    }
}

impl std::ops::Index<&str> for Node {
    type Output = Node;

    /// Path fetch; a missing path is fatal. Use [`Node::try_fetch`] for the
    /// checked variant.
    fn index(&self, path: &str) -> &Node {
        match self.fetch(path) {
            Ok(n) => n,
            Err(e) => fatal_error!("{e}"),
        }
    }
}

impl std::ops::IndexMut<&str> for Node {
    /// Path fetch that autovivifies missing object ancestors.
    fn index_mut(&mut self, path: &str) -> &mut Node {
        self.fetch_mut(path)
    }
}

impl std::ops::Index<usize> for Node {
    type Output = Node;

    fn index(&self, i: usize) -> &Node {
        match self.child(i) {
            Some(n) => n,
            None => fatal_error!("child index {i} out of range ({})", self.children.len()),
        }
    }
}

impl std::ops::IndexMut<usize> for Node {
    fn index_mut(&mut self, i: usize) -> &mut Node {
        let len = self.children.len();
        match self.child_mut(i) {
            Some(n) => n,
            None => fatal_error!("child index {i} out of range ({len})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_set_autovivifies_objects() {
        let mut n = Node::new();
        n["a/b/c"].set(42i64);
        assert!(n.is_object());
        assert!(n["a"].is_object());
        assert_eq!(n["a/b/c"].as_i64().unwrap(), 42);
        assert_eq!(n.child_names(), &["a".to_string()]);
    }

    #[test]
    fn object_children_preserve_insertion_order() {
        let mut n = Node::new();
        n["z"].set(1i32);
        n["a"].set(2i32);
        n["m"].set(3i32);
        let names: Vec<_> = n.entries().map(|(name, _)| name.unwrap().to_string()).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn set_severs_external_alias() {
        let mut buf = [1i32, 2, 3];
        let mut n = Node::new();
        n.set_external(&mut buf);
        buf[1] = 20;
        assert_eq!(n.accessor::<i32>().unwrap().at(1), 20);
        n.set_slice(&[7i32, 8, 9]);
        buf[1] = 99;
        assert_eq!(n.accessor::<i32>().unwrap().at(1), 8);
    }

    #[test]
    fn external_writes_through_to_caller_buffer() {
        let mut buf = [0f64; 4];
        let mut n = Node::new();
        n.set_external(&mut buf);
        n.set_element(2, ScalarValue::F64(2.5)).unwrap();
        assert_eq!(buf[2], 2.5);
    }

    #[test]
    fn schema_allocation_binds_leaves_into_one_buffer() {
        let mut s = Schema::object();
        s.add_field("a", Schema::leaf(DataType::int32(4))).unwrap();
        s.add_field("b", Schema::leaf(DataType::float64(2))).unwrap();
        let mut n = Node::new();
        n.init_from_schema(&s);
        assert!(n.is_owned());
        assert_eq!(n.buffer_bytes(), s.total_strided_bytes());
        assert!(n["a"].is_external());
        n["a"].set_element(3, ScalarValue::I64(-5)).unwrap();
        n["b"].set_element(0, ScalarValue::F64(0.5)).unwrap();
        assert_eq!(n["a"].accessor::<i32>().unwrap().at(3), -5);
        assert_eq!(n["b"].accessor::<f64>().unwrap().at(0), 0.5);
    }

    #[test]
    fn strict_reads_reject_kind_mismatch() {
        let mut n = Node::new();
        n.set(1.5f32);
        assert!(matches!(
            n.as_i64(),
            Err(BlueprintError::TypeMismatch { .. })
        ));
        assert_eq!(n.to_i64().unwrap(), 2);
    }

    #[test]
    fn clone_is_deep() {
        let mut n = Node::new();
        n["vals"].set_slice(&[1u16, 2, 3]);
        let c = n.clone();
        n["vals"].set_slice(&[9u16, 9, 9]);
        assert_eq!(c["vals"].as_slice::<u16>().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn list_append() {
        let mut n = Node::new();
        n.append().set(1i64);
        n.append().set(2i64);
        assert!(n.is_list());
        assert_eq!(n.number_of_children(), 2);
        assert_eq!(n[1usize].as_i64().unwrap(), 2);
    }

    #[test]
    fn remove_keeps_lookup_consistent() {
        let mut n = Node::new();
        n["a"].set(1i8);
        n["b"].set(2i8);
        n["c"].set(3i8);
        n.remove("b").unwrap();
        assert_eq!(n.child_names(), &["a".to_string(), "c".to_string()]);
        assert_eq!(n["c"].as_scalar::<i8>().unwrap(), 3);
    }

    #[test]
    fn to_data_type_preserves_structure() {
        let mut n = Node::new();
        n["x"].set_slice(&[1i8, -2, 3]);
        n["name"].set_string("grid");
        let c = n.to_data_type(DTypeId::Float64).unwrap();
        assert_eq!(c["x"].as_slice::<f64>().unwrap(), &[1.0, -2.0, 3.0]);
        assert_eq!(c["name"].as_str().unwrap(), "grid");
    }

    #[test]
    fn external_node_alias_is_shallow() {
        let mut src = Node::new();
        src["vals"].set_slice(&[1i64, 2, 3]);
        let mut alias = Node::new();
        alias.set_external_node(&mut src);
        src["vals"].set_element(1, ScalarValue::I64(20)).unwrap();
        assert_eq!(alias["vals"].accessor::<i64>().unwrap().at(1), 20);
        assert!(alias["vals"].is_external());
    }

    #[test]
    fn string_round_trip() {
        let mut n = Node::new();
        n.set_string("uniform");
        assert_eq!(n.as_str().unwrap(), "uniform");
        assert_eq!(n.dtype().num_elements(), 7);
    }
}
