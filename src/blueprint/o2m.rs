//! One-to-many relations: `{values, sizes, offsets}` triples encoding, for
//! each of N "ones", a variable-length list of "manys".
//!
//! The index is materialized once from the relation node and then iterated
//! without further tree lookups. A relation without `sizes`/`offsets` is
//! treated as fixed-arity (the caller supplies the arity).

use std::ops::Range;

use crate::error::BlueprintError;
use crate::node::Node;

use super::helpers::{log, verify_integer_field};

/// Materialized size/offset index over a one-to-many relation.
#[derive(Clone, Debug)]
pub struct O2MIndex {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
}

impl O2MIndex {
    /// Build from a relation node carrying integer `sizes` and `offsets`.
    /// When both are absent, every "one" gets `fixed_size` manys packed
    /// back to back over `data_len` entries.
    pub fn from_node(
        rel: &Node,
        data_child: &str,
        fixed_size: usize,
    ) -> Result<Self, BlueprintError> {
        match (rel.try_fetch("sizes"), rel.try_fetch("offsets")) {
            (Some(sizes), Some(offsets)) => {
                let sizes = sizes.to_vec::<u64>()?;
                let offsets = offsets.to_vec::<u64>()?;
                if sizes.len() != offsets.len() {
                    return Err(BlueprintError::NonConforming(format!(
                        "o2m sizes ({}) and offsets ({}) disagree",
                        sizes.len(),
                        offsets.len()
                    )));
                }
                Ok(O2MIndex {
                    sizes: sizes.into_iter().map(|v| v as usize).collect(),
                    offsets: offsets.into_iter().map(|v| v as usize).collect(),
                })
            }
            (Some(sizes), None) => {
                // offsets derivable: compact prefix sum over sizes
                let sizes: Vec<usize> =
                    sizes.to_vec::<u64>()?.into_iter().map(|v| v as usize).collect();
                Ok(O2MIndex::from_sizes(sizes))
            }
            _ => {
                let data = rel
                    .try_fetch(data_child)
                    .ok_or_else(|| BlueprintError::MissingChild(data_child.to_string()))?;
                let data_len = data.dtype().num_elements();
                if fixed_size == 0 {
                    return Err(BlueprintError::NonConforming(
                        "o2m relation without sizes needs a fixed arity".into(),
                    ));
                }
                Ok(O2MIndex::fixed(data_len / fixed_size, fixed_size))
            }
        }
    }

    /// `count` ones of `size` manys each, densely packed.
    pub fn fixed(count: usize, size: usize) -> Self {
        O2MIndex {
            sizes: vec![size; count],
            offsets: (0..count).map(|i| i * size).collect(),
        }
    }

    /// Compact index from per-one sizes.
    pub fn from_sizes(sizes: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut acc = 0usize;
        for &s in &sizes {
            offsets.push(acc);
            acc += s;
        }
        O2MIndex { sizes, offsets }
    }

    pub fn ones(&self) -> usize {
        self.sizes.len()
    }

    pub fn size(&self, one: usize) -> usize {
        self.sizes[one]
    }

    pub fn offset(&self, one: usize) -> usize {
        self.offsets[one]
    }

    /// Data-index range of the manys belonging to `one`.
    pub fn many(&self, one: usize) -> Range<usize> {
        let start = self.offsets[one];
        start..start + self.sizes[one]
    }

    /// Total number of manys.
    pub fn total_many(&self) -> usize {
        self.sizes.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        (0..self.ones()).map(move |i| (i, self.many(i)))
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

/// Verify the `o2mrelation` protocol: at least one numeric data array,
/// integer `sizes`/`offsets` of equal length when present.
pub fn verify(node: &Node, info: &mut Node) -> bool {
    let proto = "o2mrelation";
    let mut res = true;

    if !node.is_object() {
        log::error(info, proto, "o2m relation must be an object");
        log::validation(info, false);
        return false;
    }

    let has_data = node
        .entries()
        .any(|(name, c)| !matches!(name, Some("sizes" | "offsets" | "indices")) && c.dtype().is_number());
    if !has_data {
        log::error(info, proto, "no data array child");
        res = false;
    }

    let (has_sizes, has_offsets) = (node.has_child("sizes"), node.has_child("offsets"));
    if has_sizes != has_offsets {
        log::error(info, proto, "`sizes` and `offsets` must appear together");
        res = false;
    }
    if has_sizes {
        res &= verify_integer_field(proto, node, info, "sizes");
        res &= verify_integer_field(proto, node, info, "offsets");
        if res {
            let ns = node["sizes"].dtype().num_elements();
            let no = node["offsets"].dtype().num_elements();
            if ns != no {
                log::error(info, proto, &format!("sizes ({ns}) and offsets ({no}) disagree"));
                res = false;
            }
        }
    }

    log::validation(info, res);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_relation_iterates_in_order() {
        let mut rel = Node::new();
        rel["values"].set_slice(&[10i64, 11, 12, 13, 14, 15]);
        rel["sizes"].set_slice(&[3i64, 1, 2]);
        rel["offsets"].set_slice(&[0i64, 3, 4]);
        let idx = O2MIndex::from_node(&rel, "values", 0).unwrap();
        assert_eq!(idx.ones(), 3);
        assert_eq!(idx.many(0), 0..3);
        assert_eq!(idx.many(2), 4..6);
        assert_eq!(idx.total_many(), 6);
    }

    #[test]
    fn fixed_arity_fallback() {
        let mut rel = Node::new();
        rel["connectivity"].set_slice(&[0i32, 1, 2, 3, 4, 5, 6, 7]);
        let idx = O2MIndex::from_node(&rel, "connectivity", 4).unwrap();
        assert_eq!(idx.ones(), 2);
        assert_eq!(idx.many(1), 4..8);
    }

    #[test]
    fn verify_catches_lone_sizes() {
        let mut rel = Node::new();
        rel["values"].set_slice(&[1.0f64]);
        rel["sizes"].set_slice(&[1i64]);
        let mut info = Node::new();
        assert!(!verify(&rel, &mut info));
    }
}
