//! Shared building blocks for protocol verification.
//!
//! Verification never fails hard on bad input: each check returns a bool
//! and records a structured message in the caller's `info` tree. At every
//! inspected node the final verdict lands in `info["valid"]` as the string
//! `"true"` or `"false"`, with per-failure messages under `info["errors"]`.

use crate::node::dtype::DTypeId;
use crate::node::Node;

pub(crate) mod log {
    use super::*;

    pub fn error(info: &mut Node, proto: &str, msg: &str) {
        info.fetch_mut("errors")
            .append()
            .set_string(&format!("{proto}: {msg}"));
    }

    pub fn optional(info: &mut Node, proto: &str, msg: &str) {
        info.fetch_mut("info")
            .append()
            .set_string(&format!("{proto}: {msg}"));
    }

    pub fn validation(info: &mut Node, valid: bool) {
        info.fetch_mut("valid")
            .set_string(if valid { "true" } else { "false" });
    }
}

pub(crate) fn verify_field_exists(
    proto: &str,
    node: &Node,
    info: &mut Node,
    field: &str,
) -> bool {
    let res = field.is_empty() || node.has_child(field);
    if !res {
        log::error(info, proto, &format!("missing child `{field}`"));
    }
    res
}

fn field_node<'a>(node: &'a Node, field: &str) -> Option<&'a Node> {
    if field.is_empty() {
        Some(node)
    } else {
        node.child_by_name(field)
    }
}

fn check_field(
    proto: &str,
    node: &Node,
    info: &mut Node,
    field: &str,
    what: &str,
    pred: impl Fn(&Node) -> bool,
) -> bool {
    let mut res = verify_field_exists(proto, node, info, field);
    if res {
        let target = field_node(node, field).unwrap_or(node);
        if !pred(target) {
            log::error(info, proto, &format!("`{field}` is not {what}"));
            res = false;
        }
    }
    if !field.is_empty() {
        log::validation(info.fetch_mut(field), res);
    }
    res
}

pub(crate) fn verify_integer_field(proto: &str, node: &Node, info: &mut Node, field: &str) -> bool {
    check_field(proto, node, info, field, "an integer array", |n| {
        n.dtype().is_integer()
    })
}

pub(crate) fn verify_number_field(proto: &str, node: &Node, info: &mut Node, field: &str) -> bool {
    check_field(proto, node, info, field, "a numeric array", |n| {
        n.dtype().is_number()
    })
}

pub(crate) fn verify_string_field(proto: &str, node: &Node, info: &mut Node, field: &str) -> bool {
    check_field(proto, node, info, field, "a string", |n| n.dtype().is_string())
}

pub(crate) fn verify_object_field(proto: &str, node: &Node, info: &mut Node, field: &str) -> bool {
    check_field(proto, node, info, field, "an object with children", |n| {
        (n.is_object() || n.is_list()) && n.number_of_children() > 0
    })
}

/// An mcarray: sibling numeric arrays of equal element count.
pub(crate) fn verify_mcarray_field(proto: &str, node: &Node, info: &mut Node, field: &str) -> bool {
    check_field(proto, node, info, field, "an mcarray", |n| {
        if n.is_leaf() {
            return n.dtype().is_number();
        }
        if n.number_of_children() == 0 {
            return false;
        }
        let mut len = None;
        n.children().all(|c| {
            c.dtype().is_number()
                && *len.get_or_insert(c.dtype().num_elements()) == c.dtype().num_elements()
        })
    })
}

pub(crate) fn verify_enum_field(
    proto: &str,
    node: &Node,
    info: &mut Node,
    field: &str,
    allowed: &[&str],
) -> bool {
    let mut res = verify_string_field(proto, node, info, field);
    if res {
        let target = field_node(node, field).unwrap_or(node);
        let value = target.as_str().unwrap_or("");
        if !allowed.contains(&value) {
            log::error(
                info,
                proto,
                &format!("`{field}` value `{value}` not in {allowed:?}"),
            );
            res = false;
        }
    }
    if !field.is_empty() {
        log::validation(info.fetch_mut(field), res);
    }
    res
}

/// `node[field]` names an entry of `roots[section]`.
pub(crate) fn verify_reference_field(
    proto: &str,
    node: &Node,
    info: &mut Node,
    roots: &Node,
    field: &str,
    section: &str,
) -> bool {
    let mut res = verify_string_field(proto, node, info, field);
    if res {
        let name = node[field].as_str().unwrap_or("");
        if roots
            .try_fetch(section)
            .map(|s| s.has_child(name))
            .unwrap_or(false)
        {
            // reference resolves
        } else {
            log::error(
                info,
                proto,
                &format!("`{field}` references `{section}/{name}` which does not exist"),
            );
            res = false;
        }
    }
    res
}

/// Join two tree paths with `/`, guarding the empty cases before looking
/// at separators.
pub fn join_path(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    if left.ends_with('/') || right.starts_with('/') {
        format!("{left}{right}")
    } else {
        format!("{left}/{right}")
    }
}

// ---------------------------------------------------------------------------
// runtime-kind array emission
// ---------------------------------------------------------------------------

use crate::node::accessor::ScalarValue;
use crate::node::dtype::DataType;

/// Allocate `node` as a `kind` array and fill it from float values,
/// converting per the promotion table.
pub(crate) fn set_float_slice(node: &mut Node, kind: DTypeId, vals: &[f64]) {
    node.set_dtype(&DataType::new(kind, vals.len()));
    for (i, &v) in vals.iter().enumerate() {
        // freshly allocated layout; cannot fail
        let _ = node.set_element(i, ScalarValue::F64(v));
    }
}

/// Allocate `node` as a `kind` array and fill it from integer values.
pub(crate) fn set_int_slice(node: &mut Node, kind: DTypeId, vals: &[i64]) {
    node.set_dtype(&DataType::new(kind, vals.len()));
    for (i, &v) in vals.iter().enumerate() {
        let _ = node.set_element(i, ScalarValue::I64(v));
    }
}

// ---------------------------------------------------------------------------
// widest-dtype discipline
// ---------------------------------------------------------------------------

fn widen_over(nodes: &[&Node], pick: impl Fn(DTypeId) -> bool + Copy) -> usize {
    fn walk(n: &Node, pick: impl Fn(DTypeId) -> bool + Copy, widest: &mut usize) {
        if n.is_leaf() && pick(n.dtype().id()) {
            *widest = (*widest).max(n.dtype().element_bytes());
        }
        for c in n.children() {
            walk(c, pick, widest);
        }
    }
    let mut widest = 0;
    for n in nodes {
        walk(n, pick, &mut widest);
    }
    widest
}

/// Widest signed-integer kind appearing across `nodes` (int32 floor).
pub fn find_widest_int_dtype(nodes: &[&Node]) -> DTypeId {
    if widen_over(nodes, DTypeId::is_integer) > 4 {
        DTypeId::Int64
    } else {
        DTypeId::Int32
    }
}

/// Widest floating kind appearing across `nodes` (float32 floor).
pub fn find_widest_float_dtype(nodes: &[&Node]) -> DTypeId {
    if widen_over(nodes, DTypeId::is_float) > 4 {
        DTypeId::Float64
    } else {
        DTypeId::Float32
    }
}
