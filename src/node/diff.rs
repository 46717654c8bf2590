//! Tree comparison with structured discrepancy reporting.
//!
//! `diff` returns `true` when two trees differ. Structural differences
//! (missing children, kind mismatch, count mismatch) are unconditional;
//! leaf values compare element-wise after conversion to the widest common
//! representation, within an absolute (or relative) tolerance. The `info`
//! tree mirrors the inputs and pinpoints each discrepancy.

use crate::node::accessor::ScalarValue;
use crate::node::node::Node;

impl Node {
    /// Absolute-tolerance comparison. `info` is reset and receives a
    /// parallel tree of discrepancy messages.
    pub fn diff(&self, other: &Node, info: &mut Node, epsilon: f64) -> bool {
        info.reset();
        diff_nodes(self, other, info, epsilon, false)
    }

    /// Relative-tolerance variant: values differ when
    /// `|a - b| > epsilon * max(|a|, |b|)`.
    pub fn diff_relative(&self, other: &Node, info: &mut Node, epsilon: f64) -> bool {
        info.reset();
        diff_nodes(self, other, info, epsilon, true)
    }
}

fn record(info: &mut Node, msg: String) {
    let errors = info.fetch_mut("errors");
    if !errors.is_list() && !errors.is_empty() {
        errors.reset();
    }
    errors.append().set_string(&msg);
}

fn values_differ(a: ScalarValue, b: ScalarValue, epsilon: f64, relative: bool) -> bool {
    // unsigned/unsigned compares exactly in u64; everything else goes
    // through the widest common representation
    match (a, b) {
        (ScalarValue::U64(x), ScalarValue::U64(y)) if epsilon == 0.0 => x != y,
        (ScalarValue::I64(x), ScalarValue::I64(y)) if epsilon == 0.0 => x != y,
        _ => {
            let (x, y) = (a.to_f64(), b.to_f64());
            let delta = (x - y).abs();
            if relative {
                delta > epsilon * x.abs().max(y.abs())
            } else {
                delta > epsilon
            }
        }
    }
}

fn diff_nodes(a: &Node, b: &Node, info: &mut Node, epsilon: f64, relative: bool) -> bool {
    let mut differ = false;

    if a.is_leaf() != b.is_leaf() || a.is_object() != b.is_object() || a.is_list() != b.is_list()
    {
        record(
            info,
            format!(
                "kind mismatch: {:?} vs {:?}",
                a.dtype().id(),
                b.dtype().id()
            ),
        );
        return true;
    }

    if a.is_leaf() {
        let (sa, sb) = (a.dtype().is_string(), b.dtype().is_string());
        if sa != sb {
            record(info, "string vs numeric leaf".to_string());
            return true;
        }
        if sa {
            let (x, y) = (a.as_str().ok(), b.as_str().ok());
            if x != y {
                record(info, format!("string mismatch: {x:?} vs {y:?}"));
                differ = true;
            }
            return differ;
        }
        let (na, nb) = (a.dtype().num_elements(), b.dtype().num_elements());
        if na != nb {
            record(info, format!("element count mismatch: {na} vs {nb}"));
            return true;
        }
        for i in 0..na {
            let (va, vb) = match (a.element(i), b.element(i)) {
                (Ok(x), Ok(y)) => (x, y),
                _ => {
                    record(info, format!("unreadable element {i}"));
                    return true;
                }
            };
            if values_differ(va, vb, epsilon, relative) {
                record(
                    info,
                    format!("element {i} differs: {} vs {}", va.to_f64(), vb.to_f64()),
                );
                differ = true;
            }
        }
        return differ;
    }

    // interior: children compared by name (objects) or position (lists)
    if a.is_object() {
        for (name, child_a) in a.entries() {
            let name = name.unwrap_or("");
            match b.child_by_name(name) {
                Some(child_b) => {
                    let sub = info.fetch_mut("children").fetch_mut(name);
                    if diff_nodes(child_a, child_b, sub, epsilon, relative) {
                        differ = true;
                    } else {
                        let _ = info.fetch_mut("children").remove(name);
                    }
                }
                None => {
                    record(info, format!("child `{name}` missing from other"));
                    differ = true;
                }
            }
        }
        for name in b.child_names() {
            if !a.has_child(name) {
                record(info, format!("child `{name}` missing from self"));
                differ = true;
            }
        }
    } else {
        if a.number_of_children() != b.number_of_children() {
            record(
                info,
                format!(
                    "list length mismatch: {} vs {}",
                    a.number_of_children(),
                    b.number_of_children()
                ),
            );
            return true;
        }
        for (i, (ca, cb)) in a.children().zip(b.children()).enumerate() {
            let mut sub = Node::new();
            if diff_nodes(ca, cb, &mut sub, epsilon, relative) {
                let slot = info.fetch_mut("children").fetch_mut(&i.to_string());
                *slot = sub;
                differ = true;
            }
        }
    }

    if info.has_child("children") && info["children"].number_of_children() == 0 {
        let _ = info.remove("children");
    }
    differ
}
