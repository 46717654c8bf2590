//! Field verification.
//!
//! A field carries values on a topology (via `association` or `basis`) or
//! on a matset (`matset_values`), with each declared reference requiring
//! its companion values block.

use crate::node::Node;

use super::helpers::{log, verify_mcarray_field, verify_string_field};

pub const ASSOCIATIONS: [&str; 2] = ["vertex", "element"];

pub mod association {
    use super::*;

    pub fn verify(assoc: &Node, info: &mut Node) -> bool {
        let proto = "association";
        let value = assoc.as_str().unwrap_or("");
        let res = ASSOCIATIONS.contains(&value);
        if !res {
            log::error(info, proto, &format!("`{value}` not in {ASSOCIATIONS:?}"));
        }
        log::validation(info, res);
        res
    }
}

pub mod basis {
    use super::*;

    pub fn verify(basis: &Node, info: &mut Node) -> bool {
        let proto = "field::basis";
        let res = basis.dtype().is_string();
        if !res {
            log::error(info, proto, "basis is not a string");
        }
        log::validation(info, res);
        res
    }
}

pub fn verify(field: &Node, info: &mut Node) -> bool {
    let proto = "field";
    let mut res = true;

    let has_assoc = field.has_child("association");
    let has_basis = field.has_child("basis");
    if !has_assoc && !has_basis {
        log::error(info, proto, "missing child `association` or `basis`");
        res = false;
    }
    if has_assoc {
        res &= association::verify(&field["association"], info.fetch_mut("association"));
    }
    if has_basis {
        res &= basis::verify(&field["basis"], info.fetch_mut("basis"));
    }

    let has_topo = field.has_child("topology");
    let has_matset = field.has_child("matset");
    let has_values = field.has_child("values");
    let has_matset_values = field.has_child("matset_values");
    if !has_topo && !has_matset {
        log::error(info, proto, "missing child `topology` or `matset`");
        res = false;
    }

    if has_topo != has_values {
        log::error(info, proto, "`topology` and `values` must appear together");
        res = false;
    } else if has_topo {
        res &= verify_string_field(proto, field, info, "topology");
        res &= verify_mcarray_field(proto, field, info, "values");
    }

    if has_matset != has_matset_values {
        log::error(info, proto, "`matset` and `matset_values` must appear together");
        res = false;
    } else if has_matset {
        res &= verify_string_field(proto, field, info, "matset");
        res &= verify_mcarray_field(proto, field, info, "matset_values");
    }

    log::validation(info, res);
    res
}

/// A field is volume-dependent when it declares so.
pub fn is_volume_dependent(field: &Node) -> bool {
    field
        .try_fetch("volume_dependent")
        .and_then(|v| v.as_str().ok())
        .map(|s| s == "true")
        .unwrap_or(false)
}

pub mod index {
    use super::*;
    use crate::blueprint::helpers::verify_integer_field;

    pub fn verify(field_idx: &Node, info: &mut Node) -> bool {
        let proto = "field::index";
        let mut res = true;

        let has_assoc = field_idx.has_child("association");
        let has_basis = field_idx.has_child("basis");
        if !has_assoc && !has_basis {
            log::error(info, proto, "missing child `association` or `basis`");
            res = false;
        }
        if has_assoc {
            res &= association::verify(&field_idx["association"], info.fetch_mut("association"));
        }
        if has_basis {
            res &= basis::verify(&field_idx["basis"], info.fetch_mut("basis"));
        }

        let has_topo = field_idx.has_child("topology");
        let has_matset = field_idx.has_child("matset");
        if !has_topo && !has_matset {
            log::error(info, proto, "missing child `topology` or `matset`");
            res = false;
        }
        if has_topo {
            res &= verify_string_field(proto, field_idx, info, "topology");
        }
        if has_matset {
            res &= verify_string_field(proto, field_idx, info, "matset");
        }

        res &= verify_integer_field(proto, field_idx, info, "number_of_components");
        res &= verify_string_field(proto, field_idx, info, "path");

        log::validation(info, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_field_verifies() {
        let mut f = Node::new();
        f["association"].set_string("vertex");
        f["topology"].set_string("mesh");
        f["values"].set_slice(&[1.0f64, 2.0, 3.0]);
        let mut info = Node::new();
        assert!(verify(&f, &mut info), "{}", info.to_text());
        assert!(!is_volume_dependent(&f));
    }

    #[test]
    fn topology_without_values_fails() {
        let mut f = Node::new();
        f["association"].set_string("element");
        f["topology"].set_string("mesh");
        let mut info = Node::new();
        assert!(!verify(&f, &mut info));
    }

    #[test]
    fn bad_association_fails() {
        let mut f = Node::new();
        f["association"].set_string("cell");
        f["topology"].set_string("mesh");
        f["values"].set_slice(&[1.0f64]);
        let mut info = Node::new();
        assert!(!verify(&f, &mut info));
    }
}
