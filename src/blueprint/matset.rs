//! Matset verification and buffer-flavor queries.
//!
//! A matset carries per-element material volume fractions, either
//! uni-buffer (one sparse interleaved array plus `material_ids`) or
//! multi-buffer (one array per material), and either element-dominant or
//! material-dominant (`element_ids` present).

use crate::node::Node;

use super::helpers::{
    log, verify_field_exists, verify_integer_field, verify_number_field, verify_object_field,
    verify_string_field,
};
use super::o2m;

pub(crate) fn verify_material_map(proto: &str, matset: &Node, info: &mut Node) -> bool {
    let mut res = verify_object_field(proto, matset, info, "material_map");
    if res {
        for (name, child) in matset["material_map"].entries() {
            if !child.dtype().is_integer() {
                log::error(
                    info,
                    proto,
                    &format!("material_map child `{}` is not an integer leaf", name.unwrap_or("")),
                );
                res = false;
            }
        }
    }
    res
}

pub fn verify(matset: &Node, info: &mut Node) -> bool {
    let proto = "matset";
    let mut res = verify_string_field(proto, matset, info, "topology");
    let mut material_map_optional = true;

    let vfs_res = verify_field_exists(proto, matset, info, "volume_fractions");
    res &= vfs_res;
    if vfs_res {
        let vfs = &matset["volume_fractions"];
        if vfs.dtype().is_number() {
            log::optional(info, proto, "detected uni-buffer matset");
            material_map_optional = false;
            res &= verify_integer_field(proto, matset, info, "material_ids");
            res &= o2m::verify(matset, info.fetch_mut("o2mrelation"));
        } else if vfs.is_object() && verify_object_field(proto, matset, info, "volume_fractions") {
            log::optional(info, proto, "detected multi-buffer matset");
            let names: Vec<String> = vfs.child_names().to_vec();
            for name in names {
                let mat = &matset["volume_fractions"][name.as_str()];
                let mat_res = if mat.is_object() {
                    o2m::verify(mat, info.fetch_mut("volume_fractions").fetch_mut(&name))
                } else {
                    verify_number_field(
                        proto,
                        &matset["volume_fractions"],
                        info.fetch_mut("volume_fractions"),
                        &name,
                    )
                };
                res &= mat_res;
            }
        } else {
            log::error(info, proto, "`volume_fractions` isn't the correct type");
            res = false;
        }
    }

    if !material_map_optional && !matset.has_child("material_map") {
        log::error(info, proto, "`material_map` is required for uni-buffer matsets");
        res = false;
    }
    if matset.has_child("material_map") {
        res &= verify_material_map(proto, matset, info);
        if matset.try_fetch("volume_fractions").map(Node::is_object) == Some(true) {
            for name in matset["material_map"].child_names() {
                if !matset["volume_fractions"].has_child(name) {
                    log::error(
                        info,
                        proto,
                        &format!("`material_map` names `{name}` missing from `volume_fractions`"),
                    );
                    res = false;
                }
            }
        }
    }

    if matset.has_child("element_ids") {
        let eids = &matset["element_ids"];
        if eids.is_object() {
            for name in eids.child_names() {
                res &= verify_integer_field(
                    proto,
                    &matset["element_ids"],
                    info.fetch_mut("element_ids"),
                    name,
                );
            }
        } else if eids.dtype().is_integer() {
            res &= verify_integer_field(proto, matset, info, "element_ids");
        } else {
            log::error(info, proto, "`element_ids` isn't the correct type");
            res = false;
        }
    }

    log::validation(info, res);
    res
}

/// One value array per material.
pub fn is_multi_buffer(matset: &Node) -> bool {
    matset
        .try_fetch("volume_fractions")
        .map(Node::is_object)
        .unwrap_or(false)
}

/// One sparse interleaved array for all materials.
pub fn is_uni_buffer(matset: &Node) -> bool {
    matset
        .try_fetch("volume_fractions")
        .map(|v| v.dtype().is_number())
        .unwrap_or(false)
}

pub fn is_element_dominant(matset: &Node) -> bool {
    !matset.has_child("element_ids")
}

pub fn is_material_dominant(matset: &Node) -> bool {
    matset.has_child("element_ids")
}

pub mod index {
    use super::*;

    pub fn verify(matset_idx: &Node, info: &mut Node) -> bool {
        let proto = "matset::index";
        let mut res = verify_string_field(proto, matset_idx, info, "topology");
        if matset_idx.has_child("material_map") {
            res &= verify_material_map(proto, matset_idx, info);
        } else {
            res &= verify_object_field(proto, matset_idx, info, "materials");
        }
        res &= verify_string_field(proto, matset_idx, info, "path");
        log::validation(info, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi_buffer_matset() -> Node {
        let mut m = Node::new();
        m["topology"].set_string("mesh");
        m["volume_fractions/steel"].set_slice(&[1.0f64, 0.5, 0.0]);
        m["volume_fractions/air"].set_slice(&[0.0f64, 0.5, 1.0]);
        m
    }

    #[test]
    fn multi_buffer_verifies() {
        let m = multi_buffer_matset();
        let mut info = Node::new();
        assert!(verify(&m, &mut info), "{}", info.to_text());
        assert!(is_multi_buffer(&m));
        assert!(is_element_dominant(&m));
    }

    #[test]
    fn uni_buffer_requires_material_map() {
        let mut m = Node::new();
        m["topology"].set_string("mesh");
        m["volume_fractions"].set_slice(&[1.0f64, 0.5, 0.5, 1.0]);
        m["material_ids"].set_slice(&[0i64, 0, 1, 1]);
        let mut info = Node::new();
        assert!(!verify(&m, &mut info), "material_map missing");
        m["material_map/steel"].set(0i64);
        m["material_map/air"].set(1i64);
        assert!(verify(&m, &mut info), "{}", info.to_text());
        assert!(is_uni_buffer(&m));
    }
}
