//! Nestset verification: AMR parent/child window descriptors.

use crate::node::Node;

use super::field::association;
use super::helpers::{
    log, verify_enum_field, verify_field_exists, verify_integer_field, verify_object_field,
    verify_string_field,
};

pub const NESTSET_TYPES: [&str; 2] = ["parent", "child"];

fn verify_logical_dims(proto: &str, dims: &Node, info: &mut Node) -> bool {
    let mut res = true;
    for (i, name) in dims.child_names().iter().enumerate() {
        let expected = ["i", "j", "k"].get(i).copied().unwrap_or("");
        if name != expected {
            log::error(info, proto, &format!("unexpected logical axis `{name}`"));
            res = false;
        } else if !dims[name.as_str()].dtype().is_integer() {
            log::error(info, proto, &format!("`{name}` is not an integer"));
            res = false;
        }
    }
    res && dims.number_of_children() > 0
}

pub fn verify(nestset: &Node, info: &mut Node) -> bool {
    let proto = "nestset";
    let mut res = verify_string_field(proto, nestset, info, "topology");
    res &= verify_field_exists(proto, nestset, info, "association")
        && association::verify(&nestset["association"], info.fetch_mut("association"));

    if !verify_object_field(proto, nestset, info, "windows") {
        res = false;
    } else {
        let mut windows_res = true;
        let names: Vec<String> = nestset["windows"].child_names().to_vec();
        for name in names {
            let window = &nestset["windows"][name.as_str()];
            let winfo = info.fetch_mut("windows").fetch_mut(&name);
            let mut window_res = verify_integer_field(proto, window, winfo, "domain_id");
            window_res &= verify_enum_field(proto, window, winfo, "domain_type", &NESTSET_TYPES);

            for block in ["ratio", "origin", "dims"] {
                let required = block == "ratio";
                match window.try_fetch(block) {
                    Some(b) => window_res &= verify_logical_dims(proto, b, winfo),
                    None if required => {
                        log::error(winfo, proto, &format!("window missing `{block}`"));
                        window_res = false;
                    }
                    None => {}
                }
            }

            // origin/dims extents must agree with ratio's dimensionality
            if window_res {
                let rank = window["ratio"].number_of_children();
                for block in ["origin", "dims"] {
                    if let Some(b) = window.try_fetch(block) {
                        if b.number_of_children() != rank {
                            log::error(
                                winfo,
                                proto,
                                &format!("`{block}` rank disagrees with `ratio`"),
                            );
                            window_res = false;
                        }
                    }
                }
            }

            log::validation(winfo, window_res);
            windows_res &= window_res;
        }
        res &= windows_res;
    }

    log::validation(info, res);
    res
}

pub mod index {
    use super::*;

    pub fn verify(nest_idx: &Node, info: &mut Node) -> bool {
        let proto = "nestset::index";
        let mut res = verify_string_field(proto, nest_idx, info, "topology");
        res &= verify_field_exists(proto, nest_idx, info, "association")
            && association::verify(&nest_idx["association"], info.fetch_mut("association"));
        res &= verify_string_field(proto, nest_idx, info, "path");
        log::validation(info, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_descriptors_verify() {
        let mut n = Node::new();
        n["topology"].set_string("mesh");
        n["association"].set_string("element");
        n["windows/window_0/domain_id"].set(1i64);
        n["windows/window_0/domain_type"].set_string("child");
        n["windows/window_0/ratio/i"].set(2i64);
        n["windows/window_0/ratio/j"].set(2i64);
        n["windows/window_0/origin/i"].set(0i64);
        n["windows/window_0/origin/j"].set(0i64);
        n["windows/window_0/dims/i"].set(4i64);
        n["windows/window_0/dims/j"].set(4i64);
        let mut info = Node::new();
        assert!(verify(&n, &mut info), "{}", info.to_text());
    }

    #[test]
    fn rank_mismatch_fails() {
        let mut n = Node::new();
        n["topology"].set_string("mesh");
        n["association"].set_string("element");
        n["windows/w/domain_id"].set(1i64);
        n["windows/w/domain_type"].set_string("parent");
        n["windows/w/ratio/i"].set(2i64);
        n["windows/w/origin/i"].set(0i64);
        n["windows/w/origin/j"].set(0i64);
        let mut info = Node::new();
        assert!(!verify(&n, &mut info));
    }
}
