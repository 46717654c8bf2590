//! Adjset verification and canonical-form queries.
//!
//! An adjset names, per group, the neighboring domains and the shared
//! vertices/elements. Pairwise form has exactly one neighbor per group;
//! max-share form lists every shared entity exactly once across groups.

use std::collections::HashSet;

use crate::node::Node;

use super::field::association;
use super::helpers::{
    log, verify_field_exists, verify_integer_field, verify_object_field, verify_string_field,
};

pub fn verify(adjset: &Node, info: &mut Node) -> bool {
    let proto = "adjset";
    let mut res = verify_string_field(proto, adjset, info, "topology");
    res &= verify_field_exists(proto, adjset, info, "association")
        && association::verify(&adjset["association"], info.fetch_mut("association"));

    if !verify_object_field(proto, adjset, info, "groups") {
        res = false;
    } else {
        let mut groups_res = true;
        let names: Vec<String> = adjset["groups"].child_names().to_vec();
        for name in names {
            let group = &adjset["groups"][name.as_str()];
            let ginfo = info.fetch_mut("groups").fetch_mut(&name);
            let mut group_res = verify_integer_field(proto, group, ginfo, "neighbors");
            if group.has_child("values") {
                group_res &= verify_integer_field(proto, group, ginfo, "values");
            } else if group.has_child("windows") {
                group_res &= verify_object_field(proto, group, ginfo, "windows");
                if group_res {
                    for (_, window) in group["windows"].entries() {
                        for block in ["origin", "dims", "ratio"] {
                            if !window.has_child(block) {
                                log::error(
                                    ginfo,
                                    proto,
                                    &format!("window missing `{block}`"),
                                );
                                group_res = false;
                            }
                        }
                    }
                }
            } else {
                log::error(ginfo, proto, "group carries neither `values` nor `windows`");
                group_res = false;
            }
            log::validation(ginfo, group_res);
            groups_res &= group_res;
        }
        res &= groups_res;
    }

    log::validation(info, res);
    res
}

/// Every group names exactly one neighbor.
pub fn is_pairwise(adjset: &Node) -> bool {
    match adjset.try_fetch("groups") {
        Some(groups) => groups.children().all(|g| {
            g.try_fetch("neighbors")
                .map(|n| n.dtype().num_elements() == 1)
                .unwrap_or(false)
        }),
        None => false,
    }
}

/// No shared entity appears in more than one group.
pub fn is_maxshare(adjset: &Node) -> bool {
    let groups = match adjset.try_fetch("groups") {
        Some(g) => g,
        None => return false,
    };
    let mut seen = HashSet::new();
    for group in groups.children() {
        let values = match group.try_fetch("values").and_then(|v| v.to_vec::<i64>().ok()) {
            Some(v) => v,
            None => return false,
        };
        for v in values {
            if !seen.insert(v) {
                return false;
            }
        }
    }
    true
}

pub mod index {
    use super::*;

    pub fn verify(adj_idx: &Node, info: &mut Node) -> bool {
        let proto = "adjset::index";
        let mut res = verify_string_field(proto, adj_idx, info, "topology");
        res &= verify_field_exists(proto, adj_idx, info, "association")
            && association::verify(&adj_idx["association"], info.fetch_mut("association"));
        res &= verify_string_field(proto, adj_idx, info, "path");
        log::validation(info, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairwise_adjset() -> Node {
        let mut a = Node::new();
        a["topology"].set_string("mesh");
        a["association"].set_string("vertex");
        a["groups/group_0_1/neighbors"].set_slice(&[1i64]);
        a["groups/group_0_1/values"].set_slice(&[3i64, 4, 5]);
        a
    }

    #[test]
    fn pairwise_verifies() {
        let a = pairwise_adjset();
        let mut info = Node::new();
        assert!(verify(&a, &mut info), "{}", info.to_text());
        assert!(is_pairwise(&a));
        assert!(is_maxshare(&a));
    }

    #[test]
    fn duplicated_values_break_maxshare() {
        let mut a = pairwise_adjset();
        a["groups/group_0_2/neighbors"].set_slice(&[2i64]);
        a["groups/group_0_2/values"].set_slice(&[5i64]);
        assert!(!is_maxshare(&a));
        let mut info = Node::new();
        assert!(verify(&a, &mut info));
    }
}
