//! The mesh `index` protocol: a lightweight table of contents describing
//! where each entity of a (possibly multi-domain) mesh lives, suitable for
//! I/O layers that resolve entities lazily.

use crate::error::BlueprintError;
use crate::node::Node;

use super::helpers::{log, verify_integer_field, verify_object_field, verify_reference_field};
use super::{adjset, coordset, field, matset, nestset, specset, topology};

pub fn verify(index: &Node, info: &mut Node) -> bool {
    let proto = "index";
    let mut res = true;

    if index.has_child("state") {
        res &= verify_integer_field(
            proto,
            &index["state"],
            info.fetch_mut("state"),
            "number_of_domains",
        );
    }

    res &= verify_object_field(proto, index, info, "coordsets");
    res &= verify_object_field(proto, index, info, "topologies");
    if !res {
        log::validation(info, res);
        return false;
    }

    for (name, cset) in index["coordsets"].entries() {
        let name = name.unwrap_or("");
        res &= coordset::index::verify(cset, info.fetch_mut("coordsets").fetch_mut(name));
    }
    for (name, topo) in index["topologies"].entries() {
        let name = name.unwrap_or("");
        let tinfo = info.fetch_mut("topologies").fetch_mut(name);
        let topo_res = topology::index::verify(topo, tinfo)
            && verify_reference_field(proto, topo, tinfo, index, "coordset", "coordsets");
        res &= topo_res;
    }
    if index.has_child("matsets") {
        for (name, m) in index["matsets"].entries() {
            let name = name.unwrap_or("");
            let minfo = info.fetch_mut("matsets").fetch_mut(name);
            let m_res = matset::index::verify(m, minfo)
                && verify_reference_field(proto, m, minfo, index, "topology", "topologies");
            res &= m_res;
        }
    }
    if index.has_child("specsets") {
        for (name, s) in index["specsets"].entries() {
            let name = name.unwrap_or("");
            let sinfo = info.fetch_mut("specsets").fetch_mut(name);
            let s_res = specset::index::verify(s, sinfo)
                && verify_reference_field(proto, s, sinfo, index, "matset", "matsets");
            res &= s_res;
        }
    }
    if index.has_child("fields") {
        for (name, f) in index["fields"].entries() {
            let name = name.unwrap_or("");
            let finfo = info.fetch_mut("fields").fetch_mut(name);
            let mut f_res = field::index::verify(f, finfo);
            if f.has_child("topology") {
                f_res &= verify_reference_field(proto, f, finfo, index, "topology", "topologies");
            }
            if f.has_child("matset") {
                f_res &= verify_reference_field(proto, f, finfo, index, "matset", "matsets");
            }
            res &= f_res;
        }
    }
    if index.has_child("adjsets") {
        for (name, a) in index["adjsets"].entries() {
            let name = name.unwrap_or("");
            let ainfo = info.fetch_mut("adjsets").fetch_mut(name);
            let a_res = adjset::index::verify(a, ainfo)
                && verify_reference_field(proto, a, ainfo, index, "topology", "topologies");
            res &= a_res;
        }
    }
    if index.has_child("nestsets") {
        for (name, n) in index["nestsets"].entries() {
            let name = name.unwrap_or("");
            let ninfo = info.fetch_mut("nestsets").fetch_mut(name);
            let n_res = nestset::index::verify(n, ninfo)
                && verify_reference_field(proto, n, ninfo, index, "topology", "topologies");
            res &= n_res;
        }
    }

    log::validation(info, res);
    res
}

/// Generate an index subtree for one verified single-domain mesh rooted at
/// `ref_path` (the path an I/O layer will prepend to entity paths).
pub fn generate_for_single_domain(
    mesh: &Node,
    ref_path: &str,
    num_domains: usize,
) -> Result<Node, BlueprintError> {
    let mut index = Node::new();
    index["state/number_of_domains"].set(num_domains as i64);

    let join = |section: &str, name: &str| {
        super::helpers::join_path(ref_path, &super::helpers::join_path(section, name))
    };

    for (name, cset) in mesh.fetch("coordsets")?.entries() {
        let name = name.unwrap_or("");
        let entry = index.fetch_mut("coordsets").fetch_mut(name);
        entry["type"].set_string(cset.fetch("type")?.as_str()?);
        let csys = if coordset::axes(cset).first().map(String::as_str) == Some("r") {
            "cylindrical"
        } else {
            "cartesian"
        };
        entry["coord_system/type"].set_string(csys);
        for axis in coordset::axes(cset) {
            entry.fetch_mut("coord_system/axes").fetch_mut(&axis);
        }
        entry["path"].set_string(&join("coordsets", name));
    }

    for (name, topo) in mesh.fetch("topologies")?.entries() {
        let name = name.unwrap_or("");
        let entry = index.fetch_mut("topologies").fetch_mut(name);
        entry["type"].set_string(topo.fetch("type")?.as_str()?);
        entry["coordset"].set_string(topo.fetch("coordset")?.as_str()?);
        entry["path"].set_string(&join("topologies", name));
    }

    if let Some(matsets) = mesh.try_fetch("matsets") {
        for (name, m) in matsets.entries() {
            let name = name.unwrap_or("");
            let entry = index.fetch_mut("matsets").fetch_mut(name);
            entry["topology"].set_string(m.fetch("topology")?.as_str()?);
            if let Some(map) = m.try_fetch("material_map") {
                *entry.fetch_mut("material_map") = map.clone();
            } else if let Some(vfs) = m.try_fetch("volume_fractions") {
                for vf_name in vfs.child_names() {
                    entry.fetch_mut("materials").fetch_mut(vf_name);
                }
            }
            entry["path"].set_string(&join("matsets", name));
        }
    }

    if let Some(fields) = mesh.try_fetch("fields") {
        for (name, f) in fields.entries() {
            let name = name.unwrap_or("");
            let entry = index.fetch_mut("fields").fetch_mut(name);
            for link in ["topology", "matset"] {
                if let Some(target) = f.try_fetch(link) {
                    entry.fetch_mut(link).set_string(target.as_str()?);
                }
            }
            if let Some(assoc) = f.try_fetch("association") {
                entry["association"].set_string(assoc.as_str()?);
            } else if let Some(basis) = f.try_fetch("basis") {
                entry["basis"].set_string(basis.as_str()?);
            }
            let ncomp = f
                .try_fetch("values")
                .map(|v| if v.is_object() { v.number_of_children() } else { 1 })
                .unwrap_or(1);
            entry["number_of_components"].set(ncomp as i64);
            entry["path"].set_string(&join("fields", name));
        }
    }

    if let Some(adjsets) = mesh.try_fetch("adjsets") {
        for (name, a) in adjsets.entries() {
            let name = name.unwrap_or("");
            let entry = index.fetch_mut("adjsets").fetch_mut(name);
            entry["topology"].set_string(a.fetch("topology")?.as_str()?);
            entry["association"].set_string(a.fetch("association")?.as_str()?);
            entry["path"].set_string(&join("adjsets", name));
        }
    }

    if let Some(nestsets) = mesh.try_fetch("nestsets") {
        for (name, n) in nestsets.entries() {
            let name = name.unwrap_or("");
            let entry = index.fetch_mut("nestsets").fetch_mut(name);
            entry["topology"].set_string(n.fetch("topology")?.as_str()?);
            entry["association"].set_string(n.fetch("association")?.as_str()?);
            entry["path"].set_string(&join("nestsets", name));
        }
    }

    Ok(index)
}
