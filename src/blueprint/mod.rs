//! Mesh blueprint conventions: protocol verification, conversion, and
//! derived-topology generation over [`Node`](crate::node::Node) trees.
//!
//! The entry point is [`verify`]: given a protocol name from the closed set
//! (`mesh`, `coordset`, `topology`, `matset`, `specset`, `field`, `adjset`,
//! `nestset`, `index`, and their `<entity>/index` forms) it decides whether
//! a tree conforms, recording structured diagnostics in a parallel `info`
//! tree. Verification is pure and never errors on invalid input.

pub mod adjset;
pub mod coordset;
pub mod field;
pub(crate) mod helpers;
pub mod generate;
pub mod index;
pub mod matset;
pub mod metadata;
pub mod nestset;
pub mod o2m;
pub mod shape;
pub mod specset;
pub mod topology;

pub use self::helpers::{find_widest_float_dtype, find_widest_int_dtype, join_path};

use crate::error::BlueprintError;
use crate::node::Node;

use self::helpers::{log, verify_object_field, verify_reference_field};

/// The protocol names [`verify`] understands.
pub const PROTOCOLS: [&str; 9] = [
    "mesh", "coordset", "topology", "matset", "specset", "field", "adjset", "nestset", "index",
];

/// Verify `node` against a named protocol. Unknown protocol names fail
/// with a diagnostic (they never panic).
pub fn verify(protocol: &str, node: &Node, info: &mut Node) -> bool {
    info.reset();
    match protocol {
        "mesh" => verify_mesh(node, info),
        "coordset" => coordset::verify(node, info),
        "topology" => topology::verify(node, info),
        "matset" => matset::verify(node, info),
        "specset" => specset::verify(node, info),
        "field" => field::verify(node, info),
        "adjset" => adjset::verify(node, info),
        "nestset" => nestset::verify(node, info),
        "index" => index::verify(node, info),
        "coordset/index" => coordset::index::verify(node, info),
        "topology/index" => topology::index::verify(node, info),
        "matset/index" => matset::index::verify(node, info),
        "specset/index" => specset::index::verify(node, info),
        "field/index" => field::index::verify(node, info),
        "adjset/index" => adjset::index::verify(node, info),
        "nestset/index" => nestset::index::verify(node, info),
        other => {
            log::error(info, "blueprint", &format!("unknown protocol `{other}`"));
            log::validation(info, false);
            false
        }
    }
}

/// True when the tree is a multi-domain parent rather than a single domain.
pub fn is_multi_domain(mesh: &Node) -> bool {
    (mesh.is_object() || mesh.is_list())
        && mesh.number_of_children() > 0
        && mesh.children().all(|c| c.has_child("coordsets"))
        && !mesh.has_child("coordsets")
}

/// The domains of a mesh in declaration order. A single-domain mesh yields
/// itself; an empty mesh yields nothing.
pub fn domains(mesh: &Node) -> Vec<&Node> {
    if mesh.is_empty() {
        Vec::new()
    } else if is_multi_domain(mesh) {
        mesh.children().collect()
    } else {
        vec![mesh]
    }
}

/// Mutable variant of [`domains`].
pub fn domains_mut(mesh: &mut Node) -> Vec<&mut Node> {
    if mesh.is_empty() {
        Vec::new()
    } else if is_multi_domain(mesh) {
        mesh.children_mut().collect()
    } else {
        vec![mesh]
    }
}

/// Number of local domains.
pub fn number_of_domains(mesh: &Node) -> usize {
    domains(mesh).len()
}

/// Re-shape a mesh into multi-domain (list) form. Multi-domain inputs
/// deep-copy; single domains become the sole entry.
pub fn to_multi_domain(mesh: &Node) -> Node {
    let mut dest = Node::new();
    if is_multi_domain(mesh) {
        dest.set_node(mesh);
    } else if !mesh.is_empty() {
        dest.append().set_node(mesh);
    }
    dest
}

/// Verify a (single- or multi-domain) mesh tree.
pub fn verify_mesh(mesh: &Node, info: &mut Node) -> bool {
    if mesh.is_empty() {
        // an empty tree is a valid (empty) mesh
        log::validation(info, true);
        return true;
    }
    if is_multi_domain(mesh) {
        let mut res = true;
        for (i, dom) in mesh.children().enumerate() {
            let name = mesh
                .child_names()
                .get(i)
                .cloned()
                .unwrap_or_else(|| i.to_string());
            res &= verify_single_domain(dom, info.fetch_mut("domains").fetch_mut(&name));
        }
        log::validation(info, res);
        res
    } else {
        verify_single_domain(mesh, info)
    }
}

fn verify_single_domain(mesh: &Node, info: &mut Node) -> bool {
    let proto = "mesh";
    let mut res = verify_object_field(proto, mesh, info, "coordsets");
    res &= verify_object_field(proto, mesh, info, "topologies");
    if !res {
        log::validation(info, res);
        return false;
    }

    for (name, cset) in mesh["coordsets"].entries() {
        let name = name.unwrap_or("");
        res &= coordset::verify(cset, info.fetch_mut("coordsets").fetch_mut(name));
    }

    for (name, topo) in mesh["topologies"].entries() {
        let name = name.unwrap_or("");
        let tinfo = info.fetch_mut("topologies").fetch_mut(name);
        let mut topo_res = topology::verify(topo, tinfo);
        topo_res &= verify_reference_field(proto, topo, tinfo, mesh, "coordset", "coordsets");
        res &= topo_res;
    }

    for (section, verifier, link, link_section) in [
        ("matsets", matset::verify as fn(&Node, &mut Node) -> bool, "topology", "topologies"),
        ("specsets", specset::verify as fn(&Node, &mut Node) -> bool, "matset", "matsets"),
        ("adjsets", adjset::verify as fn(&Node, &mut Node) -> bool, "topology", "topologies"),
        ("nestsets", nestset::verify as fn(&Node, &mut Node) -> bool, "topology", "topologies"),
    ] {
        if let Some(entities) = mesh.try_fetch(section) {
            for (name, entity) in entities.entries() {
                let name = name.unwrap_or("");
                let einfo = info.fetch_mut(section).fetch_mut(name);
                let mut e_res = verifier(entity, einfo);
                e_res &= verify_reference_field(proto, entity, einfo, mesh, link, link_section);
                res &= e_res;
            }
        }
    }

    if let Some(fields) = mesh.try_fetch("fields") {
        for (name, f) in fields.entries() {
            let name = name.unwrap_or("");
            let finfo = info.fetch_mut("fields").fetch_mut(name);
            let mut f_res = field::verify(f, finfo);
            if f.has_child("topology") {
                f_res &= verify_reference_field(proto, f, finfo, mesh, "topology", "topologies");
            }
            if f.has_child("matset") {
                f_res &= verify_reference_field(proto, f, finfo, mesh, "matset", "matsets");
            }
            res &= f_res;
        }
    }

    log::validation(info, res);
    res
}

/// Generate the `index` protocol tree for a mesh.
pub fn generate_index(mesh: &Node, ref_path: &str) -> Result<Node, BlueprintError> {
    let doms = domains(mesh);
    let first = doms
        .first()
        .ok_or_else(|| BlueprintError::NonConforming("empty mesh has no index".into()))?;
    index::generate_for_single_domain(first, ref_path, doms.len())
}
