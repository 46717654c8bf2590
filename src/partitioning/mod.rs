//! Distributed mesh partitioning driver.
//!
//! Given any number of local domains across a set of workers, the driver
//! assigns every element of a chosen topology to one of N partitions by
//! invoking an external graph partitioner, and writes the assignment back
//! as an element-associated field on every domain.
//!
//! The algorithm follows the classic three-phase shape: establish a global
//! element/vertex numbering with a max all-reduce plus exclusive prefix
//! sums, flatten the local domains into the partitioner's
//! `{eldist, eptr, eind}` arrays, and scatter the resulting `part` vector
//! back over the local domains. The only blocking points are the two
//! collective reductions and the partitioner call itself.

pub mod comm;
pub mod parmetis;

pub use self::parmetis::{Idx, MeshKwayInput, MeshPartitioner, Real};

use crate::blueprint::{self, coordset, o2m::O2MIndex, shape::Shape, topology};
use crate::error::BlueprintError;
use crate::node::dtype::DTypeId;
use crate::node::Node;

use self::comm::Communicator;
use crate::blueprint::helpers::set_int_slice;

/// Options for [`generate_partition_field`] and
/// [`generate_global_element_and_vertex_ids`].
#[derive(Clone, Debug, Default)]
pub struct PartitionFieldOptions {
    /// Topology to partition; defaults to the first topology of the first
    /// local domain.
    pub topology: Option<String>,
    /// Prefix for the emitted field names.
    pub field_prefix: String,
    /// Number of parts; defaults to the global domain count.
    pub partitions: Option<Idx>,
    /// Shared vertices that make two elements adjacent; defaults to the
    /// coordset dimensionality. For 1D topologies that default is 1, which
    /// the partitioner accepts but rarely does anything useful with.
    pub ncommon_nodes: Option<Idx>,
}

impl PartitionFieldOptions {
    /// Bridge from an options subtree carrying any of the recognized keys
    /// `topology`, `field_prefix`, `partitions`, `parmetis_ncommonnodes`.
    pub fn from_node(options: &Node) -> Result<Self, BlueprintError> {
        let mut out = PartitionFieldOptions::default();
        if let Some(t) = options.try_fetch("topology") {
            out.topology = Some(t.as_str()?.to_string());
        }
        if let Some(p) = options.try_fetch("field_prefix") {
            out.field_prefix = p.as_str()?.to_string();
        }
        if let Some(p) = options.try_fetch("partitions") {
            out.partitions = Some(p.to_i64()? as Idx);
        }
        if let Some(n) = options.try_fetch("parmetis_ncommonnodes") {
            out.ncommon_nodes = Some(n.to_i64()? as Idx);
        }
        Ok(out)
    }
}

/// Total domain count across all workers.
pub fn global_number_of_domains(
    mesh: &Node,
    comm: &impl Communicator,
) -> Result<usize, BlueprintError> {
    let mut local = vec![0u64; comm.size()];
    local[comm.rank()] = blueprint::number_of_domains(mesh) as u64;
    let mut global = vec![0u64; comm.size()];
    comm.max_all_reduce_u64(&local, &mut global)?;
    Ok(global.iter().sum::<u64>() as usize)
}

fn domain_has_topology(dom: &Node, topo_name: &str) -> bool {
    !topo_name.is_empty() && dom.has_path(&format!("topologies/{topo_name}"))
}

fn resolve_topology_name(mesh: &Node, options: &PartitionFieldOptions) -> Option<String> {
    if let Some(name) = &options.topology {
        return Some(name.clone());
    }
    let doms = blueprint::domains(mesh);
    let first = doms.first()?;
    first
        .try_fetch("topologies")
        .and_then(|t| t.child_names().first().cloned())
}

/// Per-element global-vertex lists of a topology, flattened: returns the
/// per-element vertex counts and the concatenated local vertex ids.
fn element_vertex_lists(
    dom: &Node,
    topo_name: &str,
) -> Result<(Vec<usize>, Vec<u64>), BlueprintError> {
    let topo = dom.fetch(&format!("topologies/{topo_name}"))?;
    let cset_name = topo.fetch("coordset")?.as_str()?.to_string();
    let cset = dom.fetch(&format!("coordsets/{cset_name}"))?;

    match topo.fetch("type")?.as_str()? {
        "points" => {
            let n = coordset::length(cset)?;
            Ok((vec![1; n], (0..n as u64).collect()))
        }
        "unstructured" => {
            let shape = topology::shape_of(topo)?;
            let conn = topo.fetch("elements/connectivity")?.to_vec::<u64>()?;
            if shape == Shape::Polyhedral {
                // element vertices live behind the face indirection
                let sub_conn = topo.fetch("subelements/connectivity")?.to_vec::<u64>()?;
                let sub_idx = O2MIndex::from_node(topo.fetch("subelements")?, "connectivity", 0)?;
                let elem_idx = O2MIndex::from_node(topo.fetch("elements")?, "connectivity", 0)?;
                let mut sizes = Vec::with_capacity(elem_idx.ones());
                let mut verts = Vec::new();
                for (_, many) in elem_idx.iter() {
                    let mut cell_verts: Vec<u64> = Vec::new();
                    for mi in many {
                        let fid = conn[mi] as usize;
                        for si in sub_idx.many(fid) {
                            if !cell_verts.contains(&sub_conn[si]) {
                                cell_verts.push(sub_conn[si]);
                            }
                        }
                    }
                    sizes.push(cell_verts.len());
                    verts.extend(cell_verts);
                }
                Ok((sizes, verts))
            } else {
                let idx = O2MIndex::from_node(topo.fetch("elements")?, "connectivity", shape.indices())?;
                let mut sizes = Vec::with_capacity(idx.ones());
                let mut verts = Vec::with_capacity(conn.len());
                for (_, many) in idx.iter() {
                    sizes.push(many.len());
                    verts.extend(many.map(|mi| conn[mi]));
                }
                Ok((sizes, verts))
            }
        }
        // implicit families flatten through their explicit rendition
        "uniform" => {
            let (topo_u, cset_u) = topology::uniform::to_unstructured(topo, cset, &cset_name)?;
            element_vertex_lists_unstructured(&topo_u, &cset_u)
        }
        "rectilinear" => {
            let (topo_u, cset_u) = topology::rectilinear::to_unstructured(topo, cset, &cset_name)?;
            element_vertex_lists_unstructured(&topo_u, &cset_u)
        }
        "structured" => {
            let (topo_u, cset_u) = topology::structured::to_unstructured(topo, cset, &cset_name)?;
            element_vertex_lists_unstructured(&topo_u, &cset_u)
        }
        other => Err(BlueprintError::NonConforming(format!(
            "unknown topology type `{other}`"
        ))),
    }
}

fn element_vertex_lists_unstructured(
    topo: &Node,
    _cset: &Node,
) -> Result<(Vec<usize>, Vec<u64>), BlueprintError> {
    let shape = topology::shape_of(topo)?;
    let conn = topo.fetch("elements/connectivity")?.to_vec::<u64>()?;
    let idx = O2MIndex::from_node(topo.fetch("elements")?, "connectivity", shape.indices())?;
    let mut sizes = Vec::with_capacity(idx.ones());
    let mut verts = Vec::with_capacity(conn.len());
    for (_, many) in idx.iter() {
        sizes.push(many.len());
        verts.extend(many.map(|mi| conn[mi]));
    }
    Ok((sizes, verts))
}

fn domain_vertex_count(dom: &Node, topo_name: &str) -> Result<usize, BlueprintError> {
    let topo = dom.fetch(&format!("topologies/{topo_name}"))?;
    let cset_name = topo.fetch("coordset")?.as_str()?.to_string();
    coordset::length(dom.fetch(&format!("coordsets/{cset_name}"))?)
}

fn domain_element_count(dom: &Node, topo_name: &str) -> Result<usize, BlueprintError> {
    let topo = dom.fetch(&format!("topologies/{topo_name}"))?;
    let cset_name = topo.fetch("coordset")?.as_str()?.to_string();
    let cset = dom.fetch(&format!("coordsets/{cset_name}"))?;
    topology::length(topo, cset)
}

/// Establish a process-global element and vertex numbering: count local
/// entities, max-reduce per-worker totals, derive each worker's base via
/// an exclusive prefix sum, and emit `{prefix}global_vertex_ids` /
/// `{prefix}global_element_ids` as int64 fields on every local domain
/// carrying the topology.
pub fn generate_global_element_and_vertex_ids(
    mesh: &mut Node,
    options: &PartitionFieldOptions,
    comm: &impl Communicator,
) -> Result<(), BlueprintError> {
    let global_num_doms = global_number_of_domains(mesh, comm)?;
    if global_num_doms == 0 {
        return Ok(());
    }
    let topo_name = match resolve_topology_name(mesh, options) {
        Some(name) => name,
        None => String::new(),
    };

    // per-domain local entity counts and offsets
    let mut local_num_verts: Vec<u64> = Vec::new();
    let mut local_num_eles: Vec<u64> = Vec::new();
    let mut local_total_verts = 0u64;
    let mut local_total_eles = 0u64;
    for dom in blueprint::domains(mesh) {
        if !domain_has_topology(dom, &topo_name) {
            local_num_verts.push(0);
            local_num_eles.push(0);
            continue;
        }
        let nv = domain_vertex_count(dom, &topo_name)? as u64;
        let ne = domain_element_count(dom, &topo_name)? as u64;
        local_num_verts.push(nv);
        local_num_eles.push(ne);
        local_total_verts += nv;
        local_total_eles += ne;
    }

    // per-worker totals -> exclusive prefix for this worker's base index
    let mut local = vec![0u64; comm.size()];
    let mut global = vec![0u64; comm.size()];
    local[comm.rank()] = local_total_verts;
    comm.max_all_reduce_u64(&local, &mut global)?;
    let global_verts_offset: u64 = global[..comm.rank()].iter().sum();

    for v in local.iter_mut() {
        *v = 0;
    }
    local[comm.rank()] = local_total_eles;
    comm.max_all_reduce_u64(&local, &mut global)?;
    let global_eles_offset: u64 = global[..comm.rank()].iter().sum();

    let prefix = options.field_prefix.clone();
    let mut vert_base = global_verts_offset;
    let mut ele_base = global_eles_offset;
    for (di, dom) in blueprint::domains_mut(mesh).into_iter().enumerate() {
        if !domain_has_topology(dom, &topo_name) {
            continue;
        }
        let verts_field = dom.fetch_mut(&format!("fields/{prefix}global_vertex_ids"));
        verts_field["association"].set_string("vertex");
        verts_field["topology"].set_string(&topo_name);
        let ids: Vec<i64> = (0..local_num_verts[di]).map(|i| (vert_base + i) as i64).collect();
        verts_field.fetch_mut("values").set_slice(&ids);

        let eles_field = dom.fetch_mut(&format!("fields/{prefix}global_element_ids"));
        eles_field["association"].set_string("element");
        eles_field["topology"].set_string(&topo_name);
        let ids: Vec<i64> = (0..local_num_eles[di]).map(|i| (ele_base + i) as i64).collect();
        eles_field.fetch_mut("values").set_slice(&ids);

        vert_base += local_num_verts[di];
        ele_base += local_num_eles[di];
    }
    Ok(())
}

/// Assign every element of the chosen topology to one of N partitions and
/// record the assignment as the `{prefix}parmetis_result` field.
///
/// Collective over `comm`: zero domains globally is a silent no-op; a
/// topology present on no rank at all is an error.
pub fn generate_partition_field<C, P>(
    mesh: &mut Node,
    options: &PartitionFieldOptions,
    comm: &C,
    partitioner: &mut P,
) -> Result<(), BlueprintError>
where
    C: Communicator,
    P: MeshPartitioner,
{
    generate_global_element_and_vertex_ids(mesh, options, comm)?;

    let global_num_doms = global_number_of_domains(mesh, comm)?;
    if global_num_doms == 0 {
        return Ok(());
    }

    let topo_name = resolve_topology_name(mesh, options).unwrap_or_default();
    let nparts = options.partitions.unwrap_or(global_num_doms as Idx);

    // the topology must exist somewhere across the workers
    let has_topo_local = blueprint::domains(mesh)
        .iter()
        .any(|d| domain_has_topology(d, &topo_name));
    let mut local = vec![0u64; comm.size()];
    let mut global = vec![0u64; comm.size()];
    local[comm.rank()] = has_topo_local as u64;
    comm.max_all_reduce_u64(&local, &mut global)?;
    if global.iter().all(|&v| v == 0) {
        return Err(BlueprintError::NonConforming(format!(
            "topology `{topo_name}` is present on no rank"
        )));
    }

    let ncommon_nodes = match options.ncommon_nodes {
        Some(n) => n,
        None => {
            // zones are adjacent when they share an edge in 2D, a plane
            // in 3D
            let mut dims = 0usize;
            for dom in blueprint::domains(mesh) {
                if let Ok(topo) = dom.fetch(&format!("topologies/{topo_name}")) {
                    let cset_name = topo.fetch("coordset")?.as_str()?.to_string();
                    dims = coordset::dims(dom.fetch(&format!("coordsets/{cset_name}"))?);
                    break;
                }
            }
            dims.max(1) as Idx
        }
    };

    // flatten local domains into the partitioner's arrays
    let mut per_domain: Vec<(Vec<usize>, Vec<u64>)> = Vec::new();
    let mut domain_vert_ids: Vec<Vec<i64>> = Vec::new();
    let mut local_total_eles = 0usize;
    for dom in blueprint::domains(mesh) {
        if !domain_has_topology(dom, &topo_name) {
            continue;
        }
        let lists = element_vertex_lists(dom, &topo_name)?;
        local_total_eles += lists.0.len();
        per_domain.push(lists);
        let g_ids = dom
            .fetch(&format!("fields/{}global_vertex_ids/values", options.field_prefix))?
            .to_vec::<i64>()?;
        domain_vert_ids.push(g_ids);
    }

    // eldist: prefix sum of per-worker element counts
    for v in local.iter_mut() {
        *v = 0;
    }
    local[comm.rank()] = local_total_eles as u64;
    comm.max_all_reduce_u64(&local, &mut global)?;
    let mut eldist = vec![0 as Idx; comm.size() + 1];
    for (i, &count) in global.iter().enumerate() {
        eldist[i + 1] = eldist[i] + count as Idx;
    }

    let mut eptr: Vec<Idx> = Vec::with_capacity(local_total_eles + 1);
    let mut eind: Vec<Idx> = Vec::new();
    let mut offset: Idx = 0;
    eptr.push(0);
    for ((sizes, verts), g_ids) in per_domain.iter().zip(&domain_vert_ids) {
        let mut cursor = 0usize;
        for &size in sizes {
            offset += size as Idx;
            eptr.push(offset);
            for &v in &verts[cursor..cursor + size] {
                eind.push(g_ids[v as usize] as Idx);
            }
            cursor += size;
        }
    }

    let part = partitioner.part_mesh_kway(MeshKwayInput {
        eldist: &eldist,
        eptr: &eptr,
        eind: &eind,
        ncommon_nodes,
        nparts,
    })?;
    if part.len() != local_total_eles {
        return Err(BlueprintError::Partitioner(format!(
            "partitioner returned {} entries for {local_total_eles} local elements",
            part.len()
        )));
    }

    // scatter the assignment back over the local domains
    let prefix = options.field_prefix.clone();
    let mut part_cursor = 0usize;
    for dom in blueprint::domains_mut(mesh) {
        if !domain_has_topology(dom, &topo_name) {
            continue;
        }
        let n = domain_element_count(dom, &topo_name)?;
        let slice: Vec<i64> = part[part_cursor..part_cursor + n]
            .iter()
            .map(|&p| p as i64)
            .collect();
        part_cursor += n;
        let field = dom.fetch_mut(&format!("fields/{prefix}parmetis_result"));
        field["association"].set_string("element");
        field["topology"].set_string(&topo_name);
        set_int_slice(field.fetch_mut("values"), DTypeId::Int64, &slice);
    }
    Ok(())
}
