//! Derived-topology generators.
//!
//! Every generator consumes an unstructured topology plus its coordset and
//! emits a new conforming topology, leaving the source untouched. Where a
//! generator introduces vertices (centroids, edge midpoints) it also emits
//! a new explicit coordset, and source<->derived relationships are returned
//! as one-to-many relation nodes.
//!
//! Side generation can additionally re-map fields from the source topology
//! onto the produced simplices; see [`generate_sides_with_fields`].

use std::collections::BTreeSet;

use crate::error::BlueprintError;
use crate::node::dtype::DTypeId;
use crate::node::Node;

use super::coordset;
use super::field;
use super::helpers::{find_widest_float_dtype, find_widest_int_dtype, set_float_slice, set_int_slice};
use super::metadata::{IdSpace, TopologyMetadata};
use super::o2m::O2MIndex;

// ---------------------------------------------------------------------------
// coordinate access
// ---------------------------------------------------------------------------

/// Per-axis coordinate arrays of a coordset, materializing the explicit
/// form when handed an implicit flavor.
fn explicit_axis_values(cset: &Node) -> Result<(Vec<String>, Vec<Vec<f64>>), BlueprintError> {
    let explicit = match cset.fetch("type")?.as_str()? {
        "explicit" => None,
        "rectilinear" => Some(coordset::rectilinear::to_explicit(cset)?),
        "uniform" => Some(coordset::uniform::to_explicit(cset)?),
        other => {
            return Err(BlueprintError::NonConforming(format!(
                "unknown coordset type `{other}`"
            )))
        }
    };
    let source = explicit.as_ref().unwrap_or(cset);
    let axes = coordset::axes(source);
    let mut values = Vec::with_capacity(axes.len());
    for axis in &axes {
        values.push(source.fetch("values")?.fetch(axis)?.to_vec::<f64>()?);
    }
    Ok((axes, values))
}

fn point_coord(coords: &[Vec<f64>], p: usize) -> [f64; 3] {
    let mut out = [0.0f64; 3];
    for (a, axis) in coords.iter().enumerate() {
        out[a] = axis[p];
    }
    out
}

fn centroid_of(coords: &[Vec<f64>], points: &[u64]) -> Vec<f64> {
    let ndims = coords.len();
    let mut acc = vec![0.0f64; ndims];
    for &p in points {
        for a in 0..ndims {
            acc[a] += coords[a][p as usize];
        }
    }
    for v in &mut acc {
        *v /= points.len() as f64;
    }
    acc
}

fn tri_area(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let (ux, uy, uz) = (b[0] - a[0], b[1] - a[1], b[2] - a[2]);
    let (vx, vy, vz) = (c[0] - a[0], c[1] - a[1], c[2] - a[2]);
    let cx = uy * vz - uz * vy;
    let cy = uz * vx - ux * vz;
    let cz = ux * vy - uy * vx;
    0.5 * (cx * cx + cy * cy + cz * cz).sqrt()
}

fn tet_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let w = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
    let det = u[0] * (v[1] * w[2] - v[2] * w[1]) - u[1] * (v[0] * w[2] - v[2] * w[0])
        + u[2] * (v[0] * w[1] - v[1] * w[0]);
    det.abs() / 6.0
}

fn identity_map(count: usize, int_id: DTypeId) -> Node {
    let mut dest = Node::new();
    let values: Vec<i64> = (0..count as i64).collect();
    set_int_slice(dest.fetch_mut("values"), int_id, &values);
    set_int_slice(dest.fetch_mut("sizes"), int_id, &vec![1i64; count]);
    set_int_slice(dest.fetch_mut("offsets"), int_id, &values);
    dest
}

fn o2m_from_parents(parents: &[usize], num_parents: usize, int_id: DTypeId) -> (Node, Node) {
    // d2s: per derived element its parent; s2d: per parent its elements
    let mut d2s = Node::new();
    let values: Vec<i64> = parents.iter().map(|&p| p as i64).collect();
    set_int_slice(d2s.fetch_mut("values"), int_id, &values);
    set_int_slice(d2s.fetch_mut("sizes"), int_id, &vec![1i64; parents.len()]);
    let offsets: Vec<i64> = (0..parents.len() as i64).collect();
    set_int_slice(d2s.fetch_mut("offsets"), int_id, &offsets);

    let mut groups: Vec<Vec<i64>> = vec![Vec::new(); num_parents];
    for (d, &p) in parents.iter().enumerate() {
        groups[p].push(d as i64);
    }
    let mut s2d = Node::new();
    let flat: Vec<i64> = groups.iter().flatten().copied().collect();
    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
    let idx = O2MIndex::from_sizes(sizes);
    set_int_slice(s2d.fetch_mut("values"), int_id, &flat);
    let sizes_i: Vec<i64> = idx.sizes().iter().map(|&v| v as i64).collect();
    let offsets_i: Vec<i64> = idx.offsets().iter().map(|&v| v as i64).collect();
    set_int_slice(s2d.fetch_mut("sizes"), int_id, &sizes_i);
    set_int_slice(s2d.fetch_mut("offsets"), int_id, &offsets_i);
    (s2d, d2s)
}

fn emit_explicit_coordset(axes: &[String], coords: &[Vec<f64>], float_id: DTypeId) -> Node {
    let mut cdest = Node::new();
    cdest["type"].set_string("explicit");
    for (a, axis) in axes.iter().enumerate() {
        set_float_slice(cdest.fetch_mut("values").fetch_mut(axis), float_id, &coords[a]);
    }
    cdest
}

// ---------------------------------------------------------------------------
// pass-through generators
// ---------------------------------------------------------------------------

fn generate_dim_topo(
    topo: &Node,
    cset: &Node,
    dst_dim: usize,
) -> Result<(Node, Node, Node), BlueprintError> {
    let md = TopologyMetadata::new(topo, cset)?;
    let dest = md.dim_topo(dst_dim)?;
    let s2d = md.dim_map(IdSpace::Global, md.dim(), dst_dim);
    let d2s = md.dim_map(IdSpace::Global, dst_dim, md.dim());
    Ok((dest, s2d, d2s))
}

/// The deduplicated point entities of a topology.
pub fn generate_points(topo: &Node, cset: &Node) -> Result<(Node, Node, Node), BlueprintError> {
    generate_dim_topo(topo, cset, 0)
}

/// The deduplicated line entities of a topology.
pub fn generate_lines(topo: &Node, cset: &Node) -> Result<(Node, Node, Node), BlueprintError> {
    generate_dim_topo(topo, cset, 1)
}

/// The deduplicated face entities of a 3D topology.
pub fn generate_faces(topo: &Node, cset: &Node) -> Result<(Node, Node, Node), BlueprintError> {
    generate_dim_topo(topo, cset, 2)
}

// ---------------------------------------------------------------------------
// centroids
// ---------------------------------------------------------------------------

/// One point per cell at the average of its unique vertex coordinates.
/// Returns `(topo, coordset, s2d, d2s)`; both maps are identity 1:1.
pub fn generate_centroids(
    topo: &Node,
    cset: &Node,
    dest_coordset_name: &str,
) -> Result<(Node, Node, Node, Node), BlueprintError> {
    let md = TopologyMetadata::new(topo, cset)?;
    let (axes, coords) = explicit_axis_values(cset)?;
    let int_id = find_widest_int_dtype(&[topo, cset]);
    let float_id = find_widest_float_dtype(&[topo, cset]);

    let n = md.num_cells();
    let mut centroid_axes: Vec<Vec<f64>> = vec![Vec::with_capacity(n); axes.len()];
    for c in 0..n {
        let centroid = centroid_of(&coords, md.cell_point_ids(c));
        for (a, v) in centroid.into_iter().enumerate() {
            centroid_axes[a].push(v);
        }
    }

    let cdest = emit_explicit_coordset(&axes, &centroid_axes, float_id);

    let mut dest = Node::new();
    dest["type"].set_string("unstructured");
    dest["coordset"].set_string(dest_coordset_name);
    dest["elements/shape"].set_string("point");
    let conn: Vec<i64> = (0..n as i64).collect();
    set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &conn);

    let s2d = identity_map(n, int_id);
    let d2s = identity_map(n, int_id);
    Ok((dest, cdest, s2d, d2s))
}

// ---------------------------------------------------------------------------
// sides
// ---------------------------------------------------------------------------

/// Intermediate representation shared by [`generate_sides`] and the
/// field-mapping entry point.
struct SidesBuild {
    axes: Vec<String>,
    /// Derived per-axis coordinates: originals, then (3D) face centers,
    /// then cell centers.
    coords: Vec<Vec<f64>>,
    num_orig_vertices: usize,
    verts_per_side: usize,
    conn: Vec<u64>,
    /// Parent cell of each side.
    parent: Vec<usize>,
    num_cells: usize,
    dim: usize,
}

fn build_sides(topo: &Node, cset: &Node) -> Result<SidesBuild, BlueprintError> {
    let md = TopologyMetadata::new(topo, cset)?;
    let dim = md.dim();
    if dim < 2 {
        return Err(BlueprintError::NonConforming(
            "sides need a 2D or 3D topology".into(),
        ));
    }
    let (axes, mut coords) = explicit_axis_values(cset)?;
    let num_orig = coords[0].len();
    let num_cells = md.num_cells();
    let num_faces = if dim == 3 { md.num_entities(2) } else { 0 };

    // appended vertices: (3D) one per global face, then one per cell
    for f in 0..num_faces {
        let centroid = centroid_of(&coords, md.face_points(f));
        for (a, v) in centroid.into_iter().enumerate() {
            coords[a].push(v);
        }
    }
    for c in 0..num_cells {
        let centroid = centroid_of(&coords, md.cell_point_ids(c));
        for (a, v) in centroid.into_iter().enumerate() {
            coords[a].push(v);
        }
    }
    let face_center = |f: usize| (num_orig + f) as u64;
    let cell_center = |c: usize| (num_orig + num_faces + c) as u64;

    let verts_per_side = dim + 1;
    let mut conn: Vec<u64> = Vec::new();
    let mut parent: Vec<usize> = Vec::new();

    for c in 0..num_cells {
        for face in md.cell_oriented_faces(c) {
            if dim == 2 {
                // one triangle per cell boundary line, wound with the cell
                for i in 0..face.len() {
                    let (a, b) = (face[i], face[(i + 1) % face.len()]);
                    conn.extend_from_slice(&[a, b, cell_center(c)]);
                    parent.push(c);
                }
            } else {
                let fid = md.face_id(face).ok_or_else(|| {
                    BlueprintError::NonConforming("face missing from cascade".into())
                })?;
                // one tet per face line, via the face center to the cell
                // center, preserving the cell's winding of the face
                for i in 0..face.len() {
                    let (a, b) = (face[i], face[(i + 1) % face.len()]);
                    conn.extend_from_slice(&[a, b, face_center(fid), cell_center(c)]);
                    parent.push(c);
                }
            }
        }
    }

    Ok(SidesBuild {
        axes,
        coords,
        num_orig_vertices: num_orig,
        verts_per_side,
        conn,
        parent,
        num_cells,
        dim,
    })
}

impl SidesBuild {
    fn side_volume(&self, s: usize) -> f64 {
        let vs = &self.conn[s * self.verts_per_side..(s + 1) * self.verts_per_side];
        let p = |i: usize| point_coord(&self.coords, vs[i] as usize);
        if self.dim == 2 {
            tri_area(p(0), p(1), p(2))
        } else {
            tet_volume(p(0), p(1), p(2), p(3))
        }
    }

    fn emit(&self, dest_coordset_name: &str, int_id: DTypeId, float_id: DTypeId) -> (Node, Node) {
        let cdest = emit_explicit_coordset(&self.axes, &self.coords, float_id);
        let mut dest = Node::new();
        dest["type"].set_string("unstructured");
        dest["coordset"].set_string(dest_coordset_name);
        dest["elements/shape"].set_string(if self.dim == 2 { "tri" } else { "tet" });
        let conn: Vec<i64> = self.conn.iter().map(|&v| v as i64).collect();
        set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &conn);
        (dest, cdest)
    }
}

/// Partition every cell into simplices: triangles fanned about the cell
/// center in 2D, tetrahedra through face and cell centers in 3D. Returns
/// `(topo, coordset, s2d, d2s)`.
pub fn generate_sides(
    topo: &Node,
    cset: &Node,
    dest_coordset_name: &str,
) -> Result<(Node, Node, Node, Node), BlueprintError> {
    let build = build_sides(topo, cset)?;
    let int_id = find_widest_int_dtype(&[topo, cset]);
    let float_id = find_widest_float_dtype(&[topo, cset]);
    let (dest, cdest) = build.emit(dest_coordset_name, int_id, float_id);
    let (s2d, d2s) = o2m_from_parents(&build.parent, build.num_cells, int_id);
    Ok((dest, cdest, s2d, d2s))
}

/// Options for [`generate_sides_with_fields`].
#[derive(Clone, Debug, Default)]
pub struct SideFieldOptions {
    /// Prefix for the mapped field names.
    pub field_prefix: String,
    /// Fields to map; empty means every field on the source topology.
    pub field_names: Vec<String>,
}

/// Generate sides for `topo_name` inside a single-domain mesh, mapping the
/// selected fields onto the new topology.
///
/// The destination topology/coordset land in the domain under the given
/// names, mapped fields under their prefixed names, plus the auxiliary
/// `original_element_ids` / `original_vertex_ids` fields (and `volume`
/// when any volume-dependent field was mapped).
pub fn generate_sides_with_fields(
    domain: &mut Node,
    topo_name: &str,
    dest_topo_name: &str,
    dest_coordset_name: &str,
    options: &SideFieldOptions,
) -> Result<(), BlueprintError> {
    let topo = domain.fetch(&format!("topologies/{topo_name}"))?;
    let cset_name = topo.fetch("coordset")?.as_str()?.to_string();
    let cset = domain.fetch(&format!("coordsets/{cset_name}"))?;

    let build = build_sides(topo, cset)?;
    let int_id = find_widest_int_dtype(&[topo, cset]);
    let float_id = find_widest_float_dtype(&[topo, cset]);
    let (dest, cdest) = build.emit(dest_coordset_name, int_id, float_id);

    // which fields to map
    let mut selected: Vec<String> = Vec::new();
    if let Some(fields) = domain.try_fetch("fields") {
        for (name, f) in fields.entries() {
            let name = name.unwrap_or("").to_string();
            let on_topo = f
                .try_fetch("topology")
                .and_then(|t| t.as_str().ok())
                .map(|t| t == topo_name)
                .unwrap_or(false);
            let requested =
                options.field_names.is_empty() || options.field_names.contains(&name);
            if on_topo && requested {
                selected.push(name);
            }
        }
    }

    let num_sides = build.parent.len();
    let mut any_volume_dependent = false;
    let mut mapped: Vec<(String, Node)> = Vec::new();

    // parent volumes, computed lazily on first volume-dependent field
    let mut side_volumes: Option<Vec<f64>> = None;
    let mut parent_volumes: Option<Vec<f64>> = None;

    for name in &selected {
        let f = domain.fetch(&format!("fields/{name}"))?;
        let assoc = f.fetch("association")?.as_str()?.to_string();
        let volume_dependent = field::is_volume_dependent(f);
        let values = f.fetch("values")?;
        if values.is_object() {
            return Err(BlueprintError::NonConforming(format!(
                "field `{name}`: only scalar fields map onto sides"
            )));
        }
        let src = values.to_vec::<f64>()?;

        let mut out_field = Node::new();
        out_field["association"].set_string(&assoc);
        out_field["topology"].set_string(dest_topo_name);

        match (assoc.as_str(), volume_dependent) {
            ("element", false) => {
                let out: Vec<f64> = build.parent.iter().map(|&p| src[p]).collect();
                out_field.fetch_mut("values").set_slice(&out);
            }
            ("element", true) => {
                let sv = side_volumes
                    .get_or_insert_with(|| (0..num_sides).map(|s| build.side_volume(s)).collect());
                let pv = parent_volumes.get_or_insert_with(|| {
                    let mut acc = vec![0.0f64; build.num_cells];
                    for (s, &p) in build.parent.iter().enumerate() {
                        acc[p] += sv[s];
                    }
                    acc
                });
                let out: Vec<f64> = build
                    .parent
                    .iter()
                    .enumerate()
                    .map(|(s, &p)| src[p] * sv[s] / pv[p])
                    .collect();
                out_field.fetch_mut("values").set_slice(&out);
                any_volume_dependent = true;
            }
            ("vertex", false) => {
                let out = map_vertex_field_onto_sides(&build, &src);
                out_field.fetch_mut("values").set_slice(&out);
            }
            ("vertex", true) => {
                return Err(BlueprintError::NonConforming(format!(
                    "field `{name}`: vertex-associated fields cannot be volume-dependent"
                )));
            }
            (other, _) => {
                return Err(BlueprintError::NonConforming(format!(
                    "field `{name}`: unsupported association `{other}`"
                )));
            }
        }
        mapped.push((format!("{}{name}", options.field_prefix), out_field));
    }

    // auxiliary provenance fields
    let mut elem_ids = Node::new();
    elem_ids["association"].set_string("element");
    elem_ids["topology"].set_string(dest_topo_name);
    let parents: Vec<i64> = build.parent.iter().map(|&p| p as i64).collect();
    set_int_slice(elem_ids.fetch_mut("values"), int_id, &parents);
    mapped.push((
        format!("{}original_element_ids", options.field_prefix),
        elem_ids,
    ));

    let mut vert_ids = Node::new();
    vert_ids["association"].set_string("vertex");
    vert_ids["topology"].set_string(dest_topo_name);
    let num_derived_vertices = build.coords[0].len();
    let ids: Vec<i64> = (0..num_derived_vertices)
        .map(|v| if v < build.num_orig_vertices { v as i64 } else { -1 })
        .collect();
    set_int_slice(vert_ids.fetch_mut("values"), int_id, &ids);
    mapped.push((
        format!("{}original_vertex_ids", options.field_prefix),
        vert_ids,
    ));

    if any_volume_dependent {
        let sv = side_volumes
            .take()
            .unwrap_or_else(|| (0..num_sides).map(|s| build.side_volume(s)).collect());
        let mut vol = Node::new();
        vol["association"].set_string("element");
        vol["topology"].set_string(dest_topo_name);
        vol.fetch_mut("values").set_slice(&sv);
        mapped.push((format!("{}volume", options.field_prefix), vol));
    }

    *domain.fetch_mut(&format!("topologies/{dest_topo_name}")) = dest;
    *domain.fetch_mut(&format!("coordsets/{dest_coordset_name}")) = cdest;
    for (name, f) in mapped {
        *domain.fetch_mut(&format!("fields/{name}")) = f;
    }
    Ok(())
}

/// Vertex field transfer: carried-over vertices copy; each new vertex gets
/// the mean of the original vertices adjacent to it in the derived
/// connectivity (0 when none).
fn map_vertex_field_onto_sides(build: &SidesBuild, src: &[f64]) -> Vec<f64> {
    let num_derived = build.coords[0].len();
    let num_orig = build.num_orig_vertices;
    let mut neighbors: Vec<BTreeSet<u64>> = vec![BTreeSet::new(); num_derived - num_orig];

    for side in build.conn.chunks_exact(build.verts_per_side) {
        for &v in side {
            if (v as usize) >= num_orig {
                let set = &mut neighbors[v as usize - num_orig];
                for &w in side {
                    if (w as usize) < num_orig {
                        set.insert(w);
                    }
                }
            }
        }
    }

    let mut out = Vec::with_capacity(num_derived);
    out.extend(src.iter().take(num_orig).copied());
    for set in &neighbors {
        if set.is_empty() {
            out.push(0.0);
        } else {
            let sum: f64 = set.iter().map(|&w| src[w as usize]).sum();
            out.push(sum / set.len() as f64);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// corners (median dual)
// ---------------------------------------------------------------------------

/// One polygonal (2D) or polyhedral (3D) cell per (source-cell,
/// source-vertex) pair, with faces through edge midpoints, face centers
/// and cell centers. Returns `(topo, coordset, s2d, d2s)`.
pub fn generate_corners(
    topo: &Node,
    cset: &Node,
    dest_coordset_name: &str,
) -> Result<(Node, Node, Node, Node), BlueprintError> {
    let md = TopologyMetadata::new(topo, cset)?;
    let dim = md.dim();
    if dim < 2 {
        return Err(BlueprintError::NonConforming(
            "corners need a 2D or 3D topology".into(),
        ));
    }
    let (axes, mut coords) = explicit_axis_values(cset)?;
    let int_id = find_widest_int_dtype(&[topo, cset]);
    let float_id = find_widest_float_dtype(&[topo, cset]);

    let num_orig = coords[0].len();
    let num_edges = md.num_entities(1);
    let num_faces = if dim == 3 { md.num_entities(2) } else { 0 };
    let num_cells = md.num_cells();

    for e in 0..num_edges {
        let centroid = centroid_of(&coords, md.edge_points(e));
        for (a, v) in centroid.into_iter().enumerate() {
            coords[a].push(v);
        }
    }
    for f in 0..num_faces {
        let centroid = centroid_of(&coords, md.face_points(f));
        for (a, v) in centroid.into_iter().enumerate() {
            coords[a].push(v);
        }
    }
    for c in 0..num_cells {
        let centroid = centroid_of(&coords, md.cell_point_ids(c));
        for (a, v) in centroid.into_iter().enumerate() {
            coords[a].push(v);
        }
    }
    let mid = |e: usize| (num_orig + e) as u64;
    let face_center = |f: usize| (num_orig + num_edges + f) as u64;
    let cell_center = |c: usize| (num_orig + num_edges + num_faces + c) as u64;

    let mut parent: Vec<usize> = Vec::new();
    let cdest = emit_explicit_coordset(&axes, &coords, float_id);

    let mut dest = Node::new();
    dest["type"].set_string("unstructured");
    dest["coordset"].set_string(dest_coordset_name);

    if dim == 2 {
        // one quad per (cell, vertex): vertex, leaving-edge midpoint,
        // cell center, entering-edge midpoint
        let mut conn: Vec<i64> = Vec::new();
        let mut sizes: Vec<i64> = Vec::new();
        for c in 0..num_cells {
            let poly = &md.cell_oriented_faces(c)[0];
            let n = poly.len();
            for (i, &v) in poly.iter().enumerate() {
                let e_next = md
                    .edge_id(v, poly[(i + 1) % n])
                    .ok_or_else(|| BlueprintError::NonConforming("edge missing".into()))?;
                let e_prev = md
                    .edge_id(poly[(i + n - 1) % n], v)
                    .ok_or_else(|| BlueprintError::NonConforming("edge missing".into()))?;
                conn.extend_from_slice(&[
                    v as i64,
                    mid(e_next) as i64,
                    cell_center(c) as i64,
                    mid(e_prev) as i64,
                ]);
                sizes.push(4);
                parent.push(c);
            }
        }
        dest["elements/shape"].set_string("polygonal");
        set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &conn);
        set_int_slice(dest.fetch_mut("elements/sizes"), int_id, &sizes);
        super::topology::unstructured::generate_offsets(&mut dest)?;
    } else {
        // polyhedral corners: quad faces deduplicated by vertex set
        let mut face_dedup: hashbrown::HashMap<Vec<u64>, usize> = hashbrown::HashMap::new();
        let mut sub_conn: Vec<i64> = Vec::new();
        let mut corner_faces: Vec<i64> = Vec::new();
        let mut corner_sizes: Vec<i64> = Vec::new();

        let mut intern_quad = |quad: [u64; 4], sub_conn: &mut Vec<i64>| -> i64 {
            let mut key = quad.to_vec();
            key.sort_unstable();
            let next = sub_conn.len() / 4;
            *face_dedup.entry(key).or_insert_with(|| {
                sub_conn.extend(quad.iter().map(|&v| v as i64));
                next
            }) as i64
        };

        for c in 0..num_cells {
            // local incidence, in the cell's own discovery order
            let faces = md.cell_oriented_faces(c).to_vec();
            let mut cell_edges: Vec<usize> = Vec::new();
            let mut edge_faces: hashbrown::HashMap<usize, Vec<usize>> = hashbrown::HashMap::new();
            for face in &faces {
                let fid = md
                    .face_id(face)
                    .ok_or_else(|| BlueprintError::NonConforming("face missing from cascade".into()))?;
                for i in 0..face.len() {
                    let eid = md
                        .edge_id(face[i], face[(i + 1) % face.len()])
                        .ok_or_else(|| BlueprintError::NonConforming("edge missing from cascade".into()))?;
                    if !cell_edges.contains(&eid) {
                        cell_edges.push(eid);
                    }
                    edge_faces.entry(eid).or_default().push(fid);
                }
            }

            for &v in md.cell_point_ids(c) {
                let mut quads: Vec<i64> = Vec::new();

                for face in &faces {
                    let n = face.len();
                    let Some(i) = face.iter().position(|&fv| fv == v) else {
                        continue;
                    };
                    let fid = md
                        .face_id(face)
                        .ok_or_else(|| BlueprintError::NonConforming("face missing from cascade".into()))?;
                    let e_next = md
                        .edge_id(v, face[(i + 1) % n])
                        .ok_or_else(|| BlueprintError::NonConforming("edge missing from cascade".into()))?;
                    let e_prev = md
                        .edge_id(face[(i + n - 1) % n], v)
                        .ok_or_else(|| BlueprintError::NonConforming("edge missing from cascade".into()))?;
                    quads.push(intern_quad(
                        [v, mid(e_next), face_center(fid), mid(e_prev)],
                        &mut sub_conn,
                    ));
                }

                for &eid in &cell_edges {
                    let ends = md.edge_points(eid);
                    if !ends.contains(&v) {
                        continue;
                    }
                    let fids = &edge_faces[&eid];
                    if fids.len() != 2 {
                        continue;
                    }
                    let quad = [mid(eid), face_center(fids[0]), cell_center(c), face_center(fids[1])];
                    let id = intern_quad(quad, &mut sub_conn);
                    if !quads.contains(&id) {
                        quads.push(id);
                    }
                }

                corner_sizes.push(quads.len() as i64);
                corner_faces.extend(quads);
                parent.push(c);
            }
        }

        dest["elements/shape"].set_string("polyhedral");
        set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &corner_faces);
        set_int_slice(dest.fetch_mut("elements/sizes"), int_id, &corner_sizes);
        dest["subelements/shape"].set_string("polygonal");
        set_int_slice(dest.fetch_mut("subelements/connectivity"), int_id, &sub_conn);
        let sub_sizes = vec![4i64; sub_conn.len() / 4];
        set_int_slice(dest.fetch_mut("subelements/sizes"), int_id, &sub_sizes);
        super::topology::unstructured::generate_offsets(&mut dest)?;
    }

    let (s2d, d2s) = o2m_from_parents(&parent, num_cells, int_id);
    Ok((dest, cdest, s2d, d2s))
}
