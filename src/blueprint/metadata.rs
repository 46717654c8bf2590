//! TopologyMetadata: the dimensional entity cascade of an unstructured
//! topology.
//!
//! From a topology and its coordset this derives, for every dimension
//! `k <= D`, the deduplicated global entity set (`dim_topo(k)`), forward and
//! reverse association maps between any two dimensions, and the
//! local-to-global id maps. Two k-entities are identified when their
//! unordered vertex-id sets match; orientation (the first-encountered
//! winding) is retained in the entity tables and the local maps.
//!
//! Entities are kept in arenas of dense integer ids keyed by sorted
//! vertex-id tuples; global numbering is stable discovery order.

use hashbrown::HashMap;

use crate::error::BlueprintError;
use crate::node::Node;

use super::coordset;
use super::helpers::{find_widest_int_dtype, set_int_slice};
use super::o2m::O2MIndex;
use super::shape::Shape;
use super::topology::shape_of;

/// Which id space an association map uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdSpace {
    /// Per-parent-element numbering with duplicates across parents.
    Local,
    /// Deduplicated global numbering.
    Global,
}

pub struct TopologyMetadata {
    dim: usize,
    coordset_name: String,
    num_points: usize,
    topo_shape: Shape,
    int_id: crate::node::dtype::DTypeId,

    /// Unique vertex ids per cell: the winding for 2D cells, the union
    /// over faces in discovery order for 3D.
    cell_points: Vec<Vec<u64>>,
    /// Per-cell connectivity exactly as the input lists it (empty for
    /// polyhedral inputs, whose cells live behind the face indirection).
    cells_conn: Vec<Vec<u64>>,
    /// Oriented vertex list per global face (3D only; empty in 2D).
    faces: Vec<Vec<u64>>,
    /// Oriented vertex pair per global edge.
    edges: Vec<Vec<u64>>,

    cell_to_face: Vec<Vec<usize>>,
    cell_to_edge: Vec<Vec<usize>>,
    face_to_edge: Vec<Vec<usize>>,

    /// Per cell, its boundary polygons in the cell's own winding (the 2D
    /// cell itself, or the 3D faces as the cell lists them).
    cell_oriented_faces: Vec<Vec<Vec<u64>>>,

    face_ids: HashMap<Vec<u64>, usize>,
    edge_ids: HashMap<Vec<u64>, usize>,

    /// `le2ge[d][local] = global` for each dimension.
    le2ge: [Vec<usize>; 4],
}

struct Dedup {
    ids: HashMap<Vec<u64>, usize>,
}

impl Dedup {
    fn new() -> Self {
        Dedup { ids: HashMap::new() }
    }

    /// Global id of the entity with (oriented) vertex list `verts`,
    /// inserting it into `arena` on first encounter.
    fn intern(&mut self, verts: &[u64], arena: &mut Vec<Vec<u64>>) -> usize {
        let mut key = verts.to_vec();
        key.sort_unstable();
        let next = arena.len();
        *self.ids.entry(key).or_insert_with(|| {
            arena.push(verts.to_vec());
            next
        })
    }
}

/// Consecutive wrap-around vertex pairs of a polygon.
fn polygon_edges(poly: &[u64]) -> impl Iterator<Item = [u64; 2]> + '_ {
    (0..poly.len()).map(move |i| [poly[i], poly[(i + 1) % poly.len()]])
}

impl TopologyMetadata {
    pub fn new(topo: &Node, cset: &Node) -> Result<Self, BlueprintError> {
        let topo_shape = shape_of(topo)?;
        let dim = topo_shape.dim();
        let num_points = coordset::length(cset)?;
        let coordset_name = topo.fetch("coordset")?.as_str()?.to_string();
        let int_id = find_widest_int_dtype(&[topo]);

        // per-cell vertex lists and (3D) oriented face lists
        let conn = topo.fetch("elements/connectivity")?.to_vec::<u64>()?;
        let mut cell_raw_faces: Vec<Vec<Vec<u64>>> = Vec::new();

        match topo_shape {
            Shape::Polyhedral => {
                let sub_conn = topo.fetch("subelements/connectivity")?.to_vec::<u64>()?;
                let sub_idx = O2MIndex::from_node(topo.fetch("subelements")?, "connectivity", 0)?;
                let elem_idx = O2MIndex::from_node(topo.fetch("elements")?, "connectivity", 0)?;
                for (_cell, many) in elem_idx.iter() {
                    let faces = many
                        .map(|mi| {
                            let fid = conn[mi] as usize;
                            sub_idx.many(fid).map(|si| sub_conn[si]).collect::<Vec<u64>>()
                        })
                        .collect();
                    cell_raw_faces.push(faces);
                }
            }
            Shape::Polygonal => {
                let elem_idx = O2MIndex::from_node(topo.fetch("elements")?, "connectivity", 0)?;
                for (_, many) in elem_idx.iter() {
                    let poly: Vec<u64> = many.map(|mi| conn[mi]).collect();
                    cell_raw_faces.push(vec![poly]);
                }
            }
            s if s.dim() == 3 => {
                let table = s.embedding();
                let embed = s.embed_shape().ok_or_else(|| {
                    BlueprintError::NonConforming(format!("`{}` has no face table", s.name()))
                })?;
                let arity = embed.indices();
                for chunk in conn.chunks_exact(s.indices()) {
                    let faces = (0..s.embed_count())
                        .map(|f| {
                            (0..arity).map(|i| chunk[table[f * arity + i]]).collect::<Vec<u64>>()
                        })
                        .collect();
                    cell_raw_faces.push(faces);
                }
            }
            s if s.dim() == 2 => {
                for chunk in conn.chunks_exact(s.indices()) {
                    cell_raw_faces.push(vec![chunk.to_vec()]);
                }
            }
            Shape::Line => {
                for chunk in conn.chunks_exact(2) {
                    cell_raw_faces.push(vec![chunk.to_vec()]);
                }
            }
            s => {
                return Err(BlueprintError::NonConforming(format!(
                    "cannot derive a cascade for `{}` elements",
                    s.name()
                )))
            }
        }

        let mut md = TopologyMetadata {
            dim,
            coordset_name,
            num_points,
            topo_shape,
            int_id,
            cell_points: Vec::new(),
            cells_conn: Vec::new(),
            faces: Vec::new(),
            edges: Vec::new(),
            cell_to_face: Vec::new(),
            cell_to_edge: Vec::new(),
            face_to_edge: Vec::new(),
            cell_oriented_faces: Vec::new(),
            face_ids: HashMap::new(),
            edge_ids: HashMap::new(),
            le2ge: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
        };

        md.cells_conn = match topo_shape {
            Shape::Polyhedral => vec![Vec::new(); cell_raw_faces.len()],
            s if s.dim() == 3 => conn.chunks_exact(s.indices()).map(<[u64]>::to_vec).collect(),
            _ => cell_raw_faces.iter().map(|fs| fs[0].clone()).collect(),
        };

        let mut face_dedup = Dedup::new();
        let mut edge_dedup = Dedup::new();
        let mut face_edges_done: Vec<bool> = Vec::new();

        for raw_faces in &cell_raw_faces {
            let cell_id = md.cell_points.len();
            md.le2ge[dim].push(cell_id);

            let mut points: Vec<u64> = Vec::new();
            let mut cell_faces: Vec<usize> = Vec::new();
            let mut cell_edges: Vec<usize> = Vec::new();

            for face in raw_faces {
                // dim-(D-1) interning; in 2D the "face" is the cell itself
                let fid = if dim == 3 {
                    let fid = face_dedup.intern(face, &mut md.faces);
                    if fid == md.face_to_edge.len() {
                        md.face_to_edge.push(Vec::new());
                        face_edges_done.push(false);
                    }
                    cell_faces.push(fid);
                    md.le2ge[2].push(fid);
                    Some(fid)
                } else {
                    None
                };

                for pair in polygon_edges(face) {
                    if dim == 1 {
                        // line cells have no edge cascade below themselves
                        break;
                    }
                    let eid = edge_dedup.intern(&pair, &mut md.edges);
                    if !cell_edges.contains(&eid) {
                        cell_edges.push(eid);
                        md.le2ge[1].push(eid);
                    }
                    if let Some(fid) = fid {
                        if !face_edges_done[fid] {
                            md.face_to_edge[fid].push(eid);
                        }
                    }
                }
                if let Some(fid) = fid {
                    face_edges_done[fid] = true;
                }

                for &v in face {
                    if !points.contains(&v) {
                        points.push(v);
                        md.le2ge[0].push(v as usize);
                    }
                }
            }

            if dim == 3 {
                md.cell_to_face.push(cell_faces);
            }
            md.cell_to_edge.push(cell_edges);
            md.cell_points.push(points);
        }

        md.cell_oriented_faces = cell_raw_faces;
        md.face_ids = face_dedup.ids;
        md.edge_ids = edge_dedup.ids;
        Ok(md)
    }

    /// A cell's boundary polygons in the cell's own winding.
    pub fn cell_oriented_faces(&self, c: usize) -> &[Vec<u64>] {
        &self.cell_oriented_faces[c]
    }

    /// Global id of the face with vertex set `verts` (any order).
    pub fn face_id(&self, verts: &[u64]) -> Option<usize> {
        let mut key = verts.to_vec();
        key.sort_unstable();
        self.face_ids.get(&key).copied()
    }

    /// Global id of the edge `{a, b}`.
    pub fn edge_id(&self, a: u64, b: u64) -> Option<usize> {
        let mut key = vec![a, b];
        key.sort_unstable();
        self.edge_ids.get(&key).copied()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_cells(&self) -> usize {
        self.cell_points.len()
    }

    pub fn num_entities(&self, d: usize) -> usize {
        match d {
            d if d == self.dim && d > 0 => self.cell_points.len(),
            0 => self.num_points,
            1 => self.edges.len(),
            2 if self.dim == 3 => self.faces.len(),
            _ => 0,
        }
    }

    /// Oriented vertex lists of the global dimension-`d` entities. For the
    /// top dimension this is the input connectivity (cells are already
    /// unique); for polyhedral inputs it is the per-cell vertex unions.
    pub fn entity_points(&self, d: usize) -> Vec<Vec<u64>> {
        match d {
            d if d == self.dim && d > 0 => {
                if self.topo_shape == Shape::Polyhedral {
                    self.cell_points.clone()
                } else {
                    self.cells_conn.clone()
                }
            }
            0 => (0..self.num_points as u64).map(|v| vec![v]).collect(),
            1 => self.edges.clone(),
            2 if self.dim == 3 => self.faces.clone(),
            _ => Vec::new(),
        }
    }

    /// Unique vertex ids of cell `c`, in discovery order.
    pub fn cell_point_ids(&self, c: usize) -> &[u64] {
        &self.cell_points[c]
    }

    /// Global face ids of cell `c` (3D).
    pub fn cell_face_ids(&self, c: usize) -> &[usize] {
        &self.cell_to_face[c]
    }

    /// Oriented vertex list of global face `f` (3D).
    pub fn face_points(&self, f: usize) -> &[u64] {
        &self.faces[f]
    }

    /// Oriented vertex pair of global edge `e`.
    pub fn edge_points(&self, e: usize) -> &[u64] {
        &self.edges[e]
    }

    /// Local-to-global id map for dimension `d`.
    pub fn le2ge(&self, d: usize) -> &[usize] {
        &self.le2ge[d]
    }

    /// Forward association: per dimension-`s` entity, the ordered global
    /// ids of its constituent dimension-`t` entities (`t <= s`).
    fn forward(&self, s: usize, t: usize) -> Vec<Vec<usize>> {
        debug_assert!(t <= s);
        if s == t {
            return (0..self.num_entities(s)).map(|i| vec![i]).collect();
        }
        match (s == self.dim, s, t) {
            (true, _, 0) => self
                .cell_points
                .iter()
                .map(|ps| ps.iter().map(|&v| v as usize).collect())
                .collect(),
            (true, _, 1) => self.cell_to_edge.clone(),
            (true, 3, 2) => self.cell_to_face.clone(),
            (false, 2, 1) => self.face_to_edge.clone(),
            (false, 2, 0) => self
                .faces
                .iter()
                .map(|f| f.iter().map(|&v| v as usize).collect())
                .collect(),
            (false, 1, 0) => self
                .edges
                .iter()
                .map(|e| e.iter().map(|&v| v as usize).collect())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Global association map between any two dimensions: forward when
    /// `t <= s`, the inverted relation otherwise. Ids are global.
    pub fn association(&self, s: usize, t: usize) -> Vec<Vec<usize>> {
        if t <= s {
            self.forward(s, t)
        } else {
            let fwd = self.forward(t, s);
            let mut rev: Vec<Vec<usize>> = vec![Vec::new(); self.num_entities(s)];
            for (src, targets) in fwd.iter().enumerate() {
                for &dst in targets {
                    rev[dst].push(src);
                }
            }
            rev
        }
    }

    /// Local association from top-level elements (`s == dim()`): per cell,
    /// the local ids of its dimension-`t` constituents. Local ids are
    /// assigned in exactly the visitation order that built `le2ge`, so
    /// composing with [`TopologyMetadata::le2ge`] recovers the global map.
    pub fn local_association(&self, s: usize, t: usize) -> Vec<Vec<usize>> {
        debug_assert!(s == self.dim, "local numbering is anchored at the cells");
        let global = self.association(s, t);
        let mut next_local = 0usize;
        global
            .iter()
            .map(|targets| {
                targets
                    .iter()
                    .map(|_| {
                        let l = next_local;
                        next_local += 1;
                        l
                    })
                    .collect()
            })
            .collect()
    }

    /// Association map rendered as a one-to-many relation node
    /// (`values`/`sizes`/`offsets`).
    pub fn dim_map(&self, space: IdSpace, s: usize, t: usize) -> Node {
        let assoc = match space {
            IdSpace::Global => self.association(s, t),
            IdSpace::Local => self.local_association(s, t),
        };
        association_to_o2m(&assoc, self.int_id)
    }

    /// The deduplicated dimension-`d` entity set as an unstructured
    /// topology node.
    pub fn dim_topo(&self, d: usize) -> Result<Node, BlueprintError> {
        let mut dest = Node::new();
        dest["type"].set_string("unstructured");
        dest["coordset"].set_string(&self.coordset_name);

        if d == 3 && self.topo_shape == Shape::Polyhedral {
            // polyhedral cells reference their faces through subelements
            dest["elements/shape"].set_string("polyhedral");
            let conn: Vec<i64> = self
                .cell_to_face
                .iter()
                .flatten()
                .map(|&f| f as i64)
                .collect();
            let sizes: Vec<i64> = self.cell_to_face.iter().map(|fs| fs.len() as i64).collect();
            set_int_slice(dest.fetch_mut("elements/connectivity"), self.int_id, &conn);
            set_int_slice(dest.fetch_mut("elements/sizes"), self.int_id, &sizes);
            dest["subelements/shape"].set_string("polygonal");
            let sub_conn: Vec<i64> = self.faces.iter().flatten().map(|&v| v as i64).collect();
            let sub_sizes: Vec<i64> = self.faces.iter().map(|f| f.len() as i64).collect();
            set_int_slice(dest.fetch_mut("subelements/connectivity"), self.int_id, &sub_conn);
            set_int_slice(dest.fetch_mut("subelements/sizes"), self.int_id, &sub_sizes);
            super::topology::unstructured::generate_offsets(&mut dest)?;
            return Ok(dest);
        }

        let (shape_name, entities): (&str, Vec<Vec<u64>>) = match d {
            0 => ("point", self.entity_points(0)),
            1 => ("line", self.entity_points(1)),
            2 if self.dim == 3 => {
                let name = match self.topo_shape {
                    Shape::Tet => "tri",
                    Shape::Hex => "quad",
                    _ => "polygonal",
                };
                (name, self.entity_points(2))
            }
            d if d == self.dim => (self.topo_shape.name(), self.entity_points(d)),
            other => {
                return Err(BlueprintError::NonConforming(format!(
                    "no dimension-{other} topology for a {}-dimensional cascade",
                    self.dim
                )))
            }
        };

        dest["elements/shape"].set_string(shape_name);
        let flat: Vec<i64> = entities.iter().flatten().map(|&v| v as i64).collect();
        set_int_slice(dest.fetch_mut("elements/connectivity"), self.int_id, &flat);
        if shape_name == "polygonal" || shape_name == "polyhedral" {
            let sizes: Vec<i64> = entities.iter().map(|e| e.len() as i64).collect();
            set_int_slice(dest.fetch_mut("elements/sizes"), self.int_id, &sizes);
            super::topology::unstructured::generate_offsets(&mut dest)?;
        }
        Ok(dest)
    }
}

fn association_to_o2m(assoc: &[Vec<usize>], int_id: crate::node::dtype::DTypeId) -> Node {
    let mut dest = Node::new();
    let values: Vec<i64> = assoc.iter().flatten().map(|&v| v as i64).collect();
    let sizes: Vec<usize> = assoc.iter().map(Vec::len).collect();
    let idx = O2MIndex::from_sizes(sizes);
    set_int_slice(dest.fetch_mut("values"), int_id, &values);
    let sizes_i: Vec<i64> = idx.sizes().iter().map(|&v| v as i64).collect();
    let offsets_i: Vec<i64> = idx.offsets().iter().map(|&v| v as i64).collect();
    set_int_slice(dest.fetch_mut("sizes"), int_id, &sizes_i);
    set_int_slice(dest.fetch_mut("offsets"), int_id, &offsets_i);
    dest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_grid_2x2() -> (Node, Node) {
        let mut cset = Node::new();
        cset["type"].set_string("explicit");
        cset["values/x"].set_slice(&[0.0f64, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        cset["values/y"].set_slice(&[0.0f64, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        let mut topo = Node::new();
        topo["type"].set_string("unstructured");
        topo["coordset"].set_string("coords");
        topo["elements/shape"].set_string("quad");
        topo["elements/connectivity"]
            .set_slice(&[0i64, 1, 4, 3, 1, 2, 5, 4, 3, 4, 7, 6, 4, 5, 8, 7]);
        (topo, cset)
    }

    fn single_hex() -> (Node, Node) {
        let mut cset = Node::new();
        cset["type"].set_string("explicit");
        cset["values/x"].set_slice(&[0.0f64, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        cset["values/y"].set_slice(&[0.0f64, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
        cset["values/z"].set_slice(&[0.0f64, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let mut topo = Node::new();
        topo["type"].set_string("unstructured");
        topo["coordset"].set_string("coords");
        topo["elements/shape"].set_string("hex");
        topo["elements/connectivity"].set_slice(&[0i64, 1, 2, 3, 4, 5, 6, 7]);
        (topo, cset)
    }

    #[test]
    fn quad_grid_edge_dedup() {
        let (topo, cset) = quad_grid_2x2();
        let md = TopologyMetadata::new(&topo, &cset).unwrap();
        assert_eq!(md.dim(), 2);
        assert_eq!(md.num_cells(), 4);
        // 2x2 quad grid: 12 unique edges, 16 local slots
        assert_eq!(md.num_entities(1), 12);
        assert_eq!(md.le2ge(1).len(), 16);
    }

    #[test]
    fn every_entity_appears_once() {
        let (topo, cset) = quad_grid_2x2();
        let md = TopologyMetadata::new(&topo, &cset).unwrap();
        let mut keys: Vec<Vec<u64>> = md
            .entity_points(1)
            .into_iter()
            .map(|mut e| {
                e.sort_unstable();
                e
            })
            .collect();
        keys.sort();
        let before = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn global_is_local_composed_with_le2ge() {
        let (topo, cset) = quad_grid_2x2();
        let md = TopologyMetadata::new(&topo, &cset).unwrap();
        let global = md.association(2, 1);
        let local = md.local_association(2, 1);
        let le2ge = md.le2ge(1);
        for (g_row, l_row) in global.iter().zip(&local) {
            for (&g, &l) in g_row.iter().zip(l_row) {
                assert_eq!(g, le2ge[l]);
            }
        }
    }

    #[test]
    fn hex_cascade_counts() {
        let (topo, cset) = single_hex();
        let md = TopologyMetadata::new(&topo, &cset).unwrap();
        assert_eq!(md.num_entities(3), 1);
        assert_eq!(md.num_entities(2), 6);
        assert_eq!(md.num_entities(1), 12);
        assert_eq!(md.num_entities(0), 8);
        assert_eq!(md.association(3, 2)[0].len(), 6);
        assert_eq!(md.association(3, 1)[0].len(), 12);
        assert_eq!(md.association(3, 0)[0].len(), 8);
        for f2e in md.association(2, 1) {
            assert_eq!(f2e.len(), 4);
        }
    }

    #[test]
    fn reverse_maps_invert_forward() {
        let (topo, cset) = quad_grid_2x2();
        let md = TopologyMetadata::new(&topo, &cset).unwrap();
        let fwd = md.association(2, 0);
        let rev = md.association(0, 2);
        // center vertex 4 touches all four quads
        assert_eq!(rev[4], vec![0, 1, 2, 3]);
        for (cell, points) in fwd.iter().enumerate() {
            for &p in points {
                assert!(rev[p].contains(&cell));
            }
        }
    }

    #[test]
    fn dim_topos_verify() {
        let (topo, cset) = single_hex();
        let md = TopologyMetadata::new(&topo, &cset).unwrap();
        for d in 0..=3 {
            let t = md.dim_topo(d).unwrap();
            let mut info = Node::new();
            assert!(super::super::topology::verify(&t, &mut info), "dim {d}: {}", info.to_text());
        }
    }
}
