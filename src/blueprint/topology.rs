//! Topology verification, queries, and flavor conversion.
//!
//! Topologies come in five flavors: `points`, `uniform`, `rectilinear`,
//! `structured`, and `unstructured`. The implicit flavors convert down the
//! lattice in lockstep with their coordset; `structured` converts to
//! explicit `unstructured` connectivity; single-shape `unstructured`
//! rewrites to `polygonal`/`polyhedral` form. Conversions never mutate
//! their source.

use crate::error::BlueprintError;
use crate::node::Node;

use super::coordset;
use super::helpers::{
    find_widest_int_dtype, log, set_int_slice, verify_enum_field, verify_integer_field,
    verify_object_field, verify_string_field,
};
use super::o2m::O2MIndex;
use super::shape::Shape;

pub const TOPOLOGY_TYPES: [&str; 5] =
    ["points", "uniform", "rectilinear", "structured", "unstructured"];

/// Flattened grid index -> (i, j, k).
pub(crate) fn grid_id_to_ijk(id: usize, dims: &[usize]) -> [usize; 3] {
    let mut out = [0usize; 3];
    let mut rem = id;
    for (d, &len) in dims.iter().enumerate() {
        if len > 0 {
            out[d] = rem % len;
            rem /= len;
        }
    }
    out
}

/// (i, j, k) -> flattened grid index.
pub(crate) fn grid_ijk_to_id(ijk: &[usize; 3], dims: &[usize]) -> usize {
    let mut id = 0usize;
    let mut block = 1usize;
    for (d, &len) in dims.iter().enumerate() {
        id += ijk[d] * block;
        block *= len.max(1);
    }
    id
}

/// Element shape of an unstructured topology.
pub(crate) fn shape_of(topo: &Node) -> Result<Shape, BlueprintError> {
    Shape::from_name(topo.fetch("elements/shape")?.as_str()?)
}

/// Number of elements in a topology of any flavor.
pub fn length(topo: &Node, cset: &Node) -> Result<usize, BlueprintError> {
    let ttype = topo.fetch("type")?.as_str()?.to_string();
    match ttype.as_str() {
        "points" => coordset::length(cset),
        "uniform" | "rectilinear" => {
            let vdims = coordset::logical_vertex_dims(cset)?;
            Ok(vdims.iter().map(|&v| v.saturating_sub(1)).product())
        }
        "structured" => {
            let dims = topo.fetch("elements/dims")?;
            let mut total = 1usize;
            for c in dims.children() {
                total *= c.to_i64()? as usize;
            }
            Ok(total)
        }
        "unstructured" => {
            let shape = shape_of(topo)?;
            if shape.is_poly() {
                Ok(topo.fetch("elements/sizes")?.dtype().num_elements())
            } else {
                let conn_len = topo.fetch("elements/connectivity")?.dtype().num_elements();
                Ok(conn_len / shape.indices())
            }
        }
        other => Err(BlueprintError::NonConforming(format!(
            "unknown topology type `{other}`"
        ))),
    }
}

/// Topological dimension of a topology's elements.
pub fn dims(topo: &Node, cset: &Node) -> Result<usize, BlueprintError> {
    let ttype = topo.fetch("type")?.as_str()?;
    match ttype {
        "points" => Ok(0),
        "uniform" | "rectilinear" | "structured" => Ok(coordset::dims(cset)),
        "unstructured" => Ok(shape_of(topo)?.dim()),
        other => Err(BlueprintError::NonConforming(format!(
            "unknown topology type `{other}`"
        ))),
    }
}

// ---------------------------------------------------------------------------
// verification
// ---------------------------------------------------------------------------

pub fn verify(topo: &Node, info: &mut Node) -> bool {
    let proto = "topology";
    let mut res = verify_enum_field(proto, topo, info, "type", &TOPOLOGY_TYPES);
    res &= verify_string_field(proto, topo, info, "coordset");

    if res {
        let ttype = topo["type"].as_str().unwrap_or("");
        res = match ttype {
            "structured" => structured::verify(topo, info),
            "unstructured" => unstructured::verify(topo, info),
            // points/uniform/rectilinear carry no further structure
            _ => true,
        };
    }

    log::validation(info, res);
    res
}

pub mod structured {
    use super::*;

    pub fn verify(topo: &Node, info: &mut Node) -> bool {
        let proto = "topology::structured";
        let mut res = verify_object_field(proto, topo, info, "elements");
        if res {
            let elements = &topo["elements"];
            res = verify_object_field(proto, elements, info, "dims");
            if res {
                for (i, name) in elements["dims"].child_names().iter().enumerate() {
                    if i >= coordset::LOGICAL_AXES.len() || name != coordset::LOGICAL_AXES[i] {
                        log::error(info, proto, &format!("unexpected dims axis `{name}`"));
                        res = false;
                    }
                }
                res &= elements["dims"].children().all(|c| c.dtype().is_integer());
            }
        }
        log::validation(info, res);
        res
    }

    /// Emit explicit `{line|quad|hex}` connectivity from the regular grid.
    pub fn to_unstructured(
        topo: &Node,
        cset: &Node,
        dest_coordset_name: &str,
    ) -> Result<(Node, Node), BlueprintError> {
        let dims_node = topo.fetch("elements/dims")?;
        let mut edims = Vec::new();
        for c in dims_node.children() {
            edims.push(c.to_i64()? as usize);
        }
        let cdest = match cset.fetch("type")?.as_str()? {
            "explicit" => cset.clone(),
            "rectilinear" => coordset::rectilinear::to_explicit(cset)?,
            "uniform" => coordset::uniform::to_explicit(cset)?,
            other => {
                return Err(BlueprintError::NonConforming(format!(
                    "structured topology over `{other}` coordset"
                )))
            }
        };
        let dest = emit_grid_connectivity(topo, &edims, dest_coordset_name)?;
        Ok((dest, cdest))
    }
}

pub mod uniform {
    use super::*;

    /// Convert the referenced coordset in lockstep; the topology itself
    /// just re-flavors.
    pub fn to_rectilinear(
        topo: &Node,
        cset: &Node,
        dest_coordset_name: &str,
    ) -> Result<(Node, Node), BlueprintError> {
        let cdest = coordset::uniform::to_rectilinear(cset)?;
        let mut dest = topo.clone();
        dest["type"].set_string("rectilinear");
        dest["coordset"].set_string(dest_coordset_name);
        Ok((dest, cdest))
    }

    pub fn to_structured(
        topo: &Node,
        cset: &Node,
        dest_coordset_name: &str,
    ) -> Result<(Node, Node), BlueprintError> {
        implicit_to_structured(topo, cset, true, dest_coordset_name)
    }

    pub fn to_unstructured(
        topo: &Node,
        cset: &Node,
        dest_coordset_name: &str,
    ) -> Result<(Node, Node), BlueprintError> {
        let cdest = coordset::uniform::to_explicit(cset)?;
        let vdims = coordset::logical_vertex_dims(cset)?;
        let edims: Vec<usize> = vdims.iter().map(|&v| v - 1).collect();
        let dest = emit_grid_connectivity(topo, &edims, dest_coordset_name)?;
        Ok((dest, cdest))
    }
}

pub mod rectilinear {
    use super::*;

    pub fn to_structured(
        topo: &Node,
        cset: &Node,
        dest_coordset_name: &str,
    ) -> Result<(Node, Node), BlueprintError> {
        implicit_to_structured(topo, cset, false, dest_coordset_name)
    }

    pub fn to_unstructured(
        topo: &Node,
        cset: &Node,
        dest_coordset_name: &str,
    ) -> Result<(Node, Node), BlueprintError> {
        let cdest = coordset::rectilinear::to_explicit(cset)?;
        let vdims = coordset::logical_vertex_dims(cset)?;
        let edims: Vec<usize> = vdims.iter().map(|&v| v - 1).collect();
        let dest = emit_grid_connectivity(topo, &edims, dest_coordset_name)?;
        Ok((dest, cdest))
    }
}

fn implicit_to_structured(
    topo: &Node,
    cset: &Node,
    is_uniform: bool,
    dest_coordset_name: &str,
) -> Result<(Node, Node), BlueprintError> {
    let cdest = if is_uniform {
        coordset::uniform::to_explicit(cset)?
    } else {
        coordset::rectilinear::to_explicit(cset)?
    };
    let int_id = find_widest_int_dtype(&[topo]);
    let vdims = coordset::logical_vertex_dims(cset)?;

    let mut dest = Node::new();
    dest["type"].set_string("structured");
    dest["coordset"].set_string(dest_coordset_name);
    if let Some(origin) = topo.try_fetch("origin") {
        *dest.fetch_mut("origin") = origin.clone();
    }
    for (d, &len) in vdims.iter().enumerate() {
        // one fewer element than vertices along each axis
        set_int_slice(
            dest.fetch_mut("elements/dims").fetch_mut(coordset::LOGICAL_AXES[d]),
            int_id,
            &[(len - 1) as i64],
        );
    }
    Ok((dest, cdest))
}

/// Shared kernel: explicit connectivity of a regular i-j-k element grid.
///
/// Each cell's 2^d local vertices are enumerated by the bitwise
/// interpretation of the local index (bit `a` set means axis `a` takes the
/// +1 neighbor); a post-pass swaps the last two vertices of every
/// face-quad to restore the canonical counter-clockwise winding.
fn emit_grid_connectivity(
    topo: &Node,
    edims: &[usize],
    dest_coordset_name: &str,
) -> Result<Node, BlueprintError> {
    let ndims = edims.len();
    let int_id = find_widest_int_dtype(&[topo]);

    let mut vdims = [1usize; 3];
    let mut edims3 = [1usize; 3];
    for (d, &e) in edims.iter().enumerate() {
        edims3[d] = e;
        vdims[d] = e + 1;
    }
    let num_elems: usize = edims3.iter().product();
    let indices_per_elem = 1usize << ndims;

    let mut dest = Node::new();
    dest["type"].set_string("unstructured");
    dest["coordset"].set_string(dest_coordset_name);
    if let Some(origin) = topo.try_fetch("origin") {
        *dest.fetch_mut("origin") = origin.clone();
    }
    dest["elements/shape"].set_string(match ndims {
        1 => "line",
        2 => "quad",
        3 => "hex",
        other => {
            return Err(BlueprintError::NonConforming(format!(
                "no grid element shape for {other} dims"
            )))
        }
    });

    let mut conn = Vec::with_capacity(num_elems * indices_per_elem);
    for e in 0..num_elems {
        let elem_ijk = grid_id_to_ijk(e, &edims3);
        for i in 0..indices_per_elem {
            let mut vert_ijk = elem_ijk;
            for d in 0..ndims {
                vert_ijk[d] += (i >> d) & 1;
            }
            conn.push(grid_ijk_to_id(&vert_ijk, &vdims) as i64);
        }
        // restore canonical winding on each face-quad
        let base = e * indices_per_elem;
        let mut p = 2;
        while p + 1 < indices_per_elem {
            conn.swap(base + p, base + p + 1);
            p += 4;
        }
    }
    set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &conn);
    Ok(dest)
}

pub mod points {
    use super::*;

    pub fn verify(topo: &Node, info: &mut Node) -> bool {
        let proto = "topology::points";
        let res = verify_string_field(proto, topo, info, "coordset");
        log::validation(info, res);
        res
    }
}

pub mod unstructured {
    use super::*;

    pub fn verify(topo: &Node, info: &mut Node) -> bool {
        let proto = "topology::unstructured";
        let mut res = verify_object_field(proto, topo, info, "elements");
        if !res {
            log::validation(info, res);
            return false;
        }
        let elements = &topo["elements"];
        res &= verify_enum_field(proto, elements, info, "shape", &super::super::shape::SHAPE_NAMES);
        res &= verify_integer_field(proto, elements, info, "connectivity");

        if res {
            let shape = Shape::from_name(elements["shape"].as_str().unwrap_or(""))
                .unwrap_or(Shape::Point);
            if shape.is_poly() {
                res &= verify_integer_field(proto, elements, info, "sizes");
            }
            if shape.is_polyhedral() {
                res &= verify_object_field(proto, topo, info, "subelements");
                if res {
                    let sub = &topo["subelements"];
                    res &= verify_enum_field(proto, sub, info, "shape", &["polygonal"]);
                    res &= verify_integer_field(proto, sub, info, "connectivity");
                    res &= verify_integer_field(proto, sub, info, "sizes");
                }
            }
        }

        log::validation(info, res);
        res
    }

    /// Insert compact `offsets` (and `subelements/offsets` for polyhedral
    /// topologies) when absent.
    pub fn generate_offsets(topo: &mut Node) -> Result<(), BlueprintError> {
        let shape = shape_of(topo)?;
        if !topo.fetch("elements")?.has_child("offsets") {
            let idx = if shape.is_poly() {
                let sizes = topo.fetch("elements/sizes")?.to_vec::<u64>()?;
                O2MIndex::from_sizes(sizes.into_iter().map(|v| v as usize).collect())
            } else {
                let conn_len = topo.fetch("elements/connectivity")?.dtype().num_elements();
                O2MIndex::fixed(conn_len / shape.indices(), shape.indices())
            };
            let int_id = find_widest_int_dtype(&[topo]);
            let offsets: Vec<i64> = idx.offsets().iter().map(|&o| o as i64).collect();
            set_int_slice(topo.fetch_mut("elements/offsets"), int_id, &offsets);
        }
        if shape.is_polyhedral() && !topo.fetch("subelements")?.has_child("offsets") {
            let sizes = topo.fetch("subelements/sizes")?.to_vec::<u64>()?;
            let idx = O2MIndex::from_sizes(sizes.into_iter().map(|v| v as usize).collect());
            let int_id = find_widest_int_dtype(&[topo]);
            let offsets: Vec<i64> = idx.offsets().iter().map(|&o| o as i64).collect();
            set_int_slice(topo.fetch_mut("subelements/offsets"), int_id, &offsets);
        }
        Ok(())
    }

    /// Rewrite a single-shape topology in polytopal form: `polygonal` for
    /// 2D shapes, `polyhedral` (with deduplicated faces in `subelements`)
    /// for 3D shapes. Poly inputs deep-copy.
    pub fn to_polygonal(topo: &Node) -> Result<Node, BlueprintError> {
        let shape = shape_of(topo)?;
        let int_id = find_widest_int_dtype(&[topo]);

        if shape.is_poly() {
            let mut dest = topo.clone();
            generate_offsets(&mut dest)?;
            return Ok(dest);
        }
        if shape.dim() < 2 {
            return Err(BlueprintError::NonConforming(format!(
                "no polytopal form for `{}` elements",
                shape.name()
            )));
        }

        let conn = topo.fetch("elements/connectivity")?.to_vec::<i64>()?;
        let num_elems = conn.len() / shape.indices();

        let mut dest = Node::new();
        dest["type"].set_string("unstructured");
        dest["coordset"].set_string(topo.fetch("coordset")?.as_str()?);

        if shape.dim() == 2 {
            // inherits the source connectivity (and thus its winding)
            dest["elements/shape"].set_string("polygonal");
            set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &conn);
            let sizes = vec![shape.indices() as i64; num_elems];
            set_int_slice(dest.fetch_mut("elements/sizes"), int_id, &sizes);
        } else {
            // factor cells into faces, reusing the id of the first
            // occurrence of each face's vertex set
            let embed = shape.embed_shape().ok_or_else(|| {
                BlueprintError::NonConforming(format!("`{}` has no face table", shape.name()))
            })?;
            let table = shape.embedding();
            let face_arity = embed.indices();

            let mut cell_faces: Vec<i64> = Vec::with_capacity(num_elems * shape.embed_count());
            let mut face_conn: Vec<i64> = Vec::new();
            let mut face_keys: hashbrown::HashMap<Vec<i64>, i64> = hashbrown::HashMap::new();

            for e in 0..num_elems {
                let base = e * shape.indices();
                for f in 0..shape.embed_count() {
                    let verts: Vec<i64> = (0..face_arity)
                        .map(|i| conn[base + table[f * face_arity + i]])
                        .collect();
                    let mut key = verts.clone();
                    key.sort_unstable();
                    let next_id = (face_conn.len() / face_arity) as i64;
                    let id = *face_keys.entry(key).or_insert_with(|| {
                        face_conn.extend_from_slice(&verts);
                        next_id
                    });
                    cell_faces.push(id);
                }
            }

            dest["elements/shape"].set_string("polyhedral");
            set_int_slice(dest.fetch_mut("elements/connectivity"), int_id, &cell_faces);
            let sizes = vec![shape.embed_count() as i64; num_elems];
            set_int_slice(dest.fetch_mut("elements/sizes"), int_id, &sizes);

            dest["subelements/shape"].set_string("polygonal");
            set_int_slice(dest.fetch_mut("subelements/connectivity"), int_id, &face_conn);
            let sub_sizes = vec![face_arity as i64; face_conn.len() / face_arity];
            set_int_slice(dest.fetch_mut("subelements/sizes"), int_id, &sub_sizes);
        }

        generate_offsets(&mut dest)?;
        Ok(dest)
    }

    /// Alias of [`to_polygonal`] under its dimension-neutral name.
    pub fn to_polytopal(topo: &Node) -> Result<Node, BlueprintError> {
        to_polygonal(topo)
    }
}

pub mod index {
    use super::*;

    /// Verify the `topology/index` protocol.
    pub fn verify(topo_idx: &Node, info: &mut Node) -> bool {
        let proto = "topology::index";
        let mut res = verify_enum_field(proto, topo_idx, info, "type", &TOPOLOGY_TYPES);
        res &= verify_string_field(proto, topo_idx, info, "coordset");
        res &= verify_string_field(proto, topo_idx, info, "path");
        log::validation(info, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_3x3() -> Node {
        let mut c = Node::new();
        c["type"].set_string("rectilinear");
        c["values/x"].set_slice(&[0.0f64, 1.0, 2.0]);
        c["values/y"].set_slice(&[0.0f64, 1.0, 2.0]);
        c
    }

    fn structured_2x2() -> Node {
        let mut t = Node::new();
        t["type"].set_string("structured");
        t["coordset"].set_string("coords");
        t["elements/dims/i"].set(2i64);
        t["elements/dims/j"].set(2i64);
        t
    }

    #[test]
    fn structured_to_unstructured_quads() {
        let cset = coordset::rectilinear::to_explicit(&rect_3x3()).unwrap();
        let topo = structured_2x2();
        let (dest, cdest) = structured::to_unstructured(&topo, &cset, "coords").unwrap();
        assert_eq!(dest["elements/shape"].as_str().unwrap(), "quad");
        assert_eq!(
            dest["elements/connectivity"].to_vec::<i64>().unwrap(),
            vec![0, 1, 4, 3, 1, 2, 5, 4, 3, 4, 7, 6, 4, 5, 8, 7]
        );
        assert_eq!(coordset::length(&cdest).unwrap(), 9);
        let mut info = Node::new();
        assert!(verify(&dest, &mut info), "{}", info.to_text());
    }

    #[test]
    fn hex_to_polyhedral_factors_six_faces() {
        let mut topo = Node::new();
        topo["type"].set_string("unstructured");
        topo["coordset"].set_string("coords");
        topo["elements/shape"].set_string("hex");
        topo["elements/connectivity"].set_slice(&[0i64, 1, 2, 3, 4, 5, 6, 7]);

        let poly = unstructured::to_polygonal(&topo).unwrap();
        assert_eq!(poly["elements/shape"].as_str().unwrap(), "polyhedral");
        assert_eq!(poly["elements/sizes"].to_vec::<i64>().unwrap(), vec![6]);
        assert_eq!(poly["subelements/shape"].as_str().unwrap(), "polygonal");
        assert_eq!(
            poly["subelements/sizes"].to_vec::<i64>().unwrap(),
            vec![4, 4, 4, 4, 4, 4]
        );
        let faces = poly["elements/connectivity"].to_vec::<i64>().unwrap();
        assert_eq!(faces, vec![0, 1, 2, 3, 4, 5]);
        let mut info = Node::new();
        assert!(verify(&poly, &mut info), "{}", info.to_text());
    }

    #[test]
    fn two_hexes_share_one_face() {
        let mut topo = Node::new();
        topo["type"].set_string("unstructured");
        topo["coordset"].set_string("coords");
        topo["elements/shape"].set_string("hex");
        // 2x1x1 hex grid over a 3x2x2 vertex lattice
        topo["elements/connectivity"].set_slice(&[
            0i64, 1, 4, 3, 6, 7, 10, 9, //
            1, 2, 5, 4, 7, 8, 11, 10,
        ]);
        let poly = unstructured::to_polygonal(&topo).unwrap();
        let num_faces = poly["subelements/sizes"].dtype().num_elements();
        assert_eq!(num_faces, 11, "12 faces minus 1 shared");
    }

    #[test]
    fn tri_to_polygonal_keeps_winding() {
        let mut topo = Node::new();
        topo["type"].set_string("unstructured");
        topo["coordset"].set_string("coords");
        topo["elements/shape"].set_string("tri");
        topo["elements/connectivity"].set_slice(&[0i64, 1, 2, 2, 1, 3]);
        let poly = unstructured::to_polygonal(&topo).unwrap();
        assert_eq!(poly["elements/shape"].as_str().unwrap(), "polygonal");
        assert_eq!(
            poly["elements/connectivity"].to_vec::<i64>().unwrap(),
            vec![0, 1, 2, 2, 1, 3]
        );
        assert_eq!(poly["elements/sizes"].to_vec::<i64>().unwrap(), vec![3, 3]);
        assert_eq!(poly["elements/offsets"].to_vec::<i64>().unwrap(), vec![0, 3]);
    }

    #[test]
    fn uniform_topology_conversions_conform() {
        let mut cset = Node::new();
        cset["type"].set_string("uniform");
        cset["dims/i"].set(3i64);
        cset["dims/j"].set(3i64);
        let mut topo = Node::new();
        topo["type"].set_string("uniform");
        topo["coordset"].set_string("coords");

        let (rt, rc) = uniform::to_rectilinear(&topo, &cset, "coords").unwrap();
        let mut info = Node::new();
        assert!(super::super::coordset::verify(&rc, &mut info));
        assert!(verify(&rt, &mut info));

        let (st, sc) = uniform::to_structured(&topo, &cset, "coords").unwrap();
        assert!(super::super::coordset::verify(&sc, &mut info));
        assert!(verify(&st, &mut info), "{}", info.to_text());
        assert_eq!(length(&st, &sc).unwrap(), 4);

        let (ut, uc) = uniform::to_unstructured(&topo, &cset, "coords").unwrap();
        assert!(super::super::coordset::verify(&uc, &mut info));
        assert!(verify(&ut, &mut info), "{}", info.to_text());
        assert_eq!(length(&ut, &uc).unwrap(), 4);
    }
}
