//! Coordset verification, queries, and flavor conversion.
//!
//! A coordset describes vertex coordinates in one of three flavors:
//! `uniform` (dims + origin + spacing), `rectilinear` (one value array per
//! axis), or `explicit` (an mcarray of per-vertex tuples). Conversions
//! materialize the next flavor down the lattice without mutating the
//! source.

use crate::error::BlueprintError;
use crate::node::Node;

use super::helpers::{
    find_widest_float_dtype, log, set_float_slice, verify_enum_field, verify_field_exists,
    verify_mcarray_field, verify_object_field, verify_string_field,
};

pub const COORDSET_TYPES: [&str; 3] = ["uniform", "rectilinear", "explicit"];

/// Recognized coordinate systems, in axis order.
pub const CARTESIAN_AXES: [&str; 3] = ["x", "y", "z"];
pub const CYLINDRICAL_AXES: [&str; 2] = ["r", "z"];
pub const SPHERICAL_AXES: [&str; 3] = ["r", "theta", "phi"];
/// Logical (index-space) axis names.
pub const LOGICAL_AXES: [&str; 3] = ["i", "j", "k"];

fn is_known_axis(name: &str) -> bool {
    CARTESIAN_AXES.contains(&name)
        || CYLINDRICAL_AXES.contains(&name)
        || SPHERICAL_AXES.contains(&name)
}

/// Coordinate-axis names of a coordset, in declaration order.
pub fn axes(coordset: &Node) -> Vec<String> {
    if let Some(values) = coordset.try_fetch("values") {
        return values
            .child_names()
            .iter()
            .filter(|n| is_known_axis(n))
            .cloned()
            .collect();
    }
    if let Some(origin) = coordset.try_fetch("origin") {
        return origin.child_names().to_vec();
    }
    // uniform without origin/spacing: cartesian axes implied by dims
    let n = coordset
        .try_fetch("dims")
        .map(Node::number_of_children)
        .unwrap_or(0);
    CARTESIAN_AXES.iter().take(n).map(|s| s.to_string()).collect()
}

/// Spatial dimension (number of axes).
pub fn dims(coordset: &Node) -> usize {
    if coordset.has_child("values") {
        axes(coordset).len()
    } else {
        coordset
            .try_fetch("dims")
            .map(Node::number_of_children)
            .unwrap_or(0)
    }
}

/// Number of vertices the coordset describes.
pub fn length(coordset: &Node) -> Result<usize, BlueprintError> {
    let ctype = coordset
        .try_fetch("type")
        .and_then(|t| t.as_str().ok())
        .unwrap_or("");
    match ctype {
        "uniform" => {
            let dims = coordset.fetch("dims")?;
            let mut total = 1usize;
            for c in dims.children() {
                total *= c.to_i64()? as usize;
            }
            Ok(total)
        }
        "rectilinear" => {
            let values = coordset.fetch("values")?;
            let mut total = 1usize;
            for c in values.children() {
                total *= c.dtype().num_elements();
            }
            Ok(total)
        }
        "explicit" => {
            let values = coordset.fetch("values")?;
            Ok(values
                .children()
                .next()
                .map(|c| c.dtype().num_elements())
                .unwrap_or(0))
        }
        other => Err(BlueprintError::NonConforming(format!(
            "unknown coordset type `{other}`"
        ))),
    }
}

/// Per-axis vertex counts along the logical grid (uniform/rectilinear).
pub(crate) fn logical_vertex_dims(coordset: &Node) -> Result<Vec<usize>, BlueprintError> {
    let ctype = coordset.fetch("type")?.as_str()?.to_string();
    match ctype.as_str() {
        "uniform" => {
            let dims = coordset.fetch("dims")?;
            dims.children().map(|c| Ok(c.to_i64()? as usize)).collect()
        }
        "rectilinear" => {
            let values = coordset.fetch("values")?;
            Ok(values.children().map(|c| c.dtype().num_elements()).collect())
        }
        other => Err(BlueprintError::NonConforming(format!(
            "coordset type `{other}` has no logical dims"
        ))),
    }
}

// ---------------------------------------------------------------------------
// verification
// ---------------------------------------------------------------------------

pub fn verify(coordset: &Node, info: &mut Node) -> bool {
    let proto = "coordset";
    let mut res = verify_enum_field(proto, coordset, info, "type", &COORDSET_TYPES);

    if res {
        let ctype = coordset["type"].as_str().unwrap_or("");
        res = match ctype {
            "uniform" => uniform::verify(coordset, info),
            "rectilinear" => rectilinear::verify(coordset, info),
            "explicit" => explicit::verify(coordset, info),
            _ => false,
        };
    }

    log::validation(info, res);
    res
}

pub mod uniform {
    use super::*;

    pub fn verify(coordset: &Node, info: &mut Node) -> bool {
        let proto = "coordset::uniform";
        let mut res = verify_object_field(proto, coordset, info, "dims");

        if res {
            let dims = &coordset["dims"];
            for (i, name) in dims.child_names().iter().enumerate() {
                if i >= LOGICAL_AXES.len() || name != LOGICAL_AXES[i] {
                    log::error(info, proto, &format!("unexpected logical axis `{name}`"));
                    res = false;
                } else if !dims[name.as_str()].dtype().is_integer() {
                    log::error(info, proto, &format!("dims/{name} is not an integer"));
                    res = false;
                }
            }
        }

        for block in ["origin", "spacing"] {
            if let Some(b) = coordset.try_fetch(block) {
                for (name, child) in b.entries() {
                    let name = name.unwrap_or("");
                    let axis = if block == "spacing" {
                        name.strip_prefix('d').unwrap_or("")
                    } else {
                        name
                    };
                    if !is_known_axis(axis) {
                        log::error(info, proto, &format!("{block}/{name} is not a known axis"));
                        res = false;
                    } else if !child.dtype().is_number() {
                        log::error(info, proto, &format!("{block}/{name} is not a number"));
                        res = false;
                    }
                }
            }
        }

        log::validation(info, res);
        res
    }

    /// Materialize per-axis value arrays: `v[i] = origin + i * spacing`.
    pub fn to_rectilinear(coordset: &Node) -> Result<Node, BlueprintError> {
        let float_id = find_widest_float_dtype(&[coordset]);
        let csys_axes = axes(coordset);

        let mut dest = Node::new();
        dest["type"].set_string("rectilinear");
        for (i, axis) in csys_axes.iter().enumerate() {
            let (origin, spacing) = axis_origin_spacing(coordset, axis)?;
            let len = coordset.fetch("dims")?.fetch(LOGICAL_AXES[i])?.to_i64()? as usize;
            let vals: Vec<f64> = (0..len).map(|d| origin + d as f64 * spacing).collect();
            set_float_slice(dest.fetch_mut("values").fetch_mut(axis), float_id, &vals);
        }
        Ok(dest)
    }

    /// Materialize the full Cartesian product of axis values; see
    /// [`super::cartesian_product_explicit`] for the ordering contract.
    pub fn to_explicit(coordset: &Node) -> Result<Node, BlueprintError> {
        cartesian_product_explicit(coordset, true)
    }

    pub(crate) fn axis_origin_spacing(
        coordset: &Node,
        axis: &str,
    ) -> Result<(f64, f64), BlueprintError> {
        let origin = match coordset.try_fetch("origin") {
            Some(o) => o.fetch(axis)?.to_f64()?,
            None => 0.0,
        };
        let spacing = match coordset.try_fetch("spacing") {
            Some(s) => s.fetch(&format!("d{axis}"))?.to_f64()?,
            None => 1.0,
        };
        Ok((origin, spacing))
    }
}

pub mod rectilinear {
    use super::*;

    pub fn verify(coordset: &Node, info: &mut Node) -> bool {
        let proto = "coordset::rectilinear";
        let mut res = verify_object_field(proto, coordset, info, "values");

        if res {
            for (name, child) in coordset["values"].entries() {
                let name = name.unwrap_or("");
                if !is_known_axis(name) {
                    log::error(info, proto, &format!("values/{name} is not a known axis"));
                    res = false;
                } else if !child.dtype().is_number() {
                    log::error(info, proto, &format!("values/{name} is not numeric"));
                    res = false;
                }
            }
        }

        log::validation(info, res);
        res
    }

    /// Emit the Cartesian product of the per-axis arrays.
    pub fn to_explicit(coordset: &Node) -> Result<Node, BlueprintError> {
        cartesian_product_explicit(coordset, false)
    }
}

pub mod explicit {
    use super::*;

    pub fn verify(coordset: &Node, info: &mut Node) -> bool {
        let proto = "coordset::explicit";
        let mut res = verify_mcarray_field(proto, coordset, info, "values");
        if res {
            for name in coordset["values"].child_names() {
                if !is_known_axis(name) {
                    log::error(info, proto, &format!("values/{name} is not a known axis"));
                    res = false;
                }
            }
        }
        log::validation(info, res);
        res
    }
}

/// Shared uniform/rectilinear → explicit kernel.
///
/// Vertex tuples are emitted in column-major (`x` fastest) order: axis `a`
/// repeats each of its values over a block of size `prod(dims[..a])` and
/// cycles the whole axis `prod(dims[a+1..])` times.
fn cartesian_product_explicit(coordset: &Node, is_uniform: bool) -> Result<Node, BlueprintError> {
    let float_id = find_widest_float_dtype(&[coordset]);
    let csys_axes = axes(coordset);
    let dims = logical_vertex_dims(coordset)?;
    let coords_len: usize = dims.iter().product();

    let mut dest = Node::new();
    dest["type"].set_string("explicit");
    for (i, axis) in csys_axes.iter().enumerate() {
        let axis_vals: Vec<f64> = if is_uniform {
            let (origin, spacing) = uniform::axis_origin_spacing(coordset, axis)?;
            (0..dims[i]).map(|d| origin + d as f64 * spacing).collect()
        } else {
            coordset.fetch("values")?.fetch(axis)?.to_vec::<f64>()?
        };

        let block: usize = dims[..i].iter().product();
        let cycles: usize = dims[i + 1..].iter().product();

        let mut out = Vec::with_capacity(coords_len);
        for _ in 0..cycles {
            for &v in &axis_vals {
                for _ in 0..block {
                    out.push(v);
                }
            }
        }
        set_float_slice(dest.fetch_mut("values").fetch_mut(axis), float_id, &out);
    }
    Ok(dest)
}

pub mod index {
    use super::*;

    /// Verify the `coordset/index` protocol.
    pub fn verify(cset_idx: &Node, info: &mut Node) -> bool {
        let proto = "coordset::index";
        let mut res = verify_enum_field(proto, cset_idx, info, "type", &COORDSET_TYPES);
        res &= verify_string_axes(proto, cset_idx, info);
        res &= verify_string_field(proto, cset_idx, info, "path");
        log::validation(info, res);
        res
    }

    fn verify_string_axes(proto: &str, cset_idx: &Node, info: &mut Node) -> bool {
        let mut res = verify_field_exists(proto, cset_idx, info, "coord_system");
        if res {
            let csys = &cset_idx["coord_system"];
            res = verify_enum_field(
                proto,
                csys,
                info,
                "type",
                &["cartesian", "cylindrical", "spherical", "logical"],
            );
            res &= verify_object_field(proto, csys, info, "axes");
        }
        res
    }
}
