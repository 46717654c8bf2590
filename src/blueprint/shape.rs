//! Element shape metadata and the dimensional embedding cascade.
//!
//! Fixed-arity shapes carry static tables describing how they decompose
//! into lower-dimensional entities: a hex embeds six quads, a quad embeds
//! four lines, a line embeds two points. Tables are wound so faces are
//! right-handed with a counter-clockwise bottom face; this is the canonical
//! ordering every converter and generator emits.

use crate::error::BlueprintError;

/// Canonical names accepted by `elements/shape`.
pub const SHAPE_NAMES: [&str; 8] = [
    "point",
    "line",
    "tri",
    "quad",
    "tet",
    "hex",
    "polygonal",
    "polyhedral",
];

const LINE_EMBEDDING: &[usize] = &[0, 1];
const TRI_EMBEDDING: &[usize] = &[0, 1, 1, 2, 2, 0];
const QUAD_EMBEDDING: &[usize] = &[0, 1, 1, 2, 2, 3, 3, 0];
const TET_EMBEDDING: &[usize] = &[0, 2, 1, 0, 1, 3, 1, 2, 3, 0, 3, 2];
const HEX_EMBEDDING: &[usize] = &[
    0, 3, 2, 1, //
    0, 1, 5, 4, //
    1, 2, 6, 5, //
    2, 3, 7, 6, //
    3, 0, 4, 7, //
    4, 5, 6, 7,
];

/// Element shape of an unstructured topology.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shape {
    Point,
    Line,
    Tri,
    Quad,
    Tet,
    Hex,
    /// 2D cell with per-element vertex count.
    Polygonal,
    /// 3D cell whose faces live in a `subelements` block.
    Polyhedral,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Point => "point",
            Shape::Line => "line",
            Shape::Tri => "tri",
            Shape::Quad => "quad",
            Shape::Tet => "tet",
            Shape::Hex => "hex",
            Shape::Polygonal => "polygonal",
            Shape::Polyhedral => "polyhedral",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, BlueprintError> {
        Ok(match name {
            "point" => Shape::Point,
            "line" => Shape::Line,
            "tri" => Shape::Tri,
            "quad" => Shape::Quad,
            "tet" => Shape::Tet,
            "hex" => Shape::Hex,
            "polygonal" => Shape::Polygonal,
            "polyhedral" => Shape::Polyhedral,
            other => {
                return Err(BlueprintError::NonConforming(format!(
                    "unknown element shape `{other}`"
                )))
            }
        })
    }

    /// Topological dimension.
    pub fn dim(self) -> usize {
        match self {
            Shape::Point => 0,
            Shape::Line => 1,
            Shape::Tri | Shape::Quad | Shape::Polygonal => 2,
            Shape::Tet | Shape::Hex | Shape::Polyhedral => 3,
        }
    }

    /// Vertices per element for fixed-arity shapes; 0 for poly shapes.
    pub fn indices(self) -> usize {
        match self {
            Shape::Point => 1,
            Shape::Line => 2,
            Shape::Tri => 3,
            Shape::Quad | Shape::Tet => 4,
            Shape::Hex => 8,
            Shape::Polygonal | Shape::Polyhedral => 0,
        }
    }

    pub fn is_poly(self) -> bool {
        matches!(self, Shape::Polygonal | Shape::Polyhedral)
    }

    pub fn is_polygonal(self) -> bool {
        self == Shape::Polygonal
    }

    pub fn is_polyhedral(self) -> bool {
        self == Shape::Polyhedral
    }

    /// The shape of the entities this shape embeds, one dimension down.
    pub fn embed_shape(self) -> Option<Shape> {
        Some(match self {
            Shape::Line => Shape::Point,
            Shape::Tri | Shape::Quad => Shape::Line,
            Shape::Tet => Shape::Tri,
            Shape::Hex => Shape::Quad,
            _ => return None,
        })
    }

    /// Number of embedded entities per element.
    pub fn embed_count(self) -> usize {
        match self {
            Shape::Line => 2,
            Shape::Tri => 3,
            Shape::Quad | Shape::Tet => 4,
            Shape::Hex => 6,
            _ => 0,
        }
    }

    /// Flattened local-vertex table of the embedded entities: entity `k`
    /// uses local vertices `embedding()[k*m .. (k+1)*m]` with
    /// `m = embed_shape().indices()`.
    pub fn embedding(self) -> &'static [usize] {
        match self {
            Shape::Line => LINE_EMBEDDING,
            Shape::Tri => TRI_EMBEDDING,
            Shape::Quad => QUAD_EMBEDDING,
            Shape::Tet => TET_EMBEDDING,
            Shape::Hex => HEX_EMBEDDING,
            _ => &[],
        }
    }
}

/// The full dimensional cascade of a topology's shape: which shape the
/// entities of each dimension `0..=dim` take.
#[derive(Clone, Copy, Debug)]
pub struct ShapeCascade {
    shape: Shape,
}

impl ShapeCascade {
    pub fn new(shape: Shape) -> Self {
        ShapeCascade { shape }
    }

    pub fn dim(&self) -> usize {
        self.shape.dim()
    }

    /// Topmost shape (the element shape itself).
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Shape of the dimension-`d` entities of the cascade.
    pub fn shape_at(&self, d: usize) -> Shape {
        match (self.shape, d) {
            (_, 0) => Shape::Point,
            (_, 1) => Shape::Line,
            (Shape::Polyhedral, 2) => Shape::Polygonal,
            (s, d) if d == s.dim() => s,
            (Shape::Tet, 2) => Shape::Tri,
            (Shape::Hex, 2) => Shape::Quad,
            (s, d) => {
                debug_assert!(false, "no dim-{d} entity for {s:?}");
                Shape::Point
            }
        }
    }
}
