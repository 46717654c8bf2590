#![allow(dead_code)]
use mesh_blueprint::prelude::*;

/// 2D uniform coordset: dims {i, j}, origin {x, y}, spacing {dx, dy}.
pub fn uniform_coordset_2d(i: i64, j: i64, origin: (f64, f64), spacing: (f64, f64)) -> Node {
    let mut c = Node::new();
    c["type"].set_string("uniform");
    c["dims/i"].set(i);
    c["dims/j"].set(j);
    c["origin/x"].set(origin.0);
    c["origin/y"].set(origin.1);
    c["spacing/dx"].set(spacing.0);
    c["spacing/dy"].set(spacing.1);
    c
}

/// Single-domain mesh: `nx` x `ny` quad grid as an explicit unstructured
/// topology over an explicit coordset with unit spacing.
pub fn unstructured_quad_grid(nx: usize, ny: usize) -> Node {
    let (vx, vy) = (nx + 1, ny + 1);
    let mut xs = Vec::with_capacity(vx * vy);
    let mut ys = Vec::with_capacity(vx * vy);
    for j in 0..vy {
        for i in 0..vx {
            xs.push(i as f64);
            ys.push(j as f64);
        }
    }
    let mut conn: Vec<i64> = Vec::with_capacity(nx * ny * 4);
    for j in 0..ny {
        for i in 0..nx {
            let base = (j * vx + i) as i64;
            conn.extend_from_slice(&[
                base,
                base + 1,
                base + 1 + vx as i64,
                base + vx as i64,
            ]);
        }
    }

    let mut mesh = Node::new();
    mesh["coordsets/coords/type"].set_string("explicit");
    mesh["coordsets/coords/values/x"].set_slice(&xs);
    mesh["coordsets/coords/values/y"].set_slice(&ys);
    mesh["topologies/mesh/type"].set_string("unstructured");
    mesh["topologies/mesh/coordset"].set_string("coords");
    mesh["topologies/mesh/elements/shape"].set_string("quad");
    mesh["topologies/mesh/elements/connectivity"].set_slice(&conn);
    mesh
}

/// Single-hex unstructured mesh over the unit cube.
pub fn single_hex_mesh() -> Node {
    let mut mesh = Node::new();
    mesh["coordsets/coords/type"].set_string("explicit");
    mesh["coordsets/coords/values/x"]
        .set_slice(&[0.0f64, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
    mesh["coordsets/coords/values/y"]
        .set_slice(&[0.0f64, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    mesh["coordsets/coords/values/z"]
        .set_slice(&[0.0f64, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    mesh["topologies/mesh/type"].set_string("unstructured");
    mesh["topologies/mesh/coordset"].set_string("coords");
    mesh["topologies/mesh/elements/shape"].set_string("hex");
    mesh["topologies/mesh/elements/connectivity"].set_slice(&[0i64, 1, 2, 3, 4, 5, 6, 7]);
    mesh
}

/// Assert a protocol verifies, printing the info tree on failure.
pub fn assert_verifies(protocol: &str, node: &Node) {
    let mut info = Node::new();
    assert!(
        verify(protocol, node, &mut info),
        "`{protocol}` verification failed:\n{}",
        info.to_text()
    );
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
