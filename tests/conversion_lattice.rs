mod util;
use util::*;

use mesh_blueprint::blueprint::{coordset, topology};
use mesh_blueprint::prelude::*;

#[test]
fn uniform_to_rectilinear_to_explicit_conforms() {
    let u = uniform_coordset_2d(3, 2, (0.0, 0.0), (1.0, 2.0));
    assert_verifies("coordset", &u);

    let r = coordset::uniform::to_rectilinear(&u).unwrap();
    assert_verifies("coordset", &r);

    let e = coordset::rectilinear::to_explicit(&r).unwrap();
    assert_verifies("coordset", &e);

    let e_direct = coordset::uniform::to_explicit(&u).unwrap();
    assert_verifies("coordset", &e_direct);

    let mut info = Node::new();
    assert!(
        !e.diff(&e_direct, &mut info, 1e-12),
        "direct and staged explicit conversion disagree:\n{}",
        info.to_text()
    );
}

#[test]
fn uniform_to_explicit_expected_values() {
    // dims {i:3, j:2}, origin {0,0}, spacing {1,2}
    let u = uniform_coordset_2d(3, 2, (0.0, 0.0), (1.0, 2.0));
    let e = coordset::uniform::to_explicit(&u).unwrap();
    assert_eq!(
        e["values/x"].to_vec::<f64>().unwrap(),
        vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]
    );
    assert_eq!(
        e["values/y"].to_vec::<f64>().unwrap(),
        vec![0.0, 0.0, 0.0, 2.0, 2.0, 2.0]
    );
}

#[test]
fn uniform_to_explicit_coordinate_fidelity() {
    let (origin, spacing) = ((1.5f64, -2.0f64), (0.25f64, 0.75f64));
    let (ni, nj) = (7usize, 5usize);
    let u = uniform_coordset_2d(ni as i64, nj as i64, origin, spacing);
    let e = coordset::uniform::to_explicit(&u).unwrap();
    let xs = e["values/x"].to_vec::<f64>().unwrap();
    let ys = e["values/y"].to_vec::<f64>().unwrap();
    for k in 0..ni * nj {
        let (i, j) = (k % ni, k / ni);
        let want_x = origin.0 + i as f64 * spacing.0;
        let want_y = origin.1 + j as f64 * spacing.1;
        let rel = |got: f64, want: f64| {
            if want == 0.0 {
                got.abs()
            } else {
                ((got - want) / want).abs()
            }
        };
        assert!(rel(xs[k], want_x) < 1e-12, "x[{k}] = {} != {want_x}", xs[k]);
        assert!(rel(ys[k], want_y) < 1e-12, "y[{k}] = {} != {want_y}", ys[k]);
    }
}

#[test]
fn structured_to_unstructured_quad_connectivity() {
    // 2x2 element grid over a 3x3 rectilinear coordset
    let mut cset = Node::new();
    cset["type"].set_string("rectilinear");
    cset["values/x"].set_slice(&[0.0f64, 1.0, 2.0]);
    cset["values/y"].set_slice(&[0.0f64, 1.0, 2.0]);
    let explicit = coordset::rectilinear::to_explicit(&cset).unwrap();

    let mut topo = Node::new();
    topo["type"].set_string("structured");
    topo["coordset"].set_string("coords");
    topo["elements/dims/i"].set(2i64);
    topo["elements/dims/j"].set(2i64);

    let (dest, cdest) = topology::structured::to_unstructured(&topo, &explicit, "coords").unwrap();
    assert_eq!(dest["elements/shape"].as_str().unwrap(), "quad");
    assert_eq!(
        dest["elements/connectivity"].to_vec::<i64>().unwrap(),
        vec![0, 1, 4, 3, 1, 2, 5, 4, 3, 4, 7, 6, 4, 5, 8, 7]
    );
    assert_verifies("topology", &dest);
    assert_verifies("coordset", &cdest);
}

#[test]
fn full_topology_lattice_conforms() {
    let mut mesh = Node::new();
    *mesh.fetch_mut("coordsets/coords") = uniform_coordset_2d(4, 3, (0.0, 0.0), (1.0, 1.0));
    mesh["topologies/mesh/type"].set_string("uniform");
    mesh["topologies/mesh/coordset"].set_string("coords");
    assert_verifies("mesh", &mesh);

    let cset = &mesh["coordsets/coords"];
    let topo = &mesh["topologies/mesh"];

    let (rt, rc) = topology::uniform::to_rectilinear(topo, cset, "coords").unwrap();
    assert_verifies("topology", &rt);
    assert_verifies("coordset", &rc);

    let (st, sc) = topology::rectilinear::to_structured(&rt, &rc, "coords").unwrap();
    assert_verifies("topology", &st);
    assert_verifies("coordset", &sc);

    let (ut, uc) = topology::structured::to_unstructured(&st, &sc, "coords").unwrap();
    assert_verifies("topology", &ut);
    assert_verifies("coordset", &uc);

    // element counts agree across the whole lattice
    let n = topology::length(topo, cset).unwrap();
    assert_eq!(n, 12);
    assert_eq!(topology::length(&rt, &rc).unwrap(), n);
    assert_eq!(topology::length(&st, &sc).unwrap(), n);
    assert_eq!(topology::length(&ut, &uc).unwrap(), n);
}

#[test]
fn hex_grid_structured_to_unstructured() {
    let mut cset = Node::new();
    cset["type"].set_string("rectilinear");
    cset["values/x"].set_slice(&[0.0f64, 1.0, 2.0]);
    cset["values/y"].set_slice(&[0.0f64, 1.0]);
    cset["values/z"].set_slice(&[0.0f64, 1.0]);
    let explicit = coordset::rectilinear::to_explicit(&cset).unwrap();

    let mut topo = Node::new();
    topo["type"].set_string("structured");
    topo["coordset"].set_string("coords");
    topo["elements/dims/i"].set(2i64);
    topo["elements/dims/j"].set(1i64);
    topo["elements/dims/k"].set(1i64);

    let (dest, _) = topology::structured::to_unstructured(&topo, &explicit, "coords").unwrap();
    assert_eq!(dest["elements/shape"].as_str().unwrap(), "hex");
    let conn = dest["elements/connectivity"].to_vec::<i64>().unwrap();
    assert_eq!(conn.len(), 16);
    // first hex of the 2x1x1 grid over the 3x2x2 lattice
    assert_eq!(&conn[..8], &[0, 1, 4, 3, 6, 7, 10, 9]);
}
