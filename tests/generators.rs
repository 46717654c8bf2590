mod util;
use util::*;

use mesh_blueprint::blueprint::generate::{
    generate_centroids, generate_corners, generate_faces, generate_lines, generate_points,
    generate_sides, generate_sides_with_fields, SideFieldOptions,
};
use mesh_blueprint::blueprint::o2m::O2MIndex;
use mesh_blueprint::prelude::*;

#[test]
fn points_lines_faces_pass_through_the_cascade() {
    let mesh = single_hex_mesh();
    let topo = &mesh["topologies/mesh"];
    let cset = &mesh["coordsets/coords"];

    let (points, _, _) = generate_points(topo, cset).unwrap();
    assert_eq!(points["elements/shape"].as_str().unwrap(), "point");
    assert_eq!(points["elements/connectivity"].dtype().num_elements(), 8);

    let (lines, _, _) = generate_lines(topo, cset).unwrap();
    assert_eq!(lines["elements/shape"].as_str().unwrap(), "line");
    assert_eq!(lines["elements/connectivity"].dtype().num_elements(), 24);

    let (faces, s2d, d2s) = generate_faces(topo, cset).unwrap();
    assert_eq!(faces["elements/shape"].as_str().unwrap(), "quad");
    assert_eq!(faces["elements/connectivity"].dtype().num_elements(), 24);
    assert_eq!(s2d["sizes"].to_vec::<i64>().unwrap(), vec![6]);
    assert_eq!(d2s["sizes"].to_vec::<i64>().unwrap(), vec![1; 6]);
    assert_verifies("topology", &faces);
}

#[test]
fn centroids_average_cell_vertices() {
    let mesh = unstructured_quad_grid(2, 2);
    let (topo, cset, s2d, d2s) = generate_centroids(
        &mesh["topologies/mesh"],
        &mesh["coordsets/coords"],
        "cent_coords",
    )
    .unwrap();
    assert_eq!(topo["elements/shape"].as_str().unwrap(), "point");
    assert_eq!(
        cset["values/x"].to_vec::<f64>().unwrap(),
        vec![0.5, 1.5, 0.5, 1.5]
    );
    assert_eq!(
        cset["values/y"].to_vec::<f64>().unwrap(),
        vec![0.5, 0.5, 1.5, 1.5]
    );
    // identity 1:1 maps in both directions
    assert_eq!(s2d["values"].to_vec::<i64>().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(d2s["values"].to_vec::<i64>().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(s2d["sizes"].to_vec::<i64>().unwrap(), vec![1; 4]);
}

#[test]
fn sides_subdivide_quads_into_triangles() {
    let mesh = unstructured_quad_grid(2, 2);
    let (topo, cset, s2d, d2s) = generate_sides(
        &mesh["topologies/mesh"],
        &mesh["coordsets/coords"],
        "side_coords",
    )
    .unwrap();

    assert_eq!(topo["elements/shape"].as_str().unwrap(), "tri");
    // four quads, four sides each
    assert_eq!(topo["elements/connectivity"].dtype().num_elements(), 16 * 3);
    // 9 original vertices + 4 centroids
    assert_eq!(cset["values/x"].dtype().num_elements(), 13);
    assert_verifies("topology", &topo);
    assert_verifies("coordset", &cset);

    assert_eq!(s2d["sizes"].to_vec::<i64>().unwrap(), vec![4; 4]);
    let parents = d2s["values"].to_vec::<i64>().unwrap();
    assert_eq!(parents.len(), 16);
    for (s, &p) in parents.iter().enumerate() {
        assert_eq!(p, (s / 4) as i64, "sides come out grouped by parent");
    }
}

#[test]
fn sides_map_vertex_field_onto_new_vertices() {
    // 2x2 quad grid with f = 1..9 on the vertices
    let mut mesh = unstructured_quad_grid(2, 2);
    mesh["fields/f/association"].set_string("vertex");
    mesh["fields/f/topology"].set_string("mesh");
    mesh["fields/f/values"].set_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);

    generate_sides_with_fields(
        &mut mesh,
        "mesh",
        "sides",
        "side_coords",
        &SideFieldOptions::default(),
    )
    .unwrap();
    assert_verifies("mesh", &mesh);

    let vert_ids = mesh["fields/original_vertex_ids/values"].to_vec::<i64>().unwrap();
    let expected: Vec<i64> = (0..9).chain([-1, -1, -1, -1]).collect();
    assert_eq!(vert_ids, expected);

    let elem_ids = mesh["fields/original_element_ids/values"].to_vec::<i64>().unwrap();
    assert_eq!(elem_ids, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);

    // each centroid receives the mean of its quad's corner values
    let f = mesh["fields/f/values"].to_vec::<f64>().unwrap();
    assert_eq!(&f[..9], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    // quad 0 = verts {0,1,4,3} -> (1+2+5+4)/4
    assert_eq!(f[9], 3.0);
    // quad 1 = verts {1,2,5,4} -> (2+3+6+5)/4
    assert_eq!(f[10], 4.0);
    // quad 2 = verts {3,4,7,6} -> (4+5+8+7)/4
    assert_eq!(f[11], 6.0);
    // quad 3 = verts {4,5,8,7} -> (5+6+9+8)/4
    assert_eq!(f[12], 7.0);
}

#[test]
fn sides_volume_dependent_field_partitions_parent_value() {
    let mut mesh = unstructured_quad_grid(2, 2);
    mesh["fields/mass/association"].set_string("element");
    mesh["fields/mass/topology"].set_string("mesh");
    mesh["fields/mass/volume_dependent"].set_string("true");
    mesh["fields/mass/values"].set_slice(&[8.0f64, 12.0, 16.0, 20.0]);

    generate_sides_with_fields(
        &mut mesh,
        "mesh",
        "sides",
        "side_coords",
        &SideFieldOptions::default(),
    )
    .unwrap();

    let mapped = mesh["fields/mass/values"].to_vec::<f64>().unwrap();
    assert_eq!(mapped.len(), 16);
    // the sum over a parent's sides recovers the parent value
    for (cell, want) in [8.0, 12.0, 16.0, 20.0].iter().enumerate() {
        let sum: f64 = mapped[cell * 4..(cell + 1) * 4].iter().sum();
        assert!(
            ((sum - want) / want).abs() < 1e-9,
            "cell {cell}: {sum} != {want}"
        );
    }
    // unit quads split into four equal triangles
    assert!((mapped[0] - 2.0).abs() < 1e-12);

    // the volume field accompanies volume-dependent mapping
    let vols = mesh["fields/volume/values"].to_vec::<f64>().unwrap();
    assert_eq!(vols.len(), 16);
    assert!(vols.iter().all(|&v| (v - 0.25).abs() < 1e-12));
}

#[test]
fn element_field_copies_to_every_side() {
    let mut mesh = unstructured_quad_grid(2, 1);
    mesh["fields/mat/association"].set_string("element");
    mesh["fields/mat/topology"].set_string("mesh");
    mesh["fields/mat/values"].set_slice(&[3.0f64, 7.0]);

    generate_sides_with_fields(
        &mut mesh,
        "mesh",
        "sides",
        "side_coords",
        &SideFieldOptions::default(),
    )
    .unwrap();

    let mapped = mesh["fields/mat/values"].to_vec::<f64>().unwrap();
    assert_eq!(mapped, vec![3.0, 3.0, 3.0, 3.0, 7.0, 7.0, 7.0, 7.0]);
    // no volume field without a volume-dependent input
    assert!(!mesh["fields"].has_child("volume"));
}

#[test]
fn hex_sides_are_24_tets() {
    let mesh = single_hex_mesh();
    let (topo, cset, _, d2s) = generate_sides(
        &mesh["topologies/mesh"],
        &mesh["coordsets/coords"],
        "side_coords",
    )
    .unwrap();
    assert_eq!(topo["elements/shape"].as_str().unwrap(), "tet");
    // 6 faces x 4 edges each
    assert_eq!(topo["elements/connectivity"].dtype().num_elements(), 24 * 4);
    // 8 originals + 6 face centers + 1 cell center
    assert_eq!(cset["values/x"].dtype().num_elements(), 15);
    assert_eq!(d2s["values"].to_vec::<i64>().unwrap(), vec![0; 24]);
}

#[test]
fn quad_corners_are_one_per_cell_vertex() {
    let mesh = unstructured_quad_grid(2, 2);
    let (topo, cset, s2d, _) = generate_corners(
        &mesh["topologies/mesh"],
        &mesh["coordsets/coords"],
        "corner_coords",
    )
    .unwrap();
    assert_eq!(topo["elements/shape"].as_str().unwrap(), "polygonal");
    assert_eq!(topo["elements/sizes"].to_vec::<i64>().unwrap(), vec![4; 16]);
    // 9 originals + 12 edge midpoints + 4 cell centers
    assert_eq!(cset["values/x"].dtype().num_elements(), 25);
    assert_eq!(s2d["sizes"].to_vec::<i64>().unwrap(), vec![4; 4]);
    assert_verifies("topology", &topo);
}

#[test]
fn hex_corners_form_the_median_dual() {
    let mesh = single_hex_mesh();
    let (topo, cset, s2d, d2s) = generate_corners(
        &mesh["topologies/mesh"],
        &mesh["coordsets/coords"],
        "corner_coords",
    )
    .unwrap();
    assert_eq!(topo["elements/shape"].as_str().unwrap(), "polyhedral");
    // one corner per (cell, vertex)
    assert_eq!(topo["elements/sizes"].dtype().num_elements(), 8);
    // each hex corner is a hexahedron: 3 boundary + 3 interior quads
    assert_eq!(topo["elements/sizes"].to_vec::<i64>().unwrap(), vec![6; 8]);
    // 8 originals + 12 edge mids + 6 face centers + 1 cell center
    assert_eq!(cset["values/x"].dtype().num_elements(), 27);
    assert_verifies("topology", &topo);

    assert_eq!(s2d["sizes"].to_vec::<i64>().unwrap(), vec![8]);
    assert_eq!(d2s["values"].to_vec::<i64>().unwrap(), vec![0; 8]);

    // interior faces are shared between corners: 6*8 slots / shared faces
    let sub_sizes = topo["subelements/sizes"].to_vec::<i64>().unwrap();
    assert!(sub_sizes.iter().all(|&s| s == 4));
    let idx = O2MIndex::from_node(topo.fetch("elements").unwrap(), "connectivity", 0).unwrap();
    assert_eq!(idx.total_many(), 48);
    // 24 boundary quads (unique per corner) + 12 interior quads (shared
    // pairwise) = 36 distinct faces
    assert_eq!(sub_sizes.len(), 36);
}
