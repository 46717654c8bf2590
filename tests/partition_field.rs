mod util;

use std::sync::{Arc, Mutex};

use mesh_blueprint::error::BlueprintError;
use mesh_blueprint::partitioning::comm::{Communicator, LocalComm};
use mesh_blueprint::prelude::*;
use mesh_blueprint::partitioning::{Idx, MeshKwayInput};

/// Deterministic stand-in for the external partitioner: part = global
/// element id modulo nparts.
struct ModuloPartitioner {
    rank: usize,
}

impl MeshPartitioner for ModuloPartitioner {
    fn part_mesh_kway(&mut self, input: MeshKwayInput<'_>) -> Result<Vec<Idx>, BlueprintError> {
        let base = input.eldist[self.rank];
        let n = input.eptr.len() - 1;
        Ok((0..n as Idx).map(|i| (base + i) % input.nparts).collect())
    }
}

fn uniform_quad_domain(nx: i64, ny: i64) -> Node {
    let mut dom = Node::new();
    dom["coordsets/coords/type"].set_string("uniform");
    dom["coordsets/coords/dims/i"].set(nx + 1);
    dom["coordsets/coords/dims/j"].set(ny + 1);
    dom["topologies/mesh/type"].set_string("uniform");
    dom["topologies/mesh/coordset"].set_string("coords");
    dom
}

#[test]
fn two_workers_one_domain_each_four_parts() {
    let comms = LocalComm::world(2);
    let collected: Arc<Mutex<Vec<(usize, Vec<i64>, Vec<i64>)>>> =
        Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = comms
        .into_iter()
        .map(|comm| {
            let collected = Arc::clone(&collected);
            std::thread::spawn(move || {
                let rank = comm.rank();
                let mut mesh = uniform_quad_domain(10, 10);
                let mut partitioner = ModuloPartitioner { rank };
                let options = PartitionFieldOptions {
                    partitions: Some(4),
                    ..Default::default()
                };
                generate_partition_field(&mut mesh, &options, &comm, &mut partitioner)
                    .expect("driver should succeed");

                let parts = mesh["fields/parmetis_result/values"].to_vec::<i64>().unwrap();
                let vert_ids = mesh["fields/global_vertex_ids/values"].to_vec::<i64>().unwrap();
                let ele_ids = mesh["fields/global_element_ids/values"].to_vec::<i64>().unwrap();
                assert_eq!(mesh["fields/parmetis_result/association"].as_str().unwrap(), "element");
                assert_eq!(ele_ids.len(), 100);
                collected.lock().unwrap().push((rank, vert_ids, parts));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut results = Arc::try_unwrap(collected).unwrap().into_inner().unwrap();
    results.sort_by_key(|(rank, _, _)| *rank);
    assert_eq!(results.len(), 2);

    // global vertex ids are disjoint and contiguous across workers
    let (_, v0, p0) = &results[0];
    let (_, v1, p1) = &results[1];
    assert_eq!(v0.len(), 121);
    assert_eq!(v1.len(), 121);
    assert_eq!(*v0.first().unwrap(), 0);
    assert_eq!(*v0.last().unwrap(), 120);
    assert_eq!(*v1.first().unwrap(), 121);
    assert_eq!(*v1.last().unwrap(), 241);

    // each domain holds 100 assignments, all inside [0, 4)
    assert_eq!(p0.len(), 100);
    assert_eq!(p1.len(), 100);
    for &p in p0.iter().chain(p1.iter()) {
        assert!((0..4).contains(&p), "part {p} out of range");
    }

    // concatenation equals the partitioner's output: global id mod 4
    let all: Vec<i64> = p0.iter().chain(p1.iter()).copied().collect();
    assert_eq!(all.len(), 200);
    for (gid, &p) in all.iter().enumerate() {
        assert_eq!(p, (gid % 4) as i64);
    }
}

#[test]
fn options_parse_from_a_node_subtree() {
    let mut options = Node::new();
    options["topology"].set_string("mesh");
    options["field_prefix"].set_string("poly_");
    options["partitions"].set(6i64);
    options["parmetis_ncommonnodes"].set(2i64);
    let parsed = PartitionFieldOptions::from_node(&options).unwrap();
    assert_eq!(parsed.topology.as_deref(), Some("mesh"));
    assert_eq!(parsed.field_prefix, "poly_");
    assert_eq!(parsed.partitions, Some(6 as Idx));
    assert_eq!(parsed.ncommon_nodes, Some(2 as Idx));
}

#[test]
fn field_prefix_lands_on_every_emitted_field() {
    let mut mesh = Node::new();
    *mesh.fetch_mut("domain_000000") = uniform_quad_domain(3, 3);
    let comm = SerialComm;
    let mut partitioner = ModuloPartitioner { rank: 0 };
    let options = PartitionFieldOptions {
        field_prefix: "poly_".into(),
        partitions: Some(2),
        ..Default::default()
    };
    generate_partition_field(&mut mesh, &options, &comm, &mut partitioner).unwrap();

    let fields = &mesh["domain_000000/fields"];
    assert!(fields.has_child("poly_global_vertex_ids"));
    assert!(fields.has_child("poly_global_element_ids"));
    assert!(fields.has_child("poly_parmetis_result"));

    // the augmented domain still verifies as a mesh
    util::assert_verifies("mesh", &mesh["domain_000000"]);
}

#[test]
fn unstructured_domains_flatten_through_the_o2m_iterator() {
    let mut mesh = util::unstructured_quad_grid(3, 2);
    let comm = SerialComm;
    let mut partitioner = ModuloPartitioner { rank: 0 };
    let options = PartitionFieldOptions {
        partitions: Some(3),
        ..Default::default()
    };
    generate_partition_field(&mut mesh, &options, &comm, &mut partitioner).unwrap();
    let parts = mesh["fields/parmetis_result/values"].to_vec::<i64>().unwrap();
    assert_eq!(parts.len(), 6);
    assert!(parts.iter().all(|&p| (0..3).contains(&p)));
}
