mod util;

use mesh_blueprint::node::{DTypeId, DataType, Node, Schema};
use proptest::prelude::*;

#[test]
fn scalar_accessor_coerces_to_every_arithmetic_type() {
    let mut n = Node::new();
    n.set(10i8);

    assert_eq!(n.accessor::<i8>().unwrap().at(0), 10i8);
    assert_eq!(n.accessor::<i16>().unwrap().at(0), 10i16);
    assert_eq!(n.accessor::<i32>().unwrap().at(0), 10i32);
    assert_eq!(n.accessor::<i64>().unwrap().at(0), 10i64);
    assert_eq!(n.accessor::<u8>().unwrap().at(0), 10u8);
    assert_eq!(n.accessor::<u16>().unwrap().at(0), 10u16);
    assert_eq!(n.accessor::<u32>().unwrap().at(0), 10u32);
    assert_eq!(n.accessor::<u64>().unwrap().at(0), 10u64);
    assert_eq!(n.accessor::<f32>().unwrap().at(0), 10f32);
    assert_eq!(n.accessor::<f64>().unwrap().at(0), 10f64);
}

#[test]
fn scalar_accessor_from_every_source_kind() {
    macro_rules! check {
        ($($set:expr),*) => {
            $(
                let mut n = Node::new();
                n.set($set);
                assert_eq!(n.accessor::<i64>().unwrap().at(0), 10i64);
                assert_eq!(n.accessor::<f64>().unwrap().at(0), 10f64);
            )*
        };
    }
    check!(10i8, 10i16, 10i32, 10i64, 10u8, 10u16, 10u32, 10u64, 10f32, 10f64);
}

#[test]
fn set_get_round_trips_arrays() {
    let mut n = Node::new();
    let vals = [-3i32, 0, 7, i32::MAX, i32::MIN];
    n.set_slice(&vals);
    assert_eq!(n.as_slice::<i32>().unwrap(), &vals);
    assert_eq!(n.dtype().id(), DTypeId::Int32);
    assert_eq!(n.dtype().num_elements(), 5);

    let fvals = [0.25f64, -1.5, 1e300];
    n.set_slice(&fvals);
    assert_eq!(n.as_slice::<f64>().unwrap(), &fvals);
}

#[test]
fn external_alias_reads_caller_writes() {
    let mut buf = [1u32, 2, 3, 4];
    let mut n = Node::new();
    n.set_external(&mut buf);
    buf[2] = 33;
    assert_eq!(n.accessor::<u32>().unwrap().at(2), 33);

    // a subsequent owned set severs the alias
    n.set_slice(&[9u32, 9, 9, 9]);
    buf[0] = 77;
    assert_eq!(n.accessor::<u32>().unwrap().at(0), 9);
}

#[test]
fn schema_total_matches_owned_buffer() {
    let mut s = Schema::object();
    s.add_field("conn", Schema::leaf(DataType::int32(12))).unwrap();
    s.add_field("coords", Schema::leaf(DataType::float64(9))).unwrap();
    s.add_field("tag", Schema::leaf(DataType::uint8(3))).unwrap();

    let mut n = Node::new();
    n.init_from_schema(&s);
    assert!(n.is_owned());
    assert_eq!(n.buffer_bytes(), s.total_strided_bytes());
    assert_eq!(s.total_strided_bytes(), 12 * 4 + 9 * 8 + 3);
    assert_eq!(s.number_of_leaves(), 3);
}

#[test]
fn to_data_type_converts_every_leaf() {
    let mut n = Node::new();
    n["a"].set_slice(&[1i8, 2, 3]);
    n["b/c"].set_slice(&[4u16, 5]);
    let c = n.to_data_type(DTypeId::Int64).unwrap();
    assert_eq!(c["a"].as_slice::<i64>().unwrap(), &[1, 2, 3]);
    assert_eq!(c["b/c"].as_slice::<i64>().unwrap(), &[4, 5]);
    // conversion never changes structure
    assert_eq!(c.child_names(), n.child_names());
}

#[test]
fn diff_reports_and_is_symmetric() {
    let mut a = Node::new();
    a["x"].set_slice(&[1.0f64, 2.0, 3.0]);
    a["tag"].set_string("left");
    let mut b = a.clone();
    b["x"].set_slice(&[1.0f64, 2.5, 3.0]);

    let mut info = Node::new();
    assert!(a.diff(&b, &mut info, 1e-12));
    assert!(info.has_child("children"));
    assert_eq!(a.diff(&b, &mut info, 1e-12), b.diff(&a, &mut info, 1e-12));
    assert!(!a.diff(&b, &mut info, 1.0), "tolerance should absorb 0.5");
    assert!(!a.diff(&a.clone(), &mut info, 0.0));
}

#[test]
fn canonical_text_round_trip_is_lossless() {
    let mesh = util::unstructured_quad_grid(2, 2);
    let parsed = Node::parse(&mesh.to_text()).unwrap();
    let mut info = Node::new();
    assert!(!mesh.diff(&parsed, &mut info, 0.0), "{}", info.to_text());
}

#[test]
fn compact_packs_strided_views() {
    let mut buf = [0u8; 24];
    for (k, v) in [5i32, 6, 7].iter().enumerate() {
        buf[k * 8..k * 8 + 4].copy_from_slice(&v.to_le_bytes());
    }
    let mut n = Node::new();
    // strided external view: one live i32 every 8 bytes
    unsafe {
        n.set_external_raw(
            buf.as_mut_ptr(),
            buf.len(),
            DataType::with_layout(
                DTypeId::Int32,
                3,
                0,
                8,
                mesh_blueprint::node::Endianness::Little,
            ),
        );
    }
    assert!(!n.is_compact());
    n.compact();
    assert!(n.is_compact());
    assert!(n.is_owned());
    assert_eq!(n.as_slice::<i32>().unwrap(), &[5, 6, 7]);
}

#[test]
#[should_panic(expected = "fatal")]
fn const_fetch_of_missing_path_is_fatal() {
    let mut n = Node::new();
    n["a"].set(1i64);
    let _ = &n["a/b/c"];
}

proptest! {
    #[test]
    fn accessor_round_trips_exactly_representable_values(v in -1000i32..1000) {
        let mut n = Node::new();
        n.set(v);
        prop_assert_eq!(n.accessor::<i64>().unwrap().at(0), v as i64);
        prop_assert_eq!(n.accessor::<f64>().unwrap().at(0), v as f64);
        prop_assert_eq!(n.accessor::<i16>().unwrap().at(0), v as i16);
    }

    #[test]
    fn diff_of_identical_slices_is_false(vals in proptest::collection::vec(-1e6f64..1e6, 0..32)) {
        let mut a = Node::new();
        a.set_slice(&vals);
        let b = a.clone();
        let mut info = Node::new();
        prop_assert!(!a.diff(&b, &mut info, 0.0));
    }

    #[test]
    fn set_get_round_trip_u16(vals in proptest::collection::vec(any::<u16>(), 0..64)) {
        let mut n = Node::new();
        n.set_slice(&vals);
        prop_assert_eq!(n.as_slice::<u16>().unwrap(), vals.as_slice());
    }
}
