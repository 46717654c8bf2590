//! # mesh-blueprint
//!
//! mesh-blueprint is a Rust library for describing, validating, and
//! transforming hierarchical scientific-simulation data: multi-domain
//! computational meshes and their attached fields. It provides a
//! self-describing in-memory tree (the [`Node`](node::Node)) whose leaves
//! are typed numeric arrays or scalars, and a conventions layer (the mesh
//! blueprint) that defines what shape such a tree must have to represent a
//! mesh of a given flavor.
//!
//! ## Features
//! - Typed node trees with owned, external (zero-copy) and interior data
//!   states, strided coercing accessors, lossless numeric conversion,
//!   diffing, and a canonical textual form
//! - Blueprint verification for coordsets, topologies, matsets, specsets,
//!   fields, adjsets, nestsets, and mesh indices
//! - Coordset and topology conversion across the implicit-to-explicit
//!   lattice (uniform, rectilinear, structured, unstructured, polytopal)
//! - Topology metadata: the full dimensional entity cascade with local and
//!   global association maps
//! - Derived topologies: points, lines, faces, centroids, sides, corners,
//!   with field mapping onto generated sides
//! - A distributed partitioning driver that prepares flat dual-mesh arrays
//!   for an external graph partitioner and writes the resulting assignment
//!   back as a field
//!
//! ## Usage
//! Add `mesh-blueprint` as a dependency in your `Cargo.toml` and enable
//! features as needed:
//!
//! ```toml
//! [dependencies]
//! mesh-blueprint = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "parmetis-support"]
//! ```
//!
//! ## Error model
//! Fallible APIs return [`BlueprintError`](error::BlueprintError);
//! `verify` never errors on invalid *input* (it returns `false` plus a
//! diagnostic tree). Contract violations with no return path (indexing a
//! missing path, out-of-range accessor reads) route through the
//! process-wide handler; see [`error::set_error_handler`].

pub mod blueprint;
pub mod error;
pub mod node;
pub mod partitioning;

/// A convenient prelude to import the most-used types & entry points:
pub mod prelude {
    pub use crate::blueprint::{verify, verify_mesh};
    pub use crate::error::{set_error_handler, BlueprintError};
    pub use crate::node::{Accessor, DTypeId, DataType, Endianness, Node, Schema};
    pub use crate::partitioning::comm::{Communicator, SerialComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::partitioning::comm::MpiComm;
    pub use crate::partitioning::{
        generate_global_element_and_vertex_ids, generate_partition_field,
        MeshPartitioner, PartitionFieldOptions,
    };
}
