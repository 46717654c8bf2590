//! External graph-partitioner binding surface.
//!
//! The driver talks to the partitioner through the [`MeshPartitioner`]
//! trait so tests can inject a deterministic stand-in. The real backend is
//! ParMETIS (`ParMETIS_V3_PartMeshKway`) behind the `parmetis-support`
//! feature; `build.rs` generates the bindings and [`Idx`]/[`Real`] inherit
//! the library's compile-time `idx_t`/`real_t` widths. Without the
//! feature, widths are selected by the `parmetis-idx64` cargo feature.

use crate::error::BlueprintError;

#[cfg(feature = "parmetis-support")]
include!("../parmetis_bindings.rs"); // idx_t, real_t, ParMETIS_V3_PartMeshKway

/// Integer width of the external partitioner.
#[cfg(feature = "parmetis-support")]
pub type Idx = idx_t;
#[cfg(all(not(feature = "parmetis-support"), feature = "parmetis-idx64"))]
pub type Idx = i64;
#[cfg(all(not(feature = "parmetis-support"), not(feature = "parmetis-idx64")))]
pub type Idx = i32;

/// Real width of the external partitioner.
#[cfg(feature = "parmetis-support")]
pub type Real = real_t;
#[cfg(all(not(feature = "parmetis-support"), feature = "parmetis-idx64"))]
pub type Real = f64;
#[cfg(all(not(feature = "parmetis-support"), not(feature = "parmetis-idx64")))]
pub type Real = f32;

/// The flat dual-mesh arrays handed to the partitioner.
///
/// `eldist[0..=W]` is the prefix sum of elements per worker, `eptr` the
/// per-element prefix sum of vertex counts, `eind` the global vertex ids
/// in per-element order.
#[derive(Clone, Debug)]
pub struct MeshKwayInput<'a> {
    pub eldist: &'a [Idx],
    pub eptr: &'a [Idx],
    pub eind: &'a [Idx],
    /// Shared vertices that make two elements adjacent.
    pub ncommon_nodes: Idx,
    /// Number of parts requested.
    pub nparts: Idx,
}

/// Seam to the external mesh partitioner.
///
/// Implementations receive the local slice of a distributed dual mesh and
/// return one part id in `[0, nparts)` per local element. The call is
/// collective: every rank of the driver's communicator must enter it.
pub trait MeshPartitioner {
    fn part_mesh_kway(&mut self, input: MeshKwayInput<'_>) -> Result<Vec<Idx>, BlueprintError>;
}

/// ParMETIS-backed partitioner.
#[cfg(feature = "parmetis-support")]
pub struct ParMetisPartitioner {
    comm: crate::partitioning::comm::MpiComm,
}

#[cfg(feature = "parmetis-support")]
impl ParMetisPartitioner {
    pub fn new(comm: crate::partitioning::comm::MpiComm) -> Self {
        ParMetisPartitioner { comm }
    }
}

#[cfg(feature = "parmetis-support")]
impl MeshPartitioner for ParMetisPartitioner {
    fn part_mesh_kway(&mut self, input: MeshKwayInput<'_>) -> Result<Vec<Idx>, BlueprintError> {
        use mpi::traits::AsRaw;

        let local_num_elems = input.eptr.len().saturating_sub(1);
        let mut part = vec![0 as Idx; local_num_elems];

        let mut wgtflag: Idx = 0; // no weights
        let mut numflag: Idx = 0; // C-style numbering
        let mut ncon: Idx = 1; // one constraint per vertex
        let mut ncommonnodes = input.ncommon_nodes;
        let mut nparts = input.nparts;
        // equal target weights per part, 5% imbalance tolerance
        let mut tpwgts = vec![1.0 as Real / nparts as Real; nparts as usize];
        let mut ubvec: Real = 1.05;
        let mut options: [Idx; 3] = [0, 0, 0];
        let mut edgecut: Idx = 0;

        let mut eldist = input.eldist.to_vec();
        let mut eptr = input.eptr.to_vec();
        let mut eind = input.eind.to_vec();
        let mut raw_comm = self.comm.raw().as_raw();

        let ret = unsafe {
            ParMETIS_V3_PartMeshKway(
                eldist.as_mut_ptr(),
                eptr.as_mut_ptr(),
                eind.as_mut_ptr(),
                std::ptr::null_mut(), // elmwgt
                &mut wgtflag,
                &mut numflag,
                &mut ncon,
                &mut ncommonnodes,
                &mut nparts,
                tpwgts.as_mut_ptr(),
                &mut ubvec,
                options.as_mut_ptr(),
                &mut edgecut,
                part.as_mut_ptr(),
                &mut raw_comm as *mut _ as *mut _,
            )
        };
        if ret != 1 {
            return Err(BlueprintError::Partitioner(format!(
                "ParMETIS_V3_PartMeshKway returned {ret}"
            )));
        }
        Ok(part)
    }
}
