//! Communication abstraction for the partitioning driver.
//!
//! The driver needs exactly two collectives from its transport: rank/size
//! queries and an element-wise max all-reduce over `u64` vectors. Backends:
//! [`SerialComm`] (always available), [`LocalComm`] (in-process ranks that
//! rendezvous through shared state, for tests and examples), and
//! [`MpiComm`] behind the `mpi-support` feature.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::BlueprintError;

/// Minimal collective interface consumed by the partitioning driver.
pub trait Communicator {
    /// Rank of this worker (0..size-1).
    fn rank(&self) -> usize;

    /// Total number of workers.
    fn size(&self) -> usize;

    /// Element-wise max reduction; every rank receives the result.
    /// `local` and `global` must have equal lengths on every rank.
    fn max_all_reduce_u64(&self, local: &[u64], global: &mut [u64])
        -> Result<(), BlueprintError>;

    /// Synchronization barrier (no-op for single-rank backends).
    fn barrier(&self) {}
}

/// Single-rank communicator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn max_all_reduce_u64(
        &self,
        local: &[u64],
        global: &mut [u64],
    ) -> Result<(), BlueprintError> {
        if local.len() != global.len() {
            return Err(BlueprintError::Comm(format!(
                "reduce length mismatch: {} vs {}",
                local.len(),
                global.len()
            )));
        }
        global.copy_from_slice(local);
        Ok(())
    }
}

struct LocalWorld {
    size: usize,
    state: Mutex<ReduceRound>,
    cv: Condvar,
}

#[derive(Default)]
struct ReduceRound {
    acc: Vec<u64>,
    arrived: usize,
    departed: usize,
    result: Option<Vec<u64>>,
}

/// In-process multi-rank communicator: `LocalComm::world(n)` hands out one
/// handle per rank; collectives rendezvous through shared state. Useful
/// for driving the partitioner from threads in tests and examples.
#[derive(Clone)]
pub struct LocalComm {
    rank: usize,
    world: Arc<LocalWorld>,
}

impl LocalComm {
    /// Create handles for `size` ranks sharing one world.
    pub fn world(size: usize) -> Vec<LocalComm> {
        let world = Arc::new(LocalWorld {
            size,
            state: Mutex::new(ReduceRound::default()),
            cv: Condvar::new(),
        });
        (0..size)
            .map(|rank| LocalComm { rank, world: Arc::clone(&world) })
            .collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.world.size
    }

    fn max_all_reduce_u64(
        &self,
        local: &[u64],
        global: &mut [u64],
    ) -> Result<(), BlueprintError> {
        if local.len() != global.len() {
            return Err(BlueprintError::Comm(format!(
                "reduce length mismatch: {} vs {}",
                local.len(),
                global.len()
            )));
        }
        let n = self.world.size;
        if n == 1 {
            global.copy_from_slice(local);
            return Ok(());
        }

        let mut st = self.world.state.lock();
        // wait until the previous round has fully drained
        while st.result.is_some() {
            self.world.cv.wait(&mut st);
        }

        if st.acc.is_empty() {
            st.acc = local.to_vec();
        } else {
            if st.acc.len() != local.len() {
                return Err(BlueprintError::Comm(
                    "ranks disagree on reduce length".into(),
                ));
            }
            for (a, &l) in st.acc.iter_mut().zip(local) {
                *a = (*a).max(l);
            }
        }
        st.arrived += 1;

        if st.arrived == n {
            st.result = Some(std::mem::take(&mut st.acc));
            st.arrived = 0;
            self.world.cv.notify_all();
        } else {
            while st.result.is_none() {
                self.world.cv.wait(&mut st);
            }
        }

        let result = st
            .result
            .as_ref()
            .ok_or_else(|| BlueprintError::Comm("reduce round lost its result".into()))?;
        global.copy_from_slice(result);

        st.departed += 1;
        if st.departed == n {
            st.result = None;
            st.departed = 0;
            self.world.cv.notify_all();
        }
        Ok(())
    }

    fn barrier(&self) {
        let zero = [0u64];
        let mut out = [0u64];
        // a reduce is a barrier
        let _ = self.max_all_reduce_u64(&zero, &mut out);
    }
}

/// MPI-backed communicator.
#[cfg(feature = "mpi-support")]
pub struct MpiComm {
    comm: mpi::topology::SimpleCommunicator,
}

#[cfg(feature = "mpi-support")]
impl MpiComm {
    pub fn new(comm: mpi::topology::SimpleCommunicator) -> Self {
        MpiComm { comm }
    }

    pub fn raw(&self) -> &mpi::topology::SimpleCommunicator {
        &self.comm
    }
}

#[cfg(feature = "mpi-support")]
impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        use mpi::topology::Communicator as _;
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        use mpi::topology::Communicator as _;
        self.comm.size() as usize
    }

    fn max_all_reduce_u64(
        &self,
        local: &[u64],
        global: &mut [u64],
    ) -> Result<(), BlueprintError> {
        use mpi::collective::SystemOperation;
        use mpi::traits::*;
        if local.len() != global.len() {
            return Err(BlueprintError::Comm(format!(
                "reduce length mismatch: {} vs {}",
                local.len(),
                global.len()
            )));
        }
        self.comm
            .all_reduce_into(local, global, SystemOperation::max());
        Ok(())
    }

    fn barrier(&self) {
        use mpi::traits::*;
        self.comm.barrier();
    }
}
