//! Rank/communicator abstraction used by the distributed bootstrap steps.
//!
//! Collectives must be entered by every rank in the same order, exactly as
//! with an MPI communicator. Point-to-point traffic is matched by source and
//! kind so it never overtakes a pending collective.

mod local;

pub use local::{LocalCluster, LocalCommunicator};

use crate::domain::HybridError;

pub type Rank = usize;

pub trait Communicator {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    fn root(&self) -> Rank {
        0
    }

    fn is_root(&self) -> bool {
        self.rank() == self.root()
    }

    /// Non-root ranks receive the root's `values`, resized to match.
    fn broadcast_reals(&self, values: &mut Vec<f64>) -> Result<(), CommError>;

    fn broadcast_counts(&self, values: &mut Vec<u64>) -> Result<(), CommError>;

    /// `None` on non-root ranks.
    fn reduce_sum(&self, value: u64) -> Result<Option<u64>, CommError>;

    fn reduce_max(&self, values: &[f64]) -> Result<Option<Vec<f64>>, CommError>;

    fn send(&self, destination: Rank, values: &[f64]) -> Result<(), CommError>;

    fn receive_any(&self) -> Result<(Rank, Vec<f64>), CommError>;

    fn barrier(&self) -> Result<(), CommError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommError {
    #[error("rank {rank} is outside communicator of size {size}")]
    InvalidRank { rank: Rank, size: usize },
    #[error("rank {peer} is no longer reachable")]
    Disconnected { peer: Rank },
    #[error("expected {expected} payload from rank {peer}")]
    PayloadMismatch { peer: Rank, expected: &'static str },
    #[error("reduction length mismatch: expected {expected} values, rank {peer} sent {actual}")]
    LengthMismatch {
        peer: Rank,
        expected: usize,
        actual: usize,
    },
}

impl From<CommError> for HybridError {
    fn from(error: CommError) -> Self {
        HybridError::protocol("PROTOCOL.COMM", error.to_string())
    }
}
