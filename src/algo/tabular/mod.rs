pub mod policy;
pub mod q_table;
pub mod snapshot;
pub mod table;

pub use policy::Policy;
pub use q_table::{EpisodeSummary, QTableAgent, QTableAgentConfig, Rollout};
pub use snapshot::{Snapshot, SnapshotStore};
pub use table::{QTable, TableSummary};
