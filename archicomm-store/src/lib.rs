//! Normalized in-memory entity store for the ArchiComm canvas.
//!
//! Holds the diagram's components, connections and annotations as id-keyed
//! tables plus derived secondary indices, and checks the store's invariants.
//!
//! # Architecture
//!
//! - Every table and index sits behind its own `Arc`. Mutations take `&self`
//!   and return a new [`NormalizedState`]; only the tables and indices a
//!   mutation touches are copied, everything else is shared with the
//!   previous version.
//! - Secondary indices are maintained incrementally: an update removes the
//!   id from its old bucket and inserts it into the new one.
//! - Nothing here returns `Err` across the public boundary. Structural
//!   problems (missing ids, duplicates, dangling references) are logged with
//!   `tracing` and reported as [`StoreIssue`]s on the result.
//!
//! # Modules
//!
//! - [`config`]: StoreConfig and the dangling-connection policy
//! - [`error`]: StoreIssue diagnostics
//! - [`index`]: bucket and spatial-grid indices
//! - [`state`]: NormalizedState and mutation results
//! - [`normalize`]: snapshot to state and back
//! - [`mutation`]: add/update/remove/batch operations
//! - [`query`]: read-side lookups
//! - [`integrity`]: the integrity validator

pub mod config;
pub mod error;
pub mod index;
pub mod integrity;
pub mod mutation;
pub mod normalize;
pub mod query;
pub mod state;
mod table;

pub use config::{DanglingPolicy, StoreConfig};
pub use error::{Endpoint, StoreIssue};
pub use index::{BucketIndex, GridCell, SpatialGrid};
pub use integrity::{validate_integrity, IntegrityError, IntegrityReport};
pub use normalize::{denormalize, normalize, Normalized};
pub use query::ComponentConnections;
pub use state::{MutationResult, NormalizedState, Outcome};
pub use table::EntityTable;
