//! Synchronization between the application document and the canvas.
//!
//! # Architecture
//!
//! Two containers hold the same diagram in different shapes: the
//! application container keeps the flat design document, the canvas
//! container keeps the normalized editing state. The [`SyncCoordinator`]
//! listens to both and mirrors every change into the other side.
//!
//! Everything runs on one thread. Containers and the coordinator use
//! `Rc`/`RefCell`/`Cell`; no lock is held anywhere, and listeners are
//! invoked only after all borrows are released.
//!
//! ## Components
//!
//! - **Fingerprint**: SHA-256 content digest used to tell whether two
//!   snapshots hold the same diagram
//! - **Container**: state holder with listeners, debounced writes and undo
//! - **Timer queue**: cancellable, caller-driven deferred tasks
//! - **Coordinator**: fingerprint-deduplicated, phase-guarded propagation,
//!   throttled by the stability guard
//! - **Service**: the [`CanvasService`] facade for the editing UI
//!
//! ## Propagation
//!
//! 1. A container commits a change and notifies its listeners
//! 2. If the coordinator is writing into that container, the notification
//!    is its own echo and is dropped
//! 3. Otherwise both sides are fingerprinted; equal fingerprints end here
//! 4. The guard is consulted; a freeze flushes buffers and pauses
//! 5. The change is written into the other side as a silent sync write
//!
//! # Example
//!
//! ```
//! use archicomm_model::{Component, ComponentType, DiagramSnapshot};
//! use archicomm_sync::{CanvasService, SyncConfig};
//!
//! let service = CanvasService::open(SyncConfig::default(), DiagramSnapshot::new());
//! service.add_component(Component::new("api", ComponentType::Server, "API"));
//!
//! assert_eq!(service.document().components.len(), 1);
//! service.destroy();
//! ```

pub mod config;
pub mod container;
pub mod coordinator;
mod driver;
mod error;
pub mod fingerprint;
pub mod service;
pub mod timer;

pub use config::SyncConfig;
pub use container::{
    AppContainer, CanvasContainer, ChangeEvent, Container, Subscription, SyncedState,
    WriteOptions, WriteSource,
};
pub use coordinator::{Side, SyncCoordinator, SyncOutcome, SyncPhase};
pub use driver::{drive_timers, TokioClock};
pub use error::{SyncError, SyncResult};
pub use fingerprint::Fingerprint;
pub use service::{CanvasService, ImportOutcome};
pub use timer::{TimerHandle, TimerQueue};
