//! Groundwork is the platform layer for cooperative, fiber-driven tooling:
//! the handful of operating-system services a build-style orchestrator
//! needs, behind one portable surface.
//!
//! * [`Context`](struct.Context.html) and
//!   [`switch_to_new`](fn.switch_to_new.html), re-exported from the `baton`
//!   crate: symmetric context switches between stackful fibers on one
//!   thread.
//! * [`fs`](fs/index.html): file modification times, temporary directories
//!   with automatic cleanup, recursive deletion.
//! * [`subprocess`](subprocess/index.html): shell commands with their
//!   standard streams redirected to files.
//!
//! The fiber primitives and the services are deliberately independent; it is
//! the orchestration built on top that combines them, e.g. a producer
//! context generating work items that the main context turns into
//! subprocess invocations (see `demos/pipeline.rs`).

pub mod fs;
pub mod subprocess;

pub use baton::{switch_to_new, Context};
