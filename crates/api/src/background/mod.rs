//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn`, plus a `run_once` used by the loop and by
//! tests. All loops accept a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! for graceful shutdown.

pub mod downgrade_sweep;
pub mod generation_sweep;
