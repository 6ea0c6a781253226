//! Dispatch: consume job envelopes, run the optimizer, record the outcome.
//!
//! Deliveries arrive either by pull ([`DispatchRunner`] leasing from a
//! [`JobQueue`](crate::queue::JobQueue)) or by push (the server's push
//! endpoint calling [`DispatchWorker::handle_push`]). Both paths share the
//! same per-delivery rules:
//!
//! 1. Undecodable payloads are acknowledged and dropped.
//! 2. PROCESSING is written; if the job is already terminal the delivery is a
//!    duplicate and the optimizer is not called.
//! 3. The optimizer runs under a timeout; DONE or FAILED is written.
//! 4. The delivery is acknowledged, unless a status write could not reach
//!    the status backend, in which case it is released for redelivery.

mod runner;
mod types;
mod worker;

pub use runner::DispatchRunner;
pub use types::{DeliveryOutcome, RunnerStatus};
pub use worker::DispatchWorker;
