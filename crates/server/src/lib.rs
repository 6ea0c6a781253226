//! HTTP server for AeroGuard job dispatch.
//!
//! Exposes job submission, status polling, status writes and broker push
//! deliveries under `/api/v1`, on top of `aeroguard-core`.

pub mod api;
pub mod metrics;
pub mod state;
