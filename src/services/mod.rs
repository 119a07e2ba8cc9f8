//! Host services wiring the scene core to its collaborators.
//!
//! ARCHITECTURE
//! ============
//! `session` owns the single-writer actor; `feed` and `auth` are the
//! realtime and identity adapters it executes actions against. The
//! persistent store lives in `crate::store`.

pub mod auth;
pub mod feed;
pub mod session;
