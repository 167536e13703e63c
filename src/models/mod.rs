//! Domain models for inbound items and canonical task records.

pub mod inbound;
pub mod task;
