//! Background Tasks Module
//!
//! Contains the tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Write pipeline: applies queued writes and sweeps expired entries

mod pipeline;

pub(crate) use pipeline::spawn_write_pipeline;
