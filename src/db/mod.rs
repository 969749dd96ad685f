// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export pool management components

pub mod pool;

pub use pool::{Database, PoolManager, PoolStats};
