//! Persistent storage for daily weather rollups.

pub mod rollup_store;

pub use rollup_store::{RollupStore, SqliteRollupStore, StoreError};
