//! R-Tree integration tests.
//!
//! These tests drive the disk-based R-Tree through its public API only,
//! across close and reopen cycles.

mod persistence_test;
mod rtree_test;
