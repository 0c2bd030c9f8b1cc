//! Integration tests for sqlwarden.

pub mod fixture;
pub mod guard_test;
pub mod pipeline_test;
pub mod schema_test;
