//! # Stagehand Testkit
//!
//! Testing utilities for Stagehand.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: snapshot pairs with the exact calls their diff must produce
//! - **Generators**: Proptest strategies for well-formed snapshots of every resource type
//! - **Fixtures**: record builders and a store/session fixture
//!
//! ## Golden Vectors
//!
//! ```rust
//! use stagehand_testkit::vectors::{all_vectors, run_vector};
//!
//! for vector in all_vectors() {
//!     assert_eq!(run_vector(&vector).unwrap(), vector.expected, "{}", vector.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use stagehand_core::{adapter_for, AdapterOptions};
//! use stagehand_sync::verify_convergence;
//! use stagehand_testkit::generators::snapshot_pair;
//!
//! proptest! {
//!     #[test]
//!     fn diff_converges((kind, a, b) in snapshot_pair()) {
//!         let adapter = adapter_for(kind, &AdapterOptions::default());
//!         prop_assert!(verify_convergence(adapter.as_ref(), &a, &b).unwrap().is_converged());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use stagehand_testkit::fixtures::TestFixture;
//! use stagehand_sync::Settings;
//!
//! let fixture = TestFixture::populated();
//! let model = fixture.bootstrap_model(&Settings::default()).unwrap();
//! assert!(model.ready);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{control, group, participant, scene, world, TestFixture};
pub use generators::{snapshot, snapshot_pair};
pub use vectors::{all_vectors, run_vector, verify_all_vectors, DiffVector};
