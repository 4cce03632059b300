//! Verification helpers for `widget-index`.
//!
//! Test-only: walks a chain through its public API and reports the first
//! broken invariant, and provides `TestTree`, a reference `WidgetTree`.

pub mod check;
pub mod fixture;

pub use check::{Violation, compare, fingerprint, positions, verify, verify_structure};
pub use fixture::{NodeId, TestNode, TestTree};
