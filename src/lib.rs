//! gofix applies `//go:fix inline` directives across a Go module.
//!
//! The [`loader`] reads and type-checks the packages of a module, the
//! [`analysis`] pass finds inlinable functions, constants and type aliases
//! and proposes fixes for their uses, and the [`driver`] runs the pass over
//! every package in dependency order and applies the fixes.

pub mod analysis;
pub mod driver;
pub mod loader;
