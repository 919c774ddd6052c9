//! Bisect-style change selection.
//!
//! A [`Matcher`] is compiled from a pattern such as `"01+10-1001"` and decides,
//! for each 64-bit change id, whether the change is enabled and whether it
//! should be reported. Reported changes are tagged with a [`marker`] that a
//! bisecting driver can find again with [`cut_marker`].

pub mod hash;
pub mod marker;
pub mod matcher;

pub use hash::{Fnv64, hash_str};
pub use marker::{append_marker, cut_marker, marker};
pub use matcher::{Matcher, PatternError};
