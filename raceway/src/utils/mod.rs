//! Internal data structures.
//!
//! Provides a [`Slab`] used for fast indexed storage with reuse of freed
//! slots.

mod slab;

pub(crate) use slab::Slab;
