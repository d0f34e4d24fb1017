//! Built-in content module caches.
//!
//! Thin registry holders wired through the runtime's cache lifecycle. The
//! actual content comes from each module's settings table; these caches own
//! the registries and the cross-module recipe barriers, nothing else.

pub mod blocks;
pub mod crafts;
pub mod decor;
pub mod items;
pub mod players;
