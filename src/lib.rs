//! Shelf application library
//!
//! Feature modules plus the bootstrap sequence shared by the `shelf-app`
//! binary and the `shelf` CLI.

pub mod bootstrap;
pub mod modules;
