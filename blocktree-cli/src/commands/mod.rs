//! Command handlers

pub mod reverse;
pub mod tree;
