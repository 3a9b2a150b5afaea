pub mod access;
pub mod config;
pub mod documents;
pub mod error;
pub mod guard;
pub mod model;
pub mod naming;
pub mod path;
pub mod service;
pub mod store;
pub mod tree;

pub use error::{HierarchyError, Result};
