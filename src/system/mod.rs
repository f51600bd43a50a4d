//! # System Interaction Layer
//!
//! This module holds the collaborators the resolution engine talks to, behind narrow
//! traits so that the engine can be exercised without a live runtime.
//!
//! ## Modules
//!
//! - **`parameter_store`**: the remote key-value store (`get(key)`), with an in-memory
//!   implementation and a directory-backed one.
//! - **`registry`**: the image registry/runtime (`get_version`, `pull`), implemented on
//!   top of the `docker` command line.

pub mod parameter_store;
pub mod registry;
