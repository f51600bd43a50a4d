// src/core/mod.rs

pub mod alias_expander;
pub mod arg_classifier;
pub mod commons;
pub mod config_loader;
pub mod flag_registry;
pub mod image_name;
pub mod paths;
pub mod refresh_gate;
pub mod version;
