// src/config/mod.rs
// DOCUMENTATION: Configuration module organization
// PURPOSE: Re-export configuration components

pub mod resolver;
pub mod settings;

pub use resolver::{mask_sensitive, ConfigResolver, ConfigSource};
pub use settings::{AppSettings, Environment};
