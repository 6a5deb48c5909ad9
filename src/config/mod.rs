//! Configuration module for Booru-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; missing keys take the documented defaults, and the
//! command line may override any of them before validation.
//!
//! # Example
//!
//! ```no_run
//! use booru_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    limit_from_signed, Config, CrawlerConfig, OutputConfig, SiteConfig, ValidationConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, finalize_config, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
