//! Configuration management for CareLedger
//!
//! Sources are layered with the `config` crate, later sources winning:
//!
//! 1. Built-in defaults (`#[serde(default)]` on every section)
//! 2. A YAML, TOML or JSON file (`careledger.yaml` unless a path is given)
//! 3. Environment variables, `CARELEDGER__<SECTION>__<KEY>`
//!
//! # Example
//!
//! ```rust
//! use config_engine::EngineConfig;
//!
//! let config = EngineConfig::from_yaml("hospital:\n  utc_offset: \"+03:00\"\n").unwrap();
//! assert_eq!(config.hospital.offset().unwrap().local_minus_utc(), 10_800);
//! ```

pub mod engine;
pub mod error;

pub use engine::*;
pub use error::*;
