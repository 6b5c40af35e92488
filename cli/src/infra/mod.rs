//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: the Cloud API client, key
//! generation, the `ssh` process driver, TCP probing and config loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod hcloud;
pub mod keys;
pub mod network;
pub mod ssh;
