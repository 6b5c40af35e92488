//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod action;
pub mod attachment;
pub mod credentials;
pub mod download;
pub mod instance;
pub mod pipeline;
pub mod teardown;
pub mod transfer;
pub mod upload;
