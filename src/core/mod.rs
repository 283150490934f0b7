//! core
//!
//! Domain types, configuration, and the contracts shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Status, branch, remote, commit and credential types
//! - [`config`] - Configuration schema and loading
//! - [`state`] - The host state-container contract
//! - [`events`] - Notifications published after state changes
//! - [`ops`] - Single-slot operation lock
//!
//! # Design Principles
//!
//! - Derived state is always written through typed setters, never shared
//! - Absence of a repository or filesystem is a normal state, not an error

pub mod config;
pub mod events;
pub mod ops;
pub mod state;
pub mod types;
