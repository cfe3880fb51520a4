//! Host event adapter for Plotkeep.
//!
//! The host runtime delivers connect, disconnect and interaction events
//! from its own threads. This crate funnels them through one dispatcher
//! task (actor model) that owns the identity cache:
//!
//! - connect → [`PlayerIdentityCache::connect`](plotkeep_session::PlayerIdentityCache::connect)
//! - disconnect → [`end_session`](plotkeep_session::PlayerIdentityCache::end_session),
//!   exactly once per notification
//! - interaction → a [`Check`] answered with a [`Decision`]
//!
//! A failed check is a deny, never an error that could take the event
//! loop down.
//!
//! # Key types
//!
//! - [`DispatcherHandle`]: cheap, cloneable sender side used by the host
//! - [`spawn_dispatcher`]: starts the dispatcher task
//! - [`DispatcherConfig`]: channel sizing

mod check;
mod config;
mod dispatcher;
mod error;

pub use check::{Check, Decision};
pub use config::DispatcherConfig;
pub use dispatcher::{DispatcherHandle, spawn_dispatcher};
pub use error::EventError;
