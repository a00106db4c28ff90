//! Binder, spawn policy, trigger bridge, and tick loop for replicated
//! collectibles.
//!
//! This crate turns the replicated projections into a running session:
//! the authority decides when to spawn, every participant materializes
//! live items and reports its own collections, and all of them meet only
//! through delivered actions.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `collectible-config.yaml` into
//!   strongly-typed structs.
//! - [`clock`] -- Per-participant tick counter.
//! - [`ports`] -- Collaborator traits: [`IdentityProvider`],
//!   [`ActionChannel`], [`SceneEngine`].
//! - [`binder`] -- [`EntityBinder`], the reactive diff pass from live items
//!   to engine entities.
//! - [`spawn`] -- [`SpawnPolicy`], the authority's per-tick spawn rule.
//! - [`trigger`] -- [`TriggerBridge`], overlap to destroy action.
//! - [`participant`] -- [`Participant`] and its 5-phase tick.
//! - [`runner`] -- [`run_session`] with [`RunControl`].
//! - [`loopback`] -- [`LoopbackHub`], in-process replication.
//! - [`headless`] -- [`HeadlessScene`], in-memory scene engine.
//!
//! [`IdentityProvider`]: ports::IdentityProvider
//! [`ActionChannel`]: ports::ActionChannel
//! [`SceneEngine`]: ports::SceneEngine
//! [`EntityBinder`]: binder::EntityBinder
//! [`SpawnPolicy`]: spawn::SpawnPolicy
//! [`TriggerBridge`]: trigger::TriggerBridge
//! [`Participant`]: participant::Participant
//! [`run_session`]: runner::run_session
//! [`RunControl`]: runner::RunControl
//! [`LoopbackHub`]: loopback::LoopbackHub
//! [`HeadlessScene`]: headless::HeadlessScene

pub mod binder;
pub mod clock;
pub mod config;
pub mod headless;
pub mod loopback;
pub mod participant;
pub mod ports;
pub mod runner;
pub mod spawn;
pub mod trigger;
