//! Shared type definitions for replicated collectibles.
//!
//! This crate is the wire-visible vocabulary exchanged between simulation
//! processes: identifiers, the fixed colour set, transforms, the two
//! action kinds, and the envelope codec. Types flow to `TypeScript` via
//! `ts-rs` for tooling that inspects the action stream.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers (`EntityHandle`, `UserId`, ...)
//! - [`enums`] -- `ItemColor` and `ActionKind`
//! - [`transform`] -- `Position` and `Rotation` wire structs
//! - [`actions`] -- `SpawnAction`, `DestroyAction`, `Action`, `ActionEnvelope`
//! - [`wire`] -- JSON frame encoding and decoding

pub mod actions;
pub mod enums;
pub mod ids;
pub mod transform;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, ActionEnvelope, DestroyAction, SpawnAction};
pub use enums::{ActionKind, ItemColor};
pub use ids::{ActionId, EntityHandle, PeerId, UserId};
pub use transform::{Position, Rotation};
pub use wire::{WireError, decode, encode};
