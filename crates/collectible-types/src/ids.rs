//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Logical game objects, participants, replicated actions, and sending
//! processes each get their own identifier type so a handle can never be
//! passed where a user is expected. All IDs use UUID v7 (time-ordered).
//!
//! The nil UUID is never produced by `new()`; receivers treat a nil
//! identifier on the wire as malformed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Whether this is the nil UUID (never valid on the wire).
            pub fn is_nil(self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Globally stable handle of a logical game object.
    ///
    /// Independent of any process-local entity index and never reused once
    /// the object it names has been destroyed.
    EntityHandle
}

define_id! {
    /// Identity of a participant, supplied by the identity collaborator.
    UserId
}

define_id! {
    /// Unique identifier of one dispatched action, used to drop redelivery.
    ActionId
}

define_id! {
    /// Identifier of a simulation process (the sender of an action).
    PeerId
}
