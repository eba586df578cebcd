//! AMP: the self-delimiting, typed-field frame format used on the wire.
//!
//! This module is the engine's one true leaf dependency. Nothing outside of
//! it knows the byte-level field encoding; the rest of the crate only ever
//! calls [`encode`], [`decode_from`], and builds/reads [`Message`]s.

mod codec;
mod field;
mod message;

pub use codec::{decode_from, encode, write_frame};
pub use field::{Field, FieldType};
pub use message::Message;
