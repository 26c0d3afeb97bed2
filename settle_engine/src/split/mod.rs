//! Bill splitting.
//!
//! Three policies partition a bill among its participants: [`equal`], [`custom`] and [`by_items`]. All three are pure
//! functions of the bill (and its items) and the caller's input. None of them writes anything back.
//!
//! Every accepted split satisfies `Σ amount == bill.total_amount` to the cent. Rounding happens once per value, when
//! it is placed into a [`PersonSplit`], and any residual cent is absorbed by the last participant.
mod engine;
mod errors;
mod split_objects;

pub use engine::{by_items, custom, equal, split, MAX_PEOPLE};
pub use errors::SplitError;
pub use split_objects::{PersonSplit, SplitMethod, SplitRequest, SplitResult};
