//! Wire protocol: items, frames, and the argument stack (§3, §4.2-§4.4).

pub mod frame;
pub mod item;
pub mod stack;

pub use frame::{Frame, FrameDecoder, HeaderKind};
pub use item::Item;
pub use stack::ArgStack;
