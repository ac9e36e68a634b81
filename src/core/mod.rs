//! Deterministic Primitives
//!
//! Building blocks with no game knowledge:
//!
//! - `fixed`: Q16.16 fixed-point arithmetic and motion constants
//! - `vec2`: fixed-point 2D vector (y-down screen convention)
//! - `hash`: SHA-256 state hashing for replay verification

pub mod fixed;
pub mod hash;
pub mod vec2;

pub use fixed::{Fixed, FIXED_HALF, FIXED_ONE, FIXED_SCALE};
pub use hash::{StateHash, StateHasher};
pub use vec2::FixedVec2;
