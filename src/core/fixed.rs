//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the simulation. All gameplay logic
//! uses integer arithmetic only - floats exist solely at the render/debug
//! boundary.
//!
//! Format: Q16.16 stored in an `i32`. 16 integer bits, 16 fractional bits.
//! Range ±32768 world units, precision 1/65536. A world unit corresponds to
//! one source pixel, so the range covers any realistic level.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// MOTION CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Tick duration: 1/60 second = round(65536/60) = 1092
pub const TICK_DT: Fixed = 1092;

/// Gravity acceleration: 3600.0 units/s^2 (one unit per tick per tick)
pub const GRAVITY: Fixed = 235_929_600;

/// Terminal fall speed: 1200.0 units/s (20 units per tick)
pub const MAX_FALL_SPEED: Fixed = 78_643_200;

/// Jump impulse: 960.0 units/s upward (16 units per tick)
pub const JUMP_IMPULSE: Fixed = 62_914_560;

/// Horizontal knockback speed on a damaging contact: 200.0 units/s
pub const KNOCKBACK_SPEED: Fixed = 13_107_200;

/// Upward knockback lift on a damaging contact: 300.0 units/s
pub const KNOCKBACK_LIFT: Fixed = 19_660_800;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in the tick loop.
///
/// # Example
/// ```
/// use orchard::core::fixed::{to_fixed, FIXED_ONE};
/// const HALF_CELL: i32 = to_fixed(16.0);
/// assert_eq!(HALF_CELL, FIXED_ONE * 16);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert an integer count of world units to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use the result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Multiply two fixed-point numbers.
///
/// Uses an i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts the numerator to maintain precision.
/// Returns 0 on divide-by-zero (deterministic, no panic).
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

// =============================================================================
// TESTS
// =============================================================================
