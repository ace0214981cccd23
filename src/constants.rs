//! Engine constants to avoid magic numbers throughout the codebase.

/// Smallest edge length of a cached surface.
/// Very small render targets fall off some drivers' fast paths.
pub const MIN_SURFACE_SIZE: u32 = 257;

/// Scale applied to normalized texture coordinates before packing
/// them into the two 16-bit halves of a vertex UV word.
pub const UV_PACK_SCALE: f32 = 65535.0;

/// Default vertex batch capacity, in quads.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Largest batch that still fits 16-bit indices (4 vertices per quad).
pub const MAX_BATCH_SIZE: usize = 16383;

/// Edge length of the scratch surface used by pixel-exact hit tests.
pub const HIT_TEST_BUFFER_SIZE: u32 = 3;

/// Determinants below this are treated as singular by hit testing.
pub const SINGULAR_EPSILON: f32 = 1e-10;
