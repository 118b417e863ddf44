//! Deterministic seeded randomness.
//!
//! Every random choice in the generator is a pure function of an integer seed.
//! There is no shared generator: [`draw`] seeds a fresh `ChaCha8Rng` from its
//! argument and takes a single value, so the order in which draws happen can
//! never change what they return.
//!
//! Sub-seeds are derived per tile and per purpose with [`derive_tile_seed`],
//! which packs the tile coordinates and purpose salt into disjoint bit ranges
//! before multiplying by a large odd constant and avalanching. For a fixed
//! session seed the mapping is injective over the supported tile range, so two
//! tiles (or two purposes within one tile) can never share a stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::tile::MAX_TILE_COORD;

// ---------------------------------------------------------------------------
// Single draws
// ---------------------------------------------------------------------------

/// Draw a uniform `f32` in `[0, 1)` from `seed`.
///
/// Pure and stateless: the result depends only on `seed`.
#[inline]
pub fn draw(seed: u64) -> f32 {
    ChaCha8Rng::seed_from_u64(seed).random::<f32>()
}

/// Draw a uniform `f32` in `[lo, hi)`.
#[inline]
pub fn draw_range(seed: u64, lo: f32, hi: f32) -> f32 {
    lo + draw(seed) * (hi - lo)
}

/// Draw a uniform `f32` in `[-1, 1)`.
#[inline]
pub fn draw_signed(seed: u64) -> f32 {
    draw(seed) * 2.0 - 1.0
}

/// Seeded boolean with probability `p` of being `true`.
#[inline]
pub fn draw_chance(seed: u64, p: f32) -> bool {
    draw(seed) < p
}

/// Seeded index in `0..n`. Returns 0 when `n == 0`.
#[inline]
pub fn draw_index(seed: u64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    ((draw(seed) * n as f32) as usize).min(n - 1)
}

// ---------------------------------------------------------------------------
// Seed streams
// ---------------------------------------------------------------------------

/// Odd stride between consecutive offsets of a [`SeedStream`].
const STREAM_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// A base seed plus deterministic offsets.
///
/// `stream.seed(k)` is `base + k * STREAM_STRIDE`; every draw a caller makes
/// uses its own offset instead of advancing shared state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeedStream(u64);

impl SeedStream {
    /// Wrap a base seed.
    pub const fn new(base: u64) -> Self {
        Self(base)
    }

    /// The base seed.
    pub const fn base(self) -> u64 {
        self.0
    }

    /// The seed used for the draw at `offset`.
    #[inline]
    pub const fn seed(self, offset: u64) -> u64 {
        self.0.wrapping_add(offset.wrapping_mul(STREAM_STRIDE))
    }

    /// Child stream for item `index`, uncorrelated with the parent's offsets.
    #[inline]
    pub const fn fork(self, index: u64) -> Self {
        Self(avalanche(self.seed(index) ^ FORK_SALT))
    }

    /// Uniform `[0, 1)` at `offset`.
    #[inline]
    pub fn unit(self, offset: u64) -> f32 {
        draw(self.seed(offset))
    }

    /// Uniform `[lo, hi)` at `offset`.
    #[inline]
    pub fn range(self, offset: u64, lo: f32, hi: f32) -> f32 {
        draw_range(self.seed(offset), lo, hi)
    }

    /// Uniform `[-1, 1)` at `offset`.
    #[inline]
    pub fn signed(self, offset: u64) -> f32 {
        draw_signed(self.seed(offset))
    }

    /// Boolean with probability `p` at `offset`.
    #[inline]
    pub fn chance(self, offset: u64, p: f32) -> bool {
        draw_chance(self.seed(offset), p)
    }

    /// Index in `0..n` at `offset`.
    #[inline]
    pub fn pick(self, offset: u64, n: usize) -> usize {
        draw_index(self.seed(offset), n)
    }
}

const FORK_SALT: u64 = 0xD6E8_FEB8_6659_FD93;

// ---------------------------------------------------------------------------
// Tile seed derivation
// ---------------------------------------------------------------------------

/// Purpose salt separating the streams used within one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Purpose {
    /// District landmark (mosque) and its styling.
    Landmark = 1,
    /// Perimeter building ring around a landmark.
    Perimeter = 2,
    /// Minaret ring.
    Minarets = 3,
    /// Bazaar shops.
    Shops = 4,
    /// Residential houses.
    Houses = 5,
    /// Crop fields and plants.
    Crops = 6,
    /// Furrow rows inside fields.
    Furrows = 7,
    /// Canal routing.
    Canals = 8,
    /// Path and lane routing.
    Paths = 9,
    /// Fence posts.
    Fences = 10,
    /// Orchard and street trees.
    Trees = 11,
    /// Rare optional features (nomadic camp).
    RareFeature = 12,
    /// Scatter props.
    Scatter = 13,
    /// Horizon skyline.
    Horizon = 14,
}

impl Purpose {
    /// Every purpose, in salt order.
    pub const ALL: [Purpose; 14] = [
        Purpose::Landmark,
        Purpose::Perimeter,
        Purpose::Minarets,
        Purpose::Shops,
        Purpose::Houses,
        Purpose::Crops,
        Purpose::Furrows,
        Purpose::Canals,
        Purpose::Paths,
        Purpose::Fences,
        Purpose::Trees,
        Purpose::RareFeature,
        Purpose::Scatter,
        Purpose::Horizon,
    ];

    /// The raw salt value.
    pub const fn salt(self) -> u8 {
        self as u8
    }
}

const COORD_BITS: u32 = 21;
const COORD_MASK: u64 = (1 << COORD_BITS) - 1;
const SALT_BITS: u32 = 8;
const TILE_MULTIPLIER: u64 = 0x5851_F42D_4C95_7F2D;
const SESSION_MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Derive the seed for `purpose` on tile `(tile_x, tile_y)` under `session_seed`.
///
/// Coordinates within `±MAX_TILE_COORD` occupy 21 bits each and the salt 8
/// bits, so the packed key is unique before mixing; multiplication by an odd
/// constant, xor with the session key and the avalanche are all bijections.
/// Coordinates outside the supported range wrap and may collide, but the
/// generator never requests them.
pub fn derive_tile_seed(tile_x: i32, tile_y: i32, session_seed: u64, purpose: Purpose) -> u64 {
    derive_salted(tile_x, tile_y, session_seed, purpose.salt())
}

/// [`derive_tile_seed`] with a raw salt.
pub fn derive_salted(tile_x: i32, tile_y: i32, session_seed: u64, salt: u8) -> u64 {
    let bias = i64::from(MAX_TILE_COORD);
    let x = ((i64::from(tile_x) + bias) as u64) & COORD_MASK;
    let y = ((i64::from(tile_y) + bias) as u64) & COORD_MASK;
    let packed = (x << (COORD_BITS + SALT_BITS)) | (y << SALT_BITS) | u64::from(salt);

    let session_key = avalanche(session_seed.wrapping_mul(SESSION_MULTIPLIER));
    avalanche(packed.wrapping_mul(TILE_MULTIPLIER) ^ session_key)
}

/// 64-bit finalizer (splitmix64). A bijection on `u64`.
#[inline]
pub const fn avalanche(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
