//! Deterministic seeding and the random source every generation step draws from.
//!
//! Seeds are derived with a splitmix64 avalanche chain rather than std's
//! `DefaultHasher`, whose algorithm is not guaranteed to stay the same across
//! toolchains. Worlds must regenerate identically after an upgrade.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skyisle_coords::{ChunkPos, SystemCoord};

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Stream salts so system, chunk, decoration, and spawn streams never share
/// a seed for the same coordinates.
const SYSTEM_SALT: u64 = 0x5953_5445_4D00_0001;
const CHUNK_SALT: u64 = 0x4348_554E_4B00_0002;
const DECORATION_SALT: u64 = 0x4445_434F_5200_0003;
const SPAWN_SALT: u64 = 0x5350_4157_4E00_0004;

/// One splitmix64 step: a bijective avalanche of `z`.
#[inline]
pub fn splitmix64(z: u64) -> u64 {
    let mut z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Mixes a world seed, a salt, and a 2D integer coordinate into one seed.
pub fn mix_seed(world_seed: u64, salt: u64, x: i32, z: i32) -> u64 {
    let mut h = splitmix64(world_seed ^ salt);
    h = splitmix64(h ^ (x as i64 as u64));
    splitmix64(h ^ (z as i64 as u64).rotate_left(32))
}

/// Seed of the random stream that populates `system`.
pub fn derive_system_seed(world_seed: u64, system: SystemCoord) -> u64 {
    mix_seed(world_seed, SYSTEM_SALT, system.x, system.z)
}

/// Seed the chunk-local stream is reset to before each instance rasterizes.
pub fn derive_chunk_seed(world_seed: u64, chunk: ChunkPos) -> u64 {
    mix_seed(world_seed, CHUNK_SALT, chunk.x, chunk.z)
}

/// Seed the chunk-local stream is reset to before each instance is decorated.
pub fn derive_decoration_seed(world_seed: u64, chunk: ChunkPos) -> u64 {
    mix_seed(world_seed, DECORATION_SALT, chunk.x, chunk.z)
}

/// Seed used to place spawn requests inside a chunk.
pub fn derive_spawn_seed(world_seed: u64, chunk: ChunkPos) -> u64 {
    mix_seed(world_seed, SPAWN_SALT, chunk.x, chunk.z)
}

// ---------------------------------------------------------------------------
// Random source
// ---------------------------------------------------------------------------

/// Seedable, bit-reproducible random stream (ChaCha8).
///
/// A value type: callers own their source and pass it by `&mut`. Sources are
/// never shared between concurrent rasterizations.
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Restarts the stream from `seed`.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform in `[0, bound)`. A zero bound yields 0.
    pub fn next_int(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }

    /// Uniform in `[lo, hi]`. Returns `lo` when the range is empty.
    pub fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }

    /// Uniform in `[lo, hi]`. Returns `lo` when the range is empty.
    pub fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }

    /// `lo + U * (hi - lo)` with `U` uniform in `[0, 1)`.
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Uniformly picks one element, `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_int(items.len() as u32) as usize)
    }
}
