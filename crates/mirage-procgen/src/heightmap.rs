//! Terrain height sampling.
//!
//! The generator only needs ground elevation under each placed entity. Height
//! comes from a [`HeightSampler`]; a sampler may report `None` for positions it
//! has not built yet, in which case [`ground_level`] falls back to
//! [`DEFAULT_GROUND_LEVEL`]. Non-finite samples are treated the same way.

use noise::{NoiseFn, Simplex};
use serde::{Deserialize, Serialize};

/// Elevation used when no heightmap sample is available.
pub const DEFAULT_GROUND_LEVEL: f32 = 0.0;

/// Source of terrain elevation at world-space `(x, z)`.
pub trait HeightSampler: Send + Sync {
    /// Elevation at `(x, z)`, or `None` if the heightmap is not available there.
    fn sample_height(&self, x: f32, z: f32) -> Option<f32>;
}

/// Ground elevation at `(x, z)`, never failing.
#[inline]
pub fn ground_level(sampler: &dyn HeightSampler, x: f32, z: f32) -> f32 {
    match sampler.sample_height(x, z) {
        Some(h) if h.is_finite() => h,
        _ => DEFAULT_GROUND_LEVEL,
    }
}

/// Perfectly flat terrain at a fixed elevation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatGround(pub f32);

impl HeightSampler for FlatGround {
    fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
        Some(self.0)
    }
}

/// A heightmap that has not been built: every sample is missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHeightmap;

impl HeightSampler for NoHeightmap {
    fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
        None
    }
}

/// Configuration for multi-octave fBm noise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapParams {
    /// Noise seed.
    pub seed: u32,
    /// Number of octaves. Default: 4.
    pub octaves: u32,
    /// Frequency multiplier between octaves. Default: 2.0.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves. Default: 0.5.
    pub persistence: f64,
    /// Frequency of the first octave. Default: 0.004 (one cycle per 250 units).
    pub base_frequency: f64,
    /// Amplitude of the first octave in world units. Default: 6.0.
    pub amplitude: f64,
    /// Elevation added to every sample. Default: 0.0.
    pub base_height: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.004,
            amplitude: 6.0,
            base_height: 0.0,
        }
    }
}

/// Gently rolling terrain from fractal Brownian motion over simplex noise.
pub struct NoiseHeightmap {
    noise: Simplex,
    params: HeightmapParams,
}

impl NoiseHeightmap {
    /// Create a sampler with the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
        }
    }

    /// Raw fBm value at `(x, z)`, including `base_height`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        self.params.base_height + total
    }

    /// Theoretical maximum deviation from `base_height` (geometric series sum).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    /// The parameters this sampler was built with.
    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

impl HeightSampler for NoiseHeightmap {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        Some(self.sample(f64::from(x), f64::from(z)) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NanGround;

    impl HeightSampler for NanGround {
        fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
            Some(f32::NAN)
        }
    }

    #[test]
    fn test_missing_heightmap_falls_back() {
        assert_eq!(ground_level(&NoHeightmap, 10.0, 20.0), DEFAULT_GROUND_LEVEL);
    }

    #[test]
    fn test_non_finite_sample_falls_back() {
        assert_eq!(ground_level(&NanGround, 0.0, 0.0), DEFAULT_GROUND_LEVEL);
    }

    #[test]
    fn test_flat_ground() {
        assert_eq!(ground_level(&FlatGround(3.5), -100.0, 4.0), 3.5);
    }

    #[test]
    fn test_noise_heightmap_deterministic() {
        let a = NoiseHeightmap::new(HeightmapParams {
            seed: 42,
            ..Default::default()
        });
        let b = NoiseHeightmap::new(HeightmapParams {
            seed: 42,
            ..Default::default()
        });
        assert_eq!(a.sample(100.0, 200.0), b.sample(100.0, 200.0));
    }

    #[test]
    fn test_noise_heightmap_within_amplitude() {
        let sampler = NoiseHeightmap::new(HeightmapParams {
            seed: 7,
            base_height: 10.0,
            ..Default::default()
        });
        let max_amp = sampler.max_amplitude();
        for i in 0..50 {
            for j in 0..50 {
                let h = sampler.sample(i as f64 * 13.0, j as f64 * 7.0);
                assert!(
                    (h - 10.0).abs() <= max_amp + 1e-9,
                    "height {h} strays beyond amplitude {max_amp}"
                );
            }
        }
    }

    #[test]
    fn test_max_amplitude_calculation() {
        let sampler = NoiseHeightmap::new(HeightmapParams {
            amplitude: 8.0,
            persistence: 0.5,
            octaves: 3,
            ..Default::default()
        });
        assert!((sampler.max_amplitude() - 14.0).abs() < 1e-12);
    }
}
