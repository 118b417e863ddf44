//! Driver error type.

use mirage_config::ConfigError;
use mirage_lod::LodError;

use crate::platform::PlatformError;

/// Anything that stops the driver before or instead of a run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Directory resolution or creation failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The config file could not be loaded, saved or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configured LOD bands were rejected.
    #[error("invalid LOD thresholds: {0}")]
    Lod(#[from] LodError),

    /// A tile layout could not be written as RON.
    #[error("failed to serialize tile layout: {0}")]
    Dump(#[from] ron::Error),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Platform(_) => 2,
            Self::Config(_) | Self::Lod(_) => 3,
            Self::Dump(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinct_from_success() {
        let errors = [
            AppError::Platform(PlatformError::NoConfigDir),
            AppError::Config(ConfigError::InvalidValue {
                field: "streaming.unload_radius",
                reason: "too small".into(),
            }),
            AppError::Lod(LodError::NotIncreasing {
                lower: 10.0,
                upper: 5.0,
            }),
        ];
        for e in &errors {
            assert_ne!(e.exit_code(), 0, "{e} must not exit with success");
        }
    }

    #[test]
    fn test_config_error_message_passes_through() {
        let e = AppError::from(ConfigError::InvalidValue {
            field: "generation.tile_size",
            reason: "must be at least 16, got 4".into(),
        });
        assert!(e.to_string().contains("generation.tile_size"));
    }
}
