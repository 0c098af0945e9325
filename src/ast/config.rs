/// Largest scale a `Decimal` can carry.
pub const MAX_PRECISION: u32 = 28;

pub const DEFAULT_MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleMode {
    #[default]
    Radians,
    Degrees,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    /// Fractional digits kept in returned numbers.
    pub precision: u32,
    pub angle_mode: AngleMode,
    /// Nesting limit shared by the parser and the evaluator.
    pub max_depth: usize,
    /// Number of parsed expressions kept by the evaluator.
    pub cache_size: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            precision: 10,
            angle_mode: AngleMode::Radians,
            max_depth: DEFAULT_MAX_DEPTH,
            cache_size: 100,
        }
    }
}

impl EvalConfig {
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision.min(MAX_PRECISION);
        self
    }

    pub fn with_angle_mode(mut self, angle_mode: AngleMode) -> Self {
        self.angle_mode = angle_mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvalConfig::default();
        assert_eq!(config.precision, 10);
        assert_eq!(config.angle_mode, AngleMode::Radians);
        assert_eq!(config.max_depth, 1024);
    }

    #[test]
    fn test_precision_is_clamped() {
        assert_eq!(EvalConfig::default().with_precision(40).precision, MAX_PRECISION);
    }
}
