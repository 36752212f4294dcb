use serde::{Deserialize, Serialize};

/// Visibility deltas below this move are noise.
pub const VISIBILITY_TREND_THRESHOLD: f64 = 1.0;
/// Sentiment deltas below this move are noise.
pub const SENTIMENT_TREND_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Static,
}

impl Trend {
    /// Classify by comparing only the first and last values of a series.
    /// Fewer than two points is always `Static`.
    pub fn classify(values: &[f64], threshold: f64) -> Trend {
        if values.len() < 2 {
            return Trend::Static;
        }

        let delta = values[values.len() - 1] - values[0];
        if delta >= threshold {
            Trend::Up
        } else if delta <= -threshold {
            Trend::Down
        } else {
            Trend::Static
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_down_static_at_visibility_threshold() {
        assert_eq!(Trend::classify(&[40.0, 41.0], 1.0), Trend::Up);
        assert_eq!(Trend::classify(&[40.0, 39.0], 1.0), Trend::Down);
        assert_eq!(Trend::classify(&[40.0, 40.9], 1.0), Trend::Static);
        assert_eq!(Trend::classify(&[40.0, 39.1], 1.0), Trend::Static);
    }

    #[test]
    fn only_endpoints_matter() {
        assert_eq!(Trend::classify(&[40.0, 90.0, 10.0, 40.5], 1.0), Trend::Static);
    }

    #[test]
    fn short_series_is_static() {
        assert_eq!(Trend::classify(&[], 1.0), Trend::Static);
        assert_eq!(Trend::classify(&[99.0], 1.0), Trend::Static);
    }

    #[test]
    fn sentiment_threshold() {
        assert_eq!(Trend::classify(&[0.0, 0.1], 0.1), Trend::Up);
        assert_eq!(Trend::classify(&[0.0, 0.09], 0.1), Trend::Static);
        assert_eq!(Trend::classify(&[0.2, -0.1], 0.1), Trend::Down);
    }
}
