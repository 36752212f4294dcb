//! Read-time analytics over persisted prompt-run history.
//!
//! Nothing is pre-aggregated: every report is computed from the raw
//! runs-with-mentions rows for a company and a lookback window.

pub mod competitors;
pub mod report;
pub mod series;
pub mod trend;

pub use competitors::{position_window, rank_competitors, CompetitorEntry, RankedCompetitor};
pub use report::{Analytics, CompetitorReport};
pub use series::{
    round2, sentiment_series, visibility_series, SentimentPoint, SentimentSeries, VisibilityPoint,
    VisibilitySeries,
};
pub use trend::Trend;
