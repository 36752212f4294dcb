//! Daily visibility and sentiment series.
//!
//! Pure functions over fetched rows; callers pass the window bounds so tests
//! control time without real clocks.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandpulse_store::RunWithMentions;

use crate::trend::{Trend, SENTIMENT_TREND_THRESHOLD, VISIBILITY_TREND_THRESHOLD};

/// Round to two decimals, the display precision of every percentage and
/// sentiment value.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityPoint {
    pub date: NaiveDate,
    pub total_runs: u32,
    pub mention_runs: u32,
    pub visibility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilitySeries {
    pub points: Vec<VisibilityPoint>,
    /// Ratio of sums over the whole window, not a mean of daily percentages:
    /// sparse days must not be over-weighted.
    pub current_visibility: f64,
    pub trend: Trend,
}

/// Bucket runs by UTC calendar day over [from, to] and compute the share of
/// runs mentioning `target` per day and over the window.
pub fn visibility_series(
    runs: &[RunWithMentions],
    target: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> VisibilitySeries {
    let mut buckets: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
    for day in window_days(from, to) {
        buckets.insert(day, (0, 0));
    }

    for run in runs {
        let day = run.run_at.date_naive();
        let Some((total, mentioned)) = buckets.get_mut(&day) else {
            continue;
        };
        *total += 1;
        if run.mentions.iter().any(|m| m.company_id == target) {
            *mentioned += 1;
        }
    }

    let points: Vec<VisibilityPoint> = buckets
        .into_iter()
        .map(|(date, (total_runs, mention_runs))| VisibilityPoint {
            date,
            total_runs,
            mention_runs,
            visibility: if total_runs == 0 {
                0.0
            } else {
                round2(mention_runs as f64 / total_runs as f64 * 100.0)
            },
        })
        .collect();

    let total_runs: u32 = points.iter().map(|p| p.total_runs).sum();
    let mention_runs: u32 = points.iter().map(|p| p.mention_runs).sum();
    let current_visibility = if total_runs == 0 {
        0.0
    } else {
        round2(mention_runs as f64 / total_runs as f64 * 100.0)
    };

    let dailies: Vec<f64> = points.iter().map(|p| p.visibility).collect();
    let trend = Trend::classify(&dailies, VISIBILITY_TREND_THRESHOLD);

    VisibilitySeries {
        points,
        current_visibility,
        trend,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: NaiveDate,
    pub mention_count: u32,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSeries {
    /// Only days with at least one mention appear; a mean over zero
    /// sentiments is undefined.
    pub points: Vec<SentimentPoint>,
    pub current_sentiment: f64,
    pub trend: Trend,
}

/// Day-bucketed mean sentiment toward `target` over [from, to].
pub fn sentiment_series(
    runs: &[RunWithMentions],
    target: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> SentimentSeries {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

    for run in runs {
        let day = run.run_at.date_naive();
        if day < from || day > to {
            continue;
        }
        for mention in &run.mentions {
            if mention.company_id == target {
                buckets.entry(day).or_default().push(mention.sentiment);
            }
        }
    }

    let all: Vec<f64> = buckets.values().flatten().copied().collect();
    let current_sentiment = if all.is_empty() {
        0.0
    } else {
        round2(all.iter().sum::<f64>() / all.len() as f64)
    };

    let points: Vec<SentimentPoint> = buckets
        .into_iter()
        .map(|(date, sentiments)| SentimentPoint {
            date,
            mention_count: sentiments.len() as u32,
            sentiment: round2(sentiments.iter().sum::<f64>() / sentiments.len() as f64),
        })
        .collect();

    let dailies: Vec<f64> = points.iter().map(|p| p.sentiment).collect();
    let trend = Trend::classify(&dailies, SENTIMENT_TREND_THRESHOLD);

    SentimentSeries {
        points,
        current_sentiment,
        trend,
    }
}

fn window_days(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |day| *day <= to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandpulse_store::MentionRow;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn run_on(
        date: NaiveDate,
        hour: u32,
        mentions: &[(Uuid, f64)],
    ) -> RunWithMentions {
        let time = NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap();
        RunWithMentions {
            run_id: Uuid::new_v4(),
            prompt_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            run_at: Utc.from_utc_datetime(&date.and_time(time)),
            mentions: mentions
                .iter()
                .map(|(company_id, sentiment)| MentionRow {
                    company_id: *company_id,
                    sentiment: *sentiment,
                })
                .collect(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ten_runs_four_mentions_is_forty_percent() {
        let target = Uuid::new_v4();
        let d = day(2025, 3, 10);
        let mut runs = Vec::new();
        for i in 0..10u32 {
            let mentions: Vec<(Uuid, f64)> = if i < 4 { vec![(target, 0.0)] } else { vec![] };
            runs.push(run_on(d, i, &mentions));
        }

        let series = visibility_series(&runs, target, d, d);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].total_runs, 10);
        assert_eq!(series.points[0].mention_runs, 4);
        assert_eq!(series.points[0].visibility, 40.00);
        assert_eq!(series.current_visibility, 40.00);
        assert_eq!(series.trend, Trend::Static);
    }

    #[test]
    fn current_visibility_is_ratio_of_sums_not_mean_of_dailies() {
        let target = Uuid::new_v4();
        let d1 = day(2025, 3, 10);
        let d2 = day(2025, 3, 11);

        // Day 1: 1/1 mentioned (100%). Day 2: 1/4 mentioned (25%).
        let mut runs = vec![run_on(d1, 9, &[(target, 0.0)])];
        runs.push(run_on(d2, 9, &[(target, 0.0)]));
        for hour in 10..13 {
            runs.push(run_on(d2, hour, &[]));
        }

        let series = visibility_series(&runs, target, d1, d2);
        // 2 mention runs / 5 total runs, not (100 + 25) / 2.
        assert_eq!(series.current_visibility, 40.00);

        let numerator: u32 = series.points.iter().map(|p| p.mention_runs).sum();
        assert_eq!(numerator, 2);
    }

    #[test]
    fn empty_days_have_zero_visibility() {
        let target = Uuid::new_v4();
        let d1 = day(2025, 3, 10);
        let d3 = day(2025, 3, 12);
        let runs = vec![run_on(d1, 9, &[(target, 0.0)])];

        let series = visibility_series(&runs, target, d1, d3);
        assert_eq!(series.points.len(), 3);
        assert_eq!(series.points[1].total_runs, 0);
        assert_eq!(series.points[1].visibility, 0.0);
    }

    #[test]
    fn runs_outside_window_are_ignored() {
        let target = Uuid::new_v4();
        let inside = day(2025, 3, 10);
        let outside = day(2025, 2, 1);
        let runs = vec![
            run_on(inside, 9, &[(target, 0.0)]),
            run_on(outside, 9, &[(target, 0.0)]),
        ];

        let series = visibility_series(&runs, target, inside, inside);
        let total: u32 = series.points.iter().map(|p| p.total_runs).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn visibility_trend_up_between_forty_and_fifty_five() {
        let target = Uuid::new_v4();
        let d1 = day(2025, 3, 10);
        let d2 = day(2025, 3, 11);

        let mut runs = Vec::new();
        // Day 1: 4/10 → 40.00. Day 2: 11/20 → 55.00.
        for i in 0..10u32 {
            let mentions: Vec<(Uuid, f64)> = if i < 4 { vec![(target, 0.0)] } else { vec![] };
            runs.push(run_on(d1, i, &mentions));
        }
        for i in 0..20u32 {
            let mentions: Vec<(Uuid, f64)> = if i < 11 { vec![(target, 0.0)] } else { vec![] };
            runs.push(run_on(d2, i, &mentions));
        }

        let series = visibility_series(&runs, target, d1, d2);
        assert_eq!(series.points[0].visibility, 40.00);
        assert_eq!(series.points[1].visibility, 55.00);
        assert_eq!(series.trend, Trend::Up);
    }

    #[test]
    fn daily_sentiment_is_arithmetic_mean() {
        let target = Uuid::new_v4();
        let d = day(2025, 3, 10);
        let runs = vec![
            run_on(d, 9, &[(target, 0.2)]),
            run_on(d, 10, &[(target, -0.1)]),
            run_on(d, 11, &[(target, 0.5)]),
        ];

        let series = sentiment_series(&runs, target, d, d);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].mention_count, 3);
        assert_eq!(series.points[0].sentiment, 0.20);
        assert_eq!(series.current_sentiment, 0.20);
    }

    #[test]
    fn sentiment_trend_uses_tenth_threshold() {
        let target = Uuid::new_v4();
        let d1 = day(2025, 3, 10);
        let d2 = day(2025, 3, 11);

        let runs = vec![
            run_on(d1, 9, &[(target, 0.0)]),
            run_on(d2, 9, &[(target, 0.05)]),
        ];
        let series = sentiment_series(&runs, target, d1, d2);
        assert_eq!(series.trend, Trend::Static);

        let runs = vec![
            run_on(d1, 9, &[(target, 0.0)]),
            run_on(d2, 9, &[(target, 0.3)]),
        ];
        let series = sentiment_series(&runs, target, d1, d2);
        assert_eq!(series.trend, Trend::Up);
    }

    #[test]
    fn sentiment_series_skips_days_without_mentions() {
        let target = Uuid::new_v4();
        let other = Uuid::new_v4();
        let d1 = day(2025, 3, 10);
        let d2 = day(2025, 3, 11);
        let runs = vec![
            run_on(d1, 9, &[(target, 0.4)]),
            run_on(d2, 9, &[(other, -0.8)]),
        ];

        let series = sentiment_series(&runs, target, d1, d2);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].date, d1);
        assert_eq!(series.trend, Trend::Static);
    }

    #[test]
    fn round2_rounds_half_up_at_two_decimals() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(0.125), 0.13);
    }
}
