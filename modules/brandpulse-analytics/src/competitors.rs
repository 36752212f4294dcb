//! Competitor leaderboard and position windowing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandpulse_store::RunWithMentions;

use crate::series::round2;

/// Entries below this visibility are dropped unless they are the tracked
/// company itself.
pub const VISIBILITY_FLOOR: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorEntry {
    pub company_id: Uuid,
    pub name: String,
    /// Number of distinct runs the company appears in, not raw mention rows.
    pub mentions: u32,
    pub visibility: f64,
    pub average_sentiment: f64,
    /// Number of distinct prompts the company appeared under.
    pub prompt_count: u32,
}

/// Rank every company mentioned across the window's runs.
///
/// Sorted descending by visibility; equal visibility breaks ties by
/// ascending company id so the order is stable across runs.
pub fn rank_competitors(
    runs: &[RunWithMentions],
    tracked: Uuid,
    names: &HashMap<Uuid, String>,
) -> Vec<CompetitorEntry> {
    let total_runs = runs.len() as u32;

    struct Acc {
        runs: u32,
        sentiments: Vec<f64>,
        prompts: BTreeSet<Uuid>,
    }

    let mut by_company: BTreeMap<Uuid, Acc> = BTreeMap::new();
    for run in runs {
        let mut seen_in_run: BTreeSet<Uuid> = BTreeSet::new();
        for mention in &run.mentions {
            let acc = by_company.entry(mention.company_id).or_insert_with(|| Acc {
                runs: 0,
                sentiments: Vec::new(),
                prompts: BTreeSet::new(),
            });
            acc.sentiments.push(mention.sentiment);
            acc.prompts.insert(run.prompt_id);
            if seen_in_run.insert(mention.company_id) {
                acc.runs += 1;
            }
        }
    }

    let mut entries: Vec<CompetitorEntry> = by_company
        .into_iter()
        .map(|(company_id, acc)| CompetitorEntry {
            company_id,
            name: names.get(&company_id).cloned().unwrap_or_default(),
            mentions: acc.runs,
            visibility: if total_runs == 0 {
                0.0
            } else {
                round2(acc.runs as f64 / total_runs as f64 * 100.0)
            },
            average_sentiment: round2(
                acc.sentiments.iter().sum::<f64>() / acc.sentiments.len() as f64,
            ),
            prompt_count: acc.prompts.len() as u32,
        })
        .filter(|entry| entry.visibility > VISIBILITY_FLOOR || entry.company_id == tracked)
        .collect();

    // The tracked company is always present, even with zero mentions.
    if !entries.iter().any(|e| e.company_id == tracked) {
        entries.push(CompetitorEntry {
            company_id: tracked,
            name: names.get(&tracked).cloned().unwrap_or_default(),
            mentions: 0,
            visibility: 0.0,
            average_sentiment: 0.0,
            prompt_count: 0,
        });
    }

    entries.sort_by(|a, b| {
        b.visibility
            .partial_cmp(&a.visibility)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.company_id.cmp(&b.company_id))
    });

    entries
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCompetitor {
    /// 1-based rank in the filtered, sorted leaderboard.
    pub position: u32,
    pub entry: CompetitorEntry,
}

/// The fixed-size neighborhood of ranks around the tracked company:
/// up to three entries, anchored at the list edges when the tracked company
/// is first or last.
pub fn position_window(entries: &[CompetitorEntry], tracked: Uuid) -> Vec<RankedCompetitor> {
    let n = entries.len();
    let Some(idx) = entries.iter().position(|e| e.company_id == tracked) else {
        return Vec::new();
    };

    let range = if idx == 0 {
        0..n.min(3)
    } else if idx == n - 1 {
        n.saturating_sub(3)..n
    } else {
        idx - 1..idx + 2
    };

    entries[range.clone()]
        .iter()
        .cloned()
        .zip(range)
        .map(|(entry, i)| RankedCompetitor {
            position: (i + 1) as u32,
            entry,
        })
        .collect()
}
