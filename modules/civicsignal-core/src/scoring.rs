//! Engagement scoring, trending rank and in-process stats aggregation.
//!
//! The score is never stored: it is recomputed from the live counters on
//! every read, so it can never drift from them.

use chrono::{DateTime, Duration, Utc};

use civicsignal_common::{Category, IssueStatus, Priority};

use crate::issue::{Engagement, Issue};

pub const TRENDING_WINDOW_DAYS: i64 = 7;

/// upvotes*2 + shares + comments - downvotes + floor(views/10)
pub fn engagement_score(e: &Engagement) -> i64 {
    (e.upvotes as i64) * 2 + (e.shares as i64) + (e.comments as i64) - (e.downvotes as i64)
        + (e.views / 10) as i64
}

/// Rank issues created in the trailing window by engagement score.
/// Ties break to the more recently created issue, then by id, so the order
/// is fully deterministic.
pub fn trending(mut issues: Vec<Issue>, now: DateTime<Utc>, limit: usize) -> Vec<Issue> {
    let cutoff = now - Duration::days(TRENDING_WINDOW_DAYS);
    issues.retain(|issue| issue.created_at >= cutoff);
    issues.sort_by(|a, b| {
        engagement_score(&b.engagement)
            .cmp(&engagement_score(&a.engagement))
            .then(b.created_at.cmp(&a.created_at))
            .then(a.id.cmp(&b.id))
    });
    issues.truncate(limit);
    issues
}

#[derive(Debug, Clone)]
pub struct IssueStats {
    pub total: u64,
    pub by_status: Vec<(IssueStatus, u64)>,
    pub by_category: Vec<(Category, u64)>,
    pub by_priority: Vec<(Priority, u64)>,
    pub avg_resolution_days: f64,
    pub resolution_rate: f64,
    /// Most-reported categories over the trending window, busiest first.
    pub trending_categories: Vec<Category>,
}

/// Explicit filter -> group -> sort -> limit over an already-fetched slice.
pub fn compute_stats(issues: &[Issue], now: DateTime<Utc>) -> IssueStats {
    let total = issues.len() as u64;

    let by_status = IssueStatus::ALL
        .iter()
        .map(|&status| (status, issues.iter().filter(|i| i.status == status).count() as u64))
        .filter(|(_, count)| *count > 0)
        .collect();

    let by_category = Category::ALL
        .iter()
        .map(|&category| {
            (category, issues.iter().filter(|i| i.category == category).count() as u64)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    let by_priority = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical]
        .iter()
        .map(|&priority| {
            (priority, issues.iter().filter(|i| i.priority == priority).count() as u64)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    let resolved: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.status == IssueStatus::Resolved && i.actual_resolution.is_some())
        .collect();
    let avg_resolution_days = if resolved.is_empty() {
        0.0
    } else {
        let sum: f64 = resolved
            .iter()
            .filter_map(|i| {
                i.actual_resolution
                    .map(|resolved_at| (resolved_at - i.created_at).num_seconds() as f64 / 86_400.0)
            })
            .sum();
        sum / resolved.len() as f64
    };
    let resolution_rate = if total > 0 {
        resolved.len() as f64 / total as f64
    } else {
        0.0
    };

    let cutoff = now - Duration::days(TRENDING_WINDOW_DAYS);
    let mut recent_by_category: Vec<(Category, u64)> = Category::ALL
        .iter()
        .map(|&category| {
            (
                category,
                issues
                    .iter()
                    .filter(|i| i.category == category && i.created_at >= cutoff)
                    .count() as u64,
            )
        })
        .filter(|(_, count)| *count > 0)
        .collect();
    recent_by_category.sort_by(|a, b| b.1.cmp(&a.1));
    let trending_categories = recent_by_category
        .into_iter()
        .take(5)
        .map(|(category, _)| category)
        .collect();

    IssueStats {
        total,
        by_status,
        by_category,
        by_priority,
        avg_resolution_days,
        resolution_rate,
        trending_categories,
    }
}
