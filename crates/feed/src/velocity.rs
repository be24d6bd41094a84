use chrono::{DateTime, Utc};

/// Given the (possibly empty) set of entry dates, excludes future-dated
/// entries (spec §4.9), then returns `(last_updated, velocity)` where
/// `velocity = item_count / max(1, days_between(last_updated,
/// earliest_entry_date))`.
pub fn summarize_dates(
    dates: &[DateTime<Utc>],
    item_count: usize,
) -> (Option<DateTime<Utc>>, f64) {
    let now = Utc::now();
    let mut past: Vec<DateTime<Utc>> = dates.iter().copied().filter(|d| *d <= now).collect();
    if past.is_empty() {
        return (None, 0.0);
    }
    past.sort();
    let earliest = past[0];
    let latest = *past.last().unwrap();

    let days = (latest - earliest).num_seconds() as f64 / 86_400.0;
    let velocity = item_count as f64 / days.max(1.0);

    (Some(latest), velocity)
}
