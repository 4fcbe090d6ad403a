//! Counting helpers shared by the analytics modules.

use std::collections::BTreeMap;

use accident_map_analytics_models::CategoryCount;

/// Counts occurrences of each key.
pub fn count_by<K: Ord, I: IntoIterator<Item = K>>(keys: I) -> BTreeMap<K, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Entries sorted by count descending, ties by key ascending.
pub fn ranked<K: Ord>(counts: BTreeMap<K, u64>) -> Vec<(K, u64)> {
    let mut rows: Vec<(K, u64)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// Key with the highest count (smallest key on ties).
pub fn max_key<K: Ord + Clone>(counts: &BTreeMap<K, u64>) -> Option<K> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(k, _)| k.clone())
}

/// Key with the lowest count (smallest key on ties).
pub fn min_key<K: Ord + Clone>(counts: &BTreeMap<K, u64>) -> Option<K> {
    counts
        .iter()
        .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.clone())
}

/// `count / total * 100`, or 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ranked category counts with percentages of `total`, truncated to `limit`.
pub fn categories<K: Ord + ToString>(
    counts: BTreeMap<K, u64>,
    total: u64,
    limit: usize,
) -> Vec<CategoryCount> {
    ranked(counts)
        .into_iter()
        .take(limit)
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

/// Formats a count with `,` thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_breaks_ties_by_key() {
        let counts = count_by(["b", "a", "c", "b", "a", "d"]);
        assert_eq!(
            ranked(counts.clone()),
            vec![("a", 2), ("b", 2), ("c", 1), ("d", 1)]
        );
        assert_eq!(max_key(&counts), Some("a"));
        assert_eq!(min_key(&counts), Some("c"));
        assert_eq!(max_key(&BTreeMap::<u8, u64>::new()), None);
    }

    #[test]
    fn percentages_and_rounding() {
        assert!((percentage(1, 3) - 33.333_333).abs() < 1e-4);
        assert!(percentage(5, 0).abs() < f64::EPSILON);
        assert!((round_to(33.336, 2) - 33.34).abs() < 1e-9);
        assert!((round_to(-12.25, 1) + 12.3).abs() < 1e-9);
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }
}
