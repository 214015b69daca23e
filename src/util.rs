use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset};

pub fn format_watch_date(watched_at: Option<&DateTime<FixedOffset>>, raw: &str) -> String {
    match watched_at {
        Some(timestamp) => timestamp.format("%b %-d, %Y").to_string(),
        None if raw.trim().is_empty() => "unknown date".to_owned(),
        None => raw.trim().to_owned(),
    }
}

pub fn format_count(count: usize) -> String {
    let digits = count.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

pub fn stable_pair<T: Hash + ?Sized>(key: &T) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn formats_dates_like_the_sidebar() {
        let timestamp = DateTime::parse_from_rfc3339("2024-03-05T10:15:30Z").expect("timestamp");
        assert_eq!(format_watch_date(Some(&timestamp), ""), "Mar 5, 2024");
        assert_eq!(format_watch_date(None, " yesterday "), "yesterday");
        assert_eq!(format_watch_date(None, ""), "unknown date");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair(&42_i64);
        assert_eq!(first, stable_pair(&42_i64));
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }
}
