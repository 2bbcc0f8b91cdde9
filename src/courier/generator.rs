//! Consignment number generators
//!
//! A generator is a zero-argument function producing a courier-specific
//! number. The built-in formats follow the couriers the service was first
//! written for: a ten digit number with a country suffix, and a date prefix
//! followed by six digits.

use crate::clock::Clock;
use crate::config::NumberFormat;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type NumberGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Build the generator for a configured number format
pub fn from_format(format: &NumberFormat, clock: Arc<dyn Clock>) -> NumberGenerator {
    match format {
        NumberFormat::CountrySuffixed { digits, country } => country_suffixed(*digits, country),
        NumberFormat::DatePrefixed { digits } => date_prefixed(*digits, clock),
    }
}

/// `digits` random digits, the first one non-zero, then `-<country>`
pub fn country_suffixed(digits: usize, country: &str) -> NumberGenerator {
    let suffix = format!("-{}", country);
    Arc::new(move || {
        let mut rng = rand::thread_rng();
        let mut number = String::with_capacity(digits + suffix.len());
        if digits > 0 {
            number.push(char::from(b'0' + rng.gen_range(1..=9u8)));
            push_random_digits(&mut rng, &mut number, digits - 1);
        }
        number.push_str(&suffix);
        number
    })
}

/// `YYYYMMDD` of the current date followed by `digits` random digits
pub fn date_prefixed(digits: usize, clock: Arc<dyn Clock>) -> NumberGenerator {
    Arc::new(move || {
        let mut number = clock.today().format("%Y%m%d").to_string();
        push_random_digits(&mut rand::thread_rng(), &mut number, digits);
        number
    })
}

/// Cycle through a fixed list of numbers
///
/// An empty list yields empty strings.
pub fn fixed_sequence<I, S>(values: I) -> NumberGenerator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    let next = AtomicUsize::new(0);
    Arc::new(move || {
        if values.is_empty() {
            return String::new();
        }
        let index = next.fetch_add(1, Ordering::Relaxed) % values.len();
        values[index].clone()
    })
}

fn push_random_digits(rng: &mut impl Rng, out: &mut String, count: usize) {
    for _ in 0..count {
        out.push(char::from(b'0' + rng.gen_range(0..=9u8)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    #[test]
    fn test_country_suffixed_shape() {
        let generate = country_suffixed(10, "GB");
        for _ in 0..50 {
            let number = generate();
            assert_eq!(number.len(), 13);
            assert!(number.ends_with("-GB"));
            assert!(!number.starts_with('0'));
            assert!(number[..10].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_date_prefixed_uses_clock() {
        let clock = Arc::new(FixedClock(NaiveDate::from_ymd_opt(2020, 10, 21).unwrap()));
        let generate = date_prefixed(6, clock);
        let number = generate();

        assert!(number.starts_with("20201021"));
        assert_eq!(number.len(), "20201021".len() + 6);
    }

    #[test]
    fn test_fixed_sequence_cycles() {
        let generate = fixed_sequence(["1", "2"]);
        assert_eq!(generate(), "1");
        assert_eq!(generate(), "2");
        assert_eq!(generate(), "1");
    }

    #[test]
    fn test_fixed_sequence_empty() {
        let generate = fixed_sequence(Vec::<String>::new());
        assert_eq!(generate(), "");
    }
}
