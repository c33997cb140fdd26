//! Postal address parsing for directory records.

use orgscout_shared::{Address, Outcome};

/// Splits a single-line formatted address into stored parts.
pub trait AddressParser: Send + Sync {
    fn parse(&self, formatted: &str) -> Outcome<Address>;
}

/// Comma-split parser for `street, city, STATE ZIP[, country]` addresses.
///
/// Anything that does not have at least street, city and a state segment is
/// returned as a best-effort partial [`Address`], marked degraded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaSplitParser;

impl AddressParser for CommaSplitParser {
    fn parse(&self, formatted: &str) -> Outcome<Address> {
        let segments: Vec<&str> = formatted
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let owned = |s: Option<&&str>| s.map(|v| v.to_string());

        let mut tokens = segments.get(2).map(|s| s.split_whitespace()).into_iter().flatten();
        let address = Address {
            street: owned(segments.first()),
            city: owned(segments.get(1)),
            state: tokens.next().map(String::from),
            zip: tokens.next().map(String::from),
        };

        if segments.len() < 3 {
            return Outcome::degraded(
                address,
                format!("expected at least 3 address segments, found {}", segments.len()),
            );
        }
        Outcome::Complete(address)
    }
}
