//! Tagged text encoding of a [`DurationLedger`].
//!
//! The document is a JSON object shaped like the ledger itself:
//!
//! ```text
//! {
//!   "date:2024-01-01": {
//!     "category:work": "duration:98575.333000000s"
//!   }
//! }
//! ```
//!
//! Every string carries its kind as a prefix. Decoding dispatches on that
//! prefix to a strict parser and rejects anything it does not recognise.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::marker::PhantomData;

use chrono::{Duration, NaiveDate};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::domain::{Category, DurationLedger};
use crate::error::TrackError;

const DATE_TAG: &str = "date:";
const CATEGORY_TAG: &str = "category:";
const DURATION_TAG: &str = "duration:";
const DATE_FORMAT: &str = "%Y-%m-%d";
const NANOS_DIGITS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Date,
    Category,
    Duration,
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Date => f.write_str("date"),
            Kind::Category => f.write_str("category"),
            Kind::Duration => f.write_str("duration"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tagged {
    Date(NaiveDate),
    Category(Category),
    Duration(Duration),
}

impl Tagged {
    pub fn kind(&self) -> Kind {
        match self {
            Tagged::Date(_) => Kind::Date,
            Tagged::Category(_) => Kind::Category,
            Tagged::Duration(_) => Kind::Duration,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Tagged::Date(date) => format!("{DATE_TAG}{}", date.format(DATE_FORMAT)),
            Tagged::Category(category) => format!("{CATEGORY_TAG}{}", category.as_str()),
            Tagged::Duration(duration) => format!(
                "{DURATION_TAG}{}.{:0width$}s",
                duration.num_seconds(),
                duration.subsec_nanos(),
                width = NANOS_DIGITS
            ),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, TrackError> {
        if let Some(body) = raw.strip_prefix(DATE_TAG) {
            parse_date(body).map(Tagged::Date)
        } else if let Some(body) = raw.strip_prefix(CATEGORY_TAG) {
            body.parse::<Category>()
                .map(Tagged::Category)
                .map_err(TrackError::corrupt)
        } else if let Some(body) = raw.strip_prefix(DURATION_TAG) {
            parse_duration(body).map(Tagged::Duration)
        } else {
            Err(TrackError::corrupt(format!("unrecognized tag in {raw:?}")))
        }
    }
}

fn mismatch(raw: &str, expected: Kind, found: Kind) -> TrackError {
    TrackError::corrupt(format!("expected a {expected}, found a {found} in {raw:?}"))
}

fn expect_date(raw: &str) -> Result<NaiveDate, TrackError> {
    match Tagged::decode(raw)? {
        Tagged::Date(date) => Ok(date),
        other => Err(mismatch(raw, Kind::Date, other.kind())),
    }
}

fn expect_category(raw: &str) -> Result<Category, TrackError> {
    match Tagged::decode(raw)? {
        Tagged::Category(category) => Ok(category),
        other => Err(mismatch(raw, Kind::Category, other.kind())),
    }
}

fn expect_duration(raw: &str) -> Result<Duration, TrackError> {
    match Tagged::decode(raw)? {
        Tagged::Duration(duration) => Ok(duration),
        other => Err(mismatch(raw, Kind::Duration, other.kind())),
    }
}

fn parse_date(body: &str) -> Result<NaiveDate, TrackError> {
    let date = NaiveDate::parse_from_str(body, DATE_FORMAT)
        .map_err(|err| TrackError::corrupt(format!("bad date {body:?}: {err}")))?;

    // Reject non-canonical spellings so distinct keys always mean distinct dates.
    if date.format(DATE_FORMAT).to_string() != body {
        return Err(TrackError::corrupt(format!("non-canonical date {body:?}")));
    }
    Ok(date)
}

fn parse_duration(body: &str) -> Result<Duration, TrackError> {
    let bad = || TrackError::corrupt(format!("bad duration {body:?}"));

    let number = body.strip_suffix('s').ok_or_else(bad)?;
    let (seconds, nanos) = number.split_once('.').ok_or_else(bad)?;
    let all_digits = |text: &str| !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(seconds) || !all_digits(nanos) || nanos.len() != NANOS_DIGITS {
        return Err(bad());
    }
    if seconds.len() > 1 && seconds.starts_with('0') {
        return Err(bad());
    }

    let seconds: i64 = seconds.parse().map_err(|_| bad())?;
    let nanos: i64 = nanos.parse().map_err(|_| bad())?;
    Duration::try_seconds(seconds)
        .and_then(|whole| whole.checked_add(&Duration::nanoseconds(nanos)))
        .ok_or_else(bad)
}

/// A JSON object read as an ordered list of entries, keeping duplicate keys
/// visible instead of letting the last one win.
struct Entries<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by tagged strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

pub fn encode(ledger: &DurationLedger) -> String {
    let mut document: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (date, category, duration) in ledger.entries() {
        document
            .entry(Tagged::Date(date).encode())
            .or_default()
            .insert(
                Tagged::Category(category).encode(),
                Tagged::Duration(duration).encode(),
            );
    }

    serde_json::to_string_pretty(&document).expect("a map of strings always serializes")
}

pub fn decode(text: &str) -> Result<DurationLedger, TrackError> {
    let document: Entries<Entries<String>> =
        serde_json::from_str(text).map_err(|err| TrackError::CorruptData {
            detail: "malformed ledger document".to_string(),
            source: Some(err),
        })?;

    let mut ledger = DurationLedger::new();
    let mut seen_dates = HashSet::with_capacity(document.0.len());

    for (date_key, categories) in document.0 {
        let date = expect_date(&date_key)?;
        if !seen_dates.insert(date) {
            return Err(TrackError::corrupt(format!("duplicate key {date_key:?}")));
        }

        if categories.0.is_empty() {
            return Err(TrackError::corrupt(format!("no categories under {date_key:?}")));
        }

        let mut seen_categories = HashSet::with_capacity(categories.0.len());
        for (category_key, duration_value) in categories.0 {
            let category = expect_category(&category_key)?;
            if !seen_categories.insert(category) {
                return Err(TrackError::corrupt(format!(
                    "duplicate key {category_key:?} under {date_key:?}"
                )));
            }

            let duration = expect_duration(&duration_value)?;
            ledger.accumulate(date, category, duration);
        }
    }

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::domain::{Category, DurationLedger};
    use crate::error::TrackError;

    use super::{Tagged, decode, encode};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_corrupt(text: &str) {
        match decode(text) {
            Err(TrackError::CorruptData { .. }) => {}
            other => panic!("expected corrupt data for {text}, got {other:?}"),
        }
    }

    #[test]
    fn round_trips_fractional_durations() {
        let mut ledger = DurationLedger::new();
        ledger.accumulate(
            day(2024, 1, 1),
            Category::Work,
            Duration::days(1) + Duration::hours(3) + Duration::milliseconds(55_333),
        );
        ledger.accumulate(day(2024, 1, 2), Category::Work, Duration::nanoseconds(1));
        ledger.accumulate(day(1999, 12, 31), Category::Work, Duration::zero());

        let decoded = decode(&encode(&ledger)).expect("decode should succeed");
        assert_eq!(decoded, ledger);
    }

    #[test]
    fn encodes_expected_shape() {
        let mut ledger = DurationLedger::new();
        ledger.accumulate(
            day(2024, 1, 1),
            Category::Work,
            Duration::seconds(98_575) + Duration::milliseconds(333),
        );

        let value: serde_json::Value = serde_json::from_str(&encode(&ledger)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "date:2024-01-01": { "category:work": "duration:98575.333000000s" }
            })
        );
    }

    #[test]
    fn empty_ledger_is_empty_object() {
        assert_eq!(encode(&DurationLedger::new()), "{}");
        assert!(decode("{}").unwrap().is_empty());
    }

    #[test]
    fn classifies_tags_without_context() {
        assert_eq!(
            Tagged::decode("date:2024-02-29").unwrap(),
            Tagged::Date(day(2024, 2, 29))
        );
        assert_eq!(
            Tagged::decode("category:work").unwrap(),
            Tagged::Category(Category::Work)
        );
        assert_eq!(
            Tagged::decode("duration:60.500000000s").unwrap(),
            Tagged::Duration(Duration::milliseconds(60_500))
        );
    }

    #[test]
    fn rejects_unrecognized_tags() {
        assert_corrupt(r#"{"date:2024-01-01": {"category:work": "timedelta:5"}}"#);
        assert_corrupt(r#"{"datetime.date(2024, 1, 1)": {"category:work": "duration:1.000000000s"}}"#);
        assert_corrupt(r#"{"date:2024-01-01": {"category:play": "duration:1.000000000s"}}"#);
    }

    #[test]
    fn rejects_tags_in_wrong_position() {
        assert_corrupt(r#"{"category:work": {"category:work": "duration:1.000000000s"}}"#);
        assert_corrupt(r#"{"date:2024-01-01": {"duration:1.000000000s": "category:work"}}"#);
        assert_corrupt(r#"{"date:2024-01-01": {"category:work": "date:2024-01-01"}}"#);
    }

    #[test]
    fn rejects_malformed_bodies() {
        for value in [
            "duration:1s",
            "duration:-1.000000000s",
            "duration:1.5s",
            "duration:01.000000000s",
            "duration:1.000000000",
        ] {
            assert_corrupt(&format!(r#"{{"date:2024-01-01": {{"category:work": "{value}"}}}}"#));
        }
        assert_corrupt(r#"{"date:2024-1-1": {"category:work": "duration:1.000000000s"}}"#);
        assert_corrupt(r#"{"date:2024-02-30": {"category:work": "duration:1.000000000s"}}"#);
    }

    #[test]
    fn rejects_structural_problems() {
        assert_corrupt("not json");
        assert_corrupt("[]");
        assert_corrupt(r#"{"date:2024-01-01": "duration:1.000000000s"}"#);
        assert_corrupt(r#"{"date:2024-01-01": {"category:work": 5}}"#);
        assert_corrupt(r#"{"date:2024-01-01": {}}"#);
        assert_corrupt(
            r#"{"date:2024-01-01": {"category:work": "duration:1.000000000s"},
                "date:2024-01-01": {"category:work": "duration:2.000000000s"}}"#,
        );
        assert_corrupt(
            r#"{"date:2024-01-01": {"category:work": "duration:1.000000000s",
                                    "category:work": "duration:2.000000000s"}}"#,
        );
    }

    #[test]
    fn rejection_leaves_no_partial_ledger() {
        let text = r#"{
            "date:2024-01-01": {"category:work": "duration:1.000000000s"},
            "date:2024-01-02": {"category:work": "bogus"}
        }"#;
        assert!(decode(text).is_err());
    }
}
