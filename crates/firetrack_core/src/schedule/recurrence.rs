//! Frequency codes, next-occurrence math and "when" parsing.
//!
//! # Responsibility
//! - Advance an anchor by the calendar-month step of an AS1851 frequency.
//! - Split free-form scheduling input into a precise instant or a bare
//!   required date.
//!
//! # Invariants
//! - Month arithmetic clamps to the last valid day of the target month
//!   (`2024-01-31` + 1 month = `2024-02-29`). Time-of-day is preserved.
//! - `one_off` never shifts the anchor.
//! - At most one slot of [`When`] is populated.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CODE_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("valid separator regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inspection frequency of a recurring obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    SixMonthly,
    Annual,
    /// Occurs exactly once, at the anchor.
    OneOff,
}

impl Frequency {
    /// Parses a frequency code or its display label.
    ///
    /// Matching ignores case, surrounding whitespace and the separator used
    /// between words, so `"Six Monthly"`, `"six-monthly"` and `"six_monthly"`
    /// all resolve to [`Frequency::SixMonthly`]. Returns `None` for anything
    /// else.
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        let normalized = CODE_SEPARATOR_RE.replace_all(&lowered, "_");
        match normalized.as_ref() {
            "monthly" | "month" => Some(Self::Monthly),
            "quarterly" | "quarter" | "3_monthly" => Some(Self::Quarterly),
            "six_monthly" | "6_monthly" | "half_yearly" | "semi_annual" => {
                Some(Self::SixMonthly)
            }
            "annual" | "annually" | "yearly" | "12_monthly" => Some(Self::Annual),
            "one_off" | "oneoff" | "once" => Some(Self::OneOff),
            _ => None,
        }
    }

    /// Stable storage code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SixMonthly => "six_monthly",
            Self::Annual => "annual",
            Self::OneOff => "one_off",
        }
    }

    /// Calendar months between occurrences; `None` for [`Frequency::OneOff`].
    pub fn months(self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::SixMonthly => Some(6),
            Self::Annual => Some(12),
            Self::OneOff => None,
        }
    }

    /// Occurrence following `anchor` under this frequency.
    pub fn advance(self, anchor: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.months() {
            Some(months) => anchor.checked_add_months(Months::new(months)),
            None => Some(anchor),
        }
    }
}

/// Result of [`parse_when`].
///
/// Callers branch on which slot is populated; both `None` means no schedule
/// information was supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct When {
    /// Precise start instant.
    pub instant: Option<NaiveDateTime>,
    /// Date-only requirement with no time component.
    pub required_date: Option<NaiveDate>,
}

impl When {
    /// True when neither slot is populated.
    pub fn is_empty(&self) -> bool {
        self.instant.is_none() && self.required_date.is_none()
    }
}

/// Computes the next occurrence of a recurrence rule.
///
/// Returns `None` when `anchor` is missing, when `frequency` is not a known
/// code, or when the shifted date would overflow the calendar.
pub fn next_occurrence(anchor: Option<NaiveDateTime>, frequency: &str) -> Option<NaiveDateTime> {
    let anchor = anchor?;
    Frequency::parse(frequency)?.advance(anchor)
}

/// String form of [`next_occurrence`] used when both inputs arrive raw.
///
/// The anchor accepts a full date-time or a bare date (taken at midnight).
pub fn next_from_anchor(
    anchor_raw: Option<&str>,
    frequency_raw: Option<&str>,
) -> Option<NaiveDateTime> {
    let frequency = frequency_raw.filter(|value| !value.trim().is_empty())?;
    let anchor = anchor_raw.and_then(parse_anchor);
    next_occurrence(anchor, frequency)
}

/// Parses an anchor date-time, accepting a bare date at midnight.
pub fn parse_anchor(raw: &str) -> Option<NaiveDateTime> {
    let when = parse_when(raw);
    when.instant
        .or_else(|| when.required_date.and_then(|date| date.and_hms_opt(0, 0, 0)))
}

/// Splits free-form scheduling input into an instant or a required date.
///
/// Full date-times (`T` or space separated, optional seconds and fraction,
/// or RFC 3339 with an offset kept as written wall-clock time) fill
/// `instant`. A bare `YYYY-MM-DD` fills `required_date`. Anything else
/// yields an empty [`When`].
pub fn parse_when(raw: &str) -> When {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return When::default();
    }

    if let Some(instant) = parse_datetime(trimmed) {
        return When {
            instant: Some(instant),
            required_date: None,
        };
    }

    match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        Ok(date) => When {
            instant: None,
            required_date: Some(date),
        },
        Err(_) => When::default(),
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::{next_from_anchor, next_occurrence, parse_anchor, parse_when, Frequency};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid test date")
    }

    #[test]
    fn frequency_parse_accepts_codes_and_labels() {
        assert_eq!(Frequency::parse("monthly"), Some(Frequency::Monthly));
        assert_eq!(Frequency::parse(" Quarterly "), Some(Frequency::Quarterly));
        assert_eq!(Frequency::parse("Six Monthly"), Some(Frequency::SixMonthly));
        assert_eq!(Frequency::parse("six-monthly"), Some(Frequency::SixMonthly));
        assert_eq!(Frequency::parse("ANNUAL"), Some(Frequency::Annual));
        assert_eq!(Frequency::parse("Yearly"), Some(Frequency::Annual));
        assert_eq!(Frequency::parse("One Off"), Some(Frequency::OneOff));
        assert_eq!(Frequency::parse("fortnightly"), None);
        assert_eq!(Frequency::parse(""), None);
    }

    #[test]
    fn frequency_codes_roundtrip_through_as_str() {
        for frequency in [
            Frequency::Monthly,
            Frequency::Quarterly,
            Frequency::SixMonthly,
            Frequency::Annual,
            Frequency::OneOff,
        ] {
            assert_eq!(Frequency::parse(frequency.as_str()), Some(frequency));
        }
    }

    #[test]
    fn next_occurrence_advances_by_calendar_months() {
        let anchor = at(2025, 3, 10, 9, 30);
        assert_eq!(
            next_occurrence(Some(anchor), "monthly"),
            Some(at(2025, 4, 10, 9, 30))
        );
        assert_eq!(
            next_occurrence(Some(anchor), "quarterly"),
            Some(at(2025, 6, 10, 9, 30))
        );
        assert_eq!(
            next_occurrence(Some(anchor), "six_monthly"),
            Some(at(2025, 9, 10, 9, 30))
        );
        assert_eq!(
            next_occurrence(Some(anchor), "annual"),
            Some(at(2026, 3, 10, 9, 30))
        );
    }

    #[test]
    fn next_occurrence_clamps_to_last_day_of_target_month() {
        assert_eq!(
            next_occurrence(Some(at(2024, 1, 31, 8, 0)), "monthly"),
            Some(at(2024, 2, 29, 8, 0))
        );
        assert_eq!(
            next_occurrence(Some(at(2023, 1, 31, 8, 0)), "monthly"),
            Some(at(2023, 2, 28, 8, 0))
        );
        assert_eq!(
            next_occurrence(Some(at(2024, 8, 31, 0, 0)), "six_monthly"),
            Some(at(2025, 2, 28, 0, 0))
        );
        assert_eq!(
            next_occurrence(Some(at(2024, 2, 29, 0, 0)), "annual"),
            Some(at(2025, 2, 28, 0, 0))
        );
        assert_eq!(
            next_occurrence(Some(at(2025, 11, 30, 0, 0)), "quarterly"),
            Some(at(2026, 2, 28, 0, 0))
        );
    }

    #[test]
    fn next_occurrence_keeps_one_off_anchor() {
        let anchor = at(2025, 5, 1, 7, 15);
        assert_eq!(next_occurrence(Some(anchor), "one_off"), Some(anchor));
    }

    #[test]
    fn next_occurrence_is_none_for_unknown_code_or_missing_anchor() {
        assert_eq!(next_occurrence(Some(at(2025, 1, 1, 0, 0)), "bogus_code"), None);
        assert_eq!(next_occurrence(None, "monthly"), None);
    }

    #[test]
    fn next_from_anchor_handles_raw_strings() {
        assert_eq!(
            next_from_anchor(Some("2024-01-31"), Some("monthly")),
            Some(at(2024, 2, 29, 0, 0))
        );
        assert_eq!(
            next_from_anchor(Some("2025-03-10T14:30"), Some("Quarterly")),
            Some(at(2025, 6, 10, 14, 30))
        );
        assert_eq!(next_from_anchor(Some("not a date"), Some("monthly")), None);
        assert_eq!(next_from_anchor(None, Some("monthly")), None);
        assert_eq!(next_from_anchor(Some("2025-03-10"), None), None);
        assert_eq!(next_from_anchor(Some("2025-03-10"), Some("  ")), None);
    }

    #[test]
    fn parse_when_returns_instant_for_full_datetime() {
        let when = parse_when("2025-03-10T14:30");
        assert_eq!(when.instant, Some(at(2025, 3, 10, 14, 30)));
        assert_eq!(when.required_date, None);

        let spaced = parse_when("2025-03-10 14:30:00");
        assert_eq!(spaced.instant, Some(at(2025, 3, 10, 14, 30)));
    }

    #[test]
    fn parse_when_keeps_rfc3339_wall_clock_time() {
        let when = parse_when("2025-03-10T14:30:00+10:00");
        assert_eq!(when.instant, Some(at(2025, 3, 10, 14, 30)));
        assert_eq!(when.required_date, None);
    }

    #[test]
    fn parse_when_returns_required_date_for_bare_date() {
        let when = parse_when(" 2025-03-10 ");
        assert_eq!(when.instant, None);
        assert_eq!(when.required_date, NaiveDate::from_ymd_opt(2025, 3, 10));
    }

    #[test]
    fn parse_when_degrades_to_empty_for_garbage() {
        assert!(parse_when("not a date").is_empty());
        assert!(parse_when("").is_empty());
        assert!(parse_when("2025-02-30").is_empty());
        assert!(parse_when("2025-03-10T25:00").is_empty());
    }

    #[test]
    fn parse_anchor_treats_bare_date_as_midnight() {
        assert_eq!(parse_anchor("2025-03-10"), Some(at(2025, 3, 10, 0, 0)));
        assert_eq!(parse_anchor("tomorrow"), None);
    }
}
