//! Date-range selection engine.
//! Parses typed dates, validates start/end pairs against a bounded window, builds
//! 6-week month grids, and resolves named presets. Rendering is left to the caller:
//! the [`controller::RangeController`] consumes intents and hands back plain data.

pub mod core {
    use crate::validate::Rejection;
    use chrono::format::{Item, Numeric, StrftimeItems};
    use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /* ------------------------------- Dates ------------------------------- */

    /// A single calendar day.
    ///
    /// Selection logic works at day granularity. Use [`CalendarDate::start_of_day`] and
    /// [`CalendarDate::end_of_day`] when a host needs to compare against instants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CalendarDate(pub NaiveDate);

    impl CalendarDate {
        pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
            NaiveDate::from_ymd_opt(year, month, day).map(Self)
        }

        pub fn date(self) -> NaiveDate {
            self.0
        }

        pub fn year(self) -> i32 {
            self.0.year()
        }

        pub fn month(self) -> u32 {
            self.0.month()
        }

        pub fn day(self) -> u32 {
            self.0.day()
        }

        pub fn is_before(self, other: Self) -> bool {
            self.0 < other.0
        }

        pub fn is_after(self, other: Self) -> bool {
            self.0 > other.0
        }

        pub fn is_same(self, other: Self) -> bool {
            self.0 == other.0
        }

        /// Shift by a signed number of units. Month and year shifts clamp to the last
        /// day of the target month (Jan 31 + 1 month = Feb 28/29).
        pub fn shift(self, amount: i64, unit: TimeUnit) -> Option<Self> {
            let shifted = match unit {
                TimeUnit::Day => self.0.checked_add_signed(Duration::try_days(amount)?),
                TimeUnit::Week => self.0.checked_add_signed(Duration::try_weeks(amount)?),
                TimeUnit::Month => shift_months(self.0, amount),
                TimeUnit::Year => shift_months(self.0, amount.checked_mul(12)?),
            };
            shifted.map(Self)
        }

        pub fn add_days(self, days: i64) -> Option<Self> {
            self.shift(days, TimeUnit::Day)
        }

        pub fn start_of_month(self) -> Self {
            Self(self.0 - Duration::days(i64::from(self.0.day0())))
        }

        pub fn end_of_month(self) -> Self {
            let remaining = days_in_month(self.0.year(), self.0.month()) - self.0.day();
            Self(self.0 + Duration::days(i64::from(remaining)))
        }

        pub fn start_of_year(self) -> Self {
            Self(self.0 - Duration::days(i64::from(self.0.ordinal0())))
        }

        pub fn is_last_day_of_month(self) -> bool {
            self == self.end_of_month()
        }

        /// First instant of the day (inclusive lower bound).
        pub fn start_of_day(self) -> NaiveDateTime {
            self.0.and_time(NaiveTime::MIN)
        }

        /// Last millisecond of the day (inclusive upper bound).
        pub fn end_of_day(self) -> NaiveDateTime {
            self.0
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap_or_else(|| self.start_of_day())
        }
    }

    impl From<NaiveDate> for CalendarDate {
        fn from(date: NaiveDate) -> Self {
            Self(date)
        }
    }

    impl fmt::Display for CalendarDate {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
        let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        if months >= 0 {
            date.checked_add_months(count)
        } else {
            date.checked_sub_months(count)
        }
    }

    fn days_in_month(year: i32, month: u32) -> u32 {
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
            _ => 28,
        }
    }

    /// Calendar units used by relative phrases and keyboard stepping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TimeUnit {
        Day,
        Week,
        Month,
        Year,
    }

    impl TimeUnit {
        /// Accepts singular and plural unit words, case-insensitively.
        pub fn from_word(word: &str) -> Option<Self> {
            let lower = word.to_ascii_lowercase();
            match lower.strip_suffix('s').unwrap_or(&lower) {
                "day" => Some(Self::Day),
                "week" => Some(Self::Week),
                "month" => Some(Self::Month),
                "year" => Some(Self::Year),
                _ => None,
            }
        }
    }

    impl fmt::Display for TimeUnit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let word = match self {
                Self::Day => "day",
                Self::Week => "week",
                Self::Month => "month",
                Self::Year => "year",
            };
            f.write_str(word)
        }
    }

    /* ------------------------------- Bounds ------------------------------- */

    /// Inclusive window every resolvable date must fall into. Built through
    /// [`DateBounds::new`] so `earliest <= latest` always holds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct DateBounds {
        pub earliest: CalendarDate,
        pub latest: CalendarDate,
    }

    impl DateBounds {
        pub fn new(earliest: CalendarDate, latest: CalendarDate) -> Result<Self, ConfigError> {
            if earliest.is_after(latest) {
                return Err(ConfigError::InvertedBounds { earliest, latest });
            }
            Ok(Self { earliest, latest })
        }

        pub fn contains(&self, date: CalendarDate) -> bool {
            !date.is_before(self.earliest) && !date.is_after(self.latest)
        }

        /// `earliest` counts from its start of day, `latest` through its end of day.
        pub fn contains_instant(&self, at: NaiveDateTime) -> bool {
            at >= self.earliest.start_of_day() && at <= self.latest.end_of_day()
        }

        pub fn clamp(&self, date: CalendarDate) -> CalendarDate {
            date.max(self.earliest).min(self.latest)
        }
    }

    impl Default for DateBounds {
        fn default() -> Self {
            Self {
                earliest: CalendarDate(
                    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
                ),
                latest: CalendarDate(
                    NaiveDate::from_ymd_opt(2900, 12, 31).unwrap_or(NaiveDate::MAX),
                ),
            }
        }
    }

    /* ------------------------------ Selection ------------------------------ */

    /// Whether the widget edits one date or a start/end pair. Fixed at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SelectionMode {
        Single,
        #[default]
        Range,
    }

    impl fmt::Display for SelectionMode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Single => f.write_str("single"),
                Self::Range => f.write_str("range"),
            }
        }
    }

    /// The input field an intent targets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Side {
        Start,
        End,
        /// The single date in `Single` mode (also the navigation anchor in `Range` mode).
        Current,
    }

    impl RangeState {
        /// Date the calendar opens on: `current`, else `start`, else `end`, else
        /// today clamped into `bounds`.
        pub fn anchor(&self, bounds: &DateBounds, today: CalendarDate) -> CalendarDate {
            self.current
                .or(self.start)
                .or(self.end)
                .unwrap_or_else(|| bounds.clamp(today))
        }
    }

    impl fmt::Display for Side {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Start => f.write_str("start"),
                Self::End => f.write_str("end"),
                Self::Current => f.write_str("current"),
            }
        }
    }

    /// Committed selection. In range mode `start <= end`, and `start == end` only
    /// when `same_day_allowed`.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct RangeState {
        pub start: Option<CalendarDate>,
        pub end: Option<CalendarDate>,
        pub current: Option<CalendarDate>,
        pub same_day_allowed: bool,
    }

    /* ------------------------------ Formatting ------------------------------ */

    /// strftime-style patterns used to display and parse dates.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DisplayFormats {
        pub date: String,
        pub year: String,
        pub month: String,
    }

    impl Default for DisplayFormats {
        fn default() -> Self {
            Self {
                date: "%B %-d, %Y".to_string(),
                year: "%Y".to_string(),
                month: "%B".to_string(),
            }
        }
    }

    impl DisplayFormats {
        pub fn new(date: &str, year: &str, month: &str) -> Result<Self, ConfigError> {
            for pattern in [date, year, month] {
                if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                    return Err(ConfigError::InvalidFormat(pattern.to_string()));
                }
            }
            Ok(Self {
                date: date.to_string(),
                year: year.to_string(),
                month: month.to_string(),
            })
        }

        /// Whether the date pattern carries a year on its own.
        pub fn date_has_year(&self) -> bool {
            StrftimeItems::new(&self.date).any(|item| {
                matches!(
                    item,
                    Item::Numeric(
                        Numeric::Year | Numeric::YearMod100 | Numeric::IsoYear | Numeric::IsoYearMod100,
                        _
                    )
                )
            })
        }

        pub fn format_date(&self, date: CalendarDate) -> String {
            format_with(date, &self.date)
        }

        pub fn format_year(&self, date: CalendarDate) -> String {
            format_with(date, &self.year)
        }

        pub fn format_month(&self, date: CalendarDate) -> String {
            format_with(date, &self.month)
        }
    }

    /// Render `date` with a strftime pattern; falls back to ISO when the pattern
    /// cannot be rendered for a plain date (e.g. it asks for an hour).
    pub fn format_with(date: CalendarDate, pattern: &str) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        if write!(out, "{}", date.0.format(pattern)).is_err() {
            return date.to_string();
        }
        out
    }

    /* -------------------------------- Clock -------------------------------- */

    /// Source of "today" for keywords, defaults, and presets.
    pub trait Clock {
        fn today(&self) -> CalendarDate;
    }

    /// Local wall-clock date.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn today(&self) -> CalendarDate {
            CalendarDate(Local::now().date_naive())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FixedClock(pub CalendarDate);

    impl Clock for FixedClock {
        fn today(&self) -> CalendarDate {
            self.0
        }
    }

    /* ---------------------------- Errors (setup) ---------------------------- */

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum ConfigError {
        #[error("earliest date {earliest} is after latest date {latest}")]
        InvertedBounds {
            earliest: CalendarDate,
            latest: CalendarDate,
        },
        #[error("{field} cannot be set in {mode} mode")]
        ModeMismatch {
            mode: SelectionMode,
            field: &'static str,
        },
        #[error("invalid display format {0:?}")]
        InvalidFormat(String),
        #[error("{field} {date} lies outside {earliest}..={latest}")]
        OutOfBounds {
            field: &'static str,
            date: CalendarDate,
            earliest: CalendarDate,
            latest: CalendarDate,
        },
        #[error("initial range rejected: {0}")]
        InvalidRange(#[from] Rejection),
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn d(y: i32, m: u32, day: u32) -> CalendarDate {
            CalendarDate::from_ymd(y, m, day).unwrap()
        }

        #[test]
        fn month_shift_clamps_to_month_end() {
            assert_eq!(d(2024, 1, 31).shift(1, TimeUnit::Month), Some(d(2024, 2, 29)));
            assert_eq!(d(2023, 3, 31).shift(-1, TimeUnit::Month), Some(d(2023, 2, 28)));
            assert_eq!(d(2024, 2, 29).shift(1, TimeUnit::Year), Some(d(2025, 2, 28)));
            assert_eq!(d(2024, 3, 10).shift(-2, TimeUnit::Week), Some(d(2024, 2, 25)));
        }

        #[test]
        fn month_and_year_boundaries() {
            assert_eq!(d(2024, 2, 17).start_of_month(), d(2024, 2, 1));
            assert_eq!(d(2024, 2, 17).end_of_month(), d(2024, 2, 29));
            assert_eq!(d(2100, 2, 3).end_of_month(), d(2100, 2, 28));
            assert_eq!(d(2024, 12, 5).end_of_month(), d(2024, 12, 31));
            assert_eq!(d(2024, 6, 15).start_of_year(), d(2024, 1, 1));
            assert!(d(2024, 4, 30).is_last_day_of_month());
            assert!(!d(2024, 4, 29).is_last_day_of_month());
        }

        #[test]
        fn bounds_are_inclusive_at_day_edges() {
            let bounds = DateBounds::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
            assert!(bounds.contains(d(2024, 1, 1)));
            assert!(bounds.contains(d(2024, 1, 31)));
            assert!(!bounds.contains(d(2024, 2, 1)));
            assert!(bounds.contains_instant(d(2024, 1, 31).end_of_day()));
            assert!(!bounds.contains_instant(d(2023, 12, 31).end_of_day()));
            assert_eq!(bounds.clamp(d(2030, 1, 1)), d(2024, 1, 31));
        }

        #[test]
        fn anchor_prefers_current_then_start_then_end() {
            let bounds = DateBounds::new(d(2024, 1, 1), d(2024, 3, 31)).unwrap();
            let mut state = RangeState {
                start: Some(d(2024, 2, 1)),
                end: Some(d(2024, 2, 20)),
                current: Some(d(2024, 3, 3)),
                same_day_allowed: false,
            };
            assert_eq!(state.anchor(&bounds, d(2024, 6, 1)), d(2024, 3, 3));
            state.current = None;
            assert_eq!(state.anchor(&bounds, d(2024, 6, 1)), d(2024, 2, 1));
            state.start = None;
            assert_eq!(state.anchor(&bounds, d(2024, 6, 1)), d(2024, 2, 20));
            state.end = None;
            assert_eq!(state.anchor(&bounds, d(2024, 6, 1)), d(2024, 3, 31));
        }

        #[test]
        fn inverted_bounds_are_a_config_error() {
            let err = DateBounds::new(d(2024, 2, 1), d(2024, 1, 1)).unwrap_err();
            assert!(matches!(err, ConfigError::InvertedBounds { .. }));
        }

        #[test]
        fn unit_words_accept_plurals() {
            assert_eq!(TimeUnit::from_word("Days"), Some(TimeUnit::Day));
            assert_eq!(TimeUnit::from_word("month"), Some(TimeUnit::Month));
            assert_eq!(TimeUnit::from_word("fortnight"), None);
        }

        #[test]
        fn display_formats_reject_bad_patterns() {
            assert!(DisplayFormats::new("%Y-%m-%d", "%Y", "%B").is_ok());
            assert!(matches!(
                DisplayFormats::new("%Q", "%Y", "%B"),
                Err(ConfigError::InvalidFormat(_))
            ));
            let formats = DisplayFormats::default();
            assert_eq!(formats.format_date(d(2024, 4, 5)), "April 5, 2024");
            assert_eq!(formats.format_month(d(2024, 4, 5)), "April");
        }
    }
}

pub mod parser {
    //! Turns typed input into calendar dates.
    //!
    //! Input is classified into a [`RawInput`] first, then resolved against a
    //! [`ParseContext`]. Resolution order:
    //! - keywords: `today`/`now` (clamped to the latest bound), `earliest`, `latest`;
    //! - relative phrases: `3 weeks ago`, `1 month ahead` (relative to the anchor date);
    //! - the display format, after ordinal suffixes are stripped and two-word input
    //!   such as `April 5th` gets the current year appended;
    //! - ISO `YYYY-MM-DD`.
    //!
    //! Anything else is a [`DateError`]; callers keep their previous value.

    use crate::core::*;
    use chrono::NaiveDate;
    use nom::{
        IResult,
        branch::alt,
        bytes::complete::tag_no_case,
        character::complete::{alpha1, digit1, space1},
        combinator::{all_consuming, map_opt, map_res, value},
        error::VerboseError,
        sequence::{pair, tuple},
    };
    use serde::{Deserialize, Serialize};
    use std::fmt;

    const ISO_FORMAT: &str = "%Y-%m-%d";

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    /* ------------------------------ Raw input ------------------------------ */

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Keyword {
        Today,
        Now,
        Earliest,
        Latest,
        /// Year to date; expands to a whole start/end pair.
        Ytd,
    }

    impl Keyword {
        fn from_word(word: &str) -> Option<Self> {
            [
                ("today", Self::Today),
                ("now", Self::Now),
                ("earliest", Self::Earliest),
                ("latest", Self::Latest),
                ("ytd", Self::Ytd),
            ]
            .into_iter()
            .find(|(text, _)| word.eq_ignore_ascii_case(text))
            .map(|(_, keyword)| keyword)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Direction {
        Ago,
        Ahead,
    }

    /// `<amount> <unit> ago|ahead`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RelativePhrase {
        pub amount: u32,
        pub unit: TimeUnit,
        pub direction: Direction,
    }

    impl RelativePhrase {
        pub fn signed_amount(&self) -> i64 {
            match self.direction {
                Direction::Ago => -i64::from(self.amount),
                Direction::Ahead => i64::from(self.amount),
            }
        }
    }

    impl fmt::Display for RelativePhrase {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let direction = match self.direction {
                Direction::Ago => "ago",
                Direction::Ahead => "ahead",
            };
            write!(f, "{} {}(s) {}", self.amount, self.unit, direction)
        }
    }

    /// Date input as it arrives from the presentation layer.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind", content = "value", rename_all = "lowercase")]
    pub enum RawInput {
        Keyword(Keyword),
        Relative(RelativePhrase),
        Formatted(String),
        Concrete(CalendarDate),
    }

    impl RawInput {
        pub fn classify(text: &str) -> Self {
            let trimmed = text.trim();
            if let Some(keyword) = Keyword::from_word(trimmed) {
                return Self::Keyword(keyword);
            }
            if let Ok((_, phrase)) = all_consuming(relative_phrase)(trimmed) {
                return Self::Relative(phrase);
            }
            Self::Formatted(trimmed.to_string())
        }

        pub fn is_ytd(&self) -> bool {
            matches!(self, Self::Keyword(Keyword::Ytd))
        }
    }

    impl From<CalendarDate> for RawInput {
        fn from(date: CalendarDate) -> Self {
            Self::Concrete(date)
        }
    }

    /* ------------------------------ Resolution ------------------------------ */

    /// Everything resolution depends on besides the input itself.
    #[derive(Debug, Clone, Copy)]
    pub struct ParseContext<'a> {
        pub today: CalendarDate,
        pub bounds: DateBounds,
        /// Base for relative phrases.
        pub current_anchor: CalendarDate,
        pub formats: &'a DisplayFormats,
    }

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum DateError {
        #[error("empty date input")]
        Empty,
        #[error("`ytd` only applies to a start/end pair")]
        PairKeyword,
        #[error("{0} is out of the representable date range")]
        Overflow(RelativePhrase),
        #[error("unrecognized date {0:?}")]
        Unrecognized(String),
    }

    pub fn parse(text: &str, ctx: &ParseContext<'_>) -> Result<CalendarDate, DateError> {
        resolve(&RawInput::classify(text), ctx)
    }

    pub fn resolve(input: &RawInput, ctx: &ParseContext<'_>) -> Result<CalendarDate, DateError> {
        match input {
            RawInput::Concrete(date) => Ok(*date),
            RawInput::Keyword(Keyword::Today | Keyword::Now) => {
                if ctx.today.is_after(ctx.bounds.latest) {
                    Ok(ctx.bounds.latest)
                } else {
                    Ok(ctx.today)
                }
            }
            RawInput::Keyword(Keyword::Earliest) => Ok(ctx.bounds.earliest),
            RawInput::Keyword(Keyword::Latest) => Ok(ctx.bounds.latest),
            RawInput::Keyword(Keyword::Ytd) => Err(DateError::PairKeyword),
            RawInput::Relative(phrase) => ctx
                .current_anchor
                .shift(phrase.signed_amount(), phrase.unit)
                .ok_or(DateError::Overflow(*phrase)),
            RawInput::Formatted(text) => parse_formatted(text, ctx),
        }
    }

    fn parse_formatted(text: &str, ctx: &ParseContext<'_>) -> Result<CalendarDate, DateError> {
        let mut tokens: Vec<String> = text.split_whitespace().map(strip_ordinal).collect();
        if tokens.is_empty() {
            return Err(DateError::Empty);
        }
        let typed = tokens.join(" ");
        let formats = ctx.formats;
        // "April 5" -> "April 5 2024"; no rollover into next year. A year-less
        // display pattern always takes the current year.
        let (candidate, pattern) = if formats.date_has_year() {
            if tokens.len() == 2 {
                tokens.push(formats.format_year(ctx.today));
            }
            (tokens.join(" "), formats.date.clone())
        } else {
            (
                format!("{typed} {}", formats.format_year(ctx.today)),
                format!("{} {}", formats.date, formats.year),
            )
        };
        parse_with_format(&candidate, &pattern)
            .or_else(|| parse_with_format(&typed, ISO_FORMAT))
            .ok_or_else(|| DateError::Unrecognized(text.to_string()))
    }

    /// Parse `input` with a strftime pattern. A strict attempt is followed by one
    /// where commas count as whitespace, so `April 5 2024` matches `%B %-d, %Y`.
    pub fn parse_with_format(input: &str, pattern: &str) -> Option<CalendarDate> {
        if let Ok(date) = NaiveDate::parse_from_str(input, pattern) {
            return Some(CalendarDate(date));
        }
        NaiveDate::parse_from_str(&relax(input), &relax(pattern))
            .ok()
            .map(CalendarDate)
    }

    fn relax(s: &str) -> String {
        s.replace(',', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /* ------------------------------ Combinators ------------------------------ */

    fn relative_phrase(i: &str) -> PResult<'_, RelativePhrase> {
        let (i, (amount, _, unit, _, direction)) = tuple((
            map_res(digit1, |s: &str| s.parse::<u32>()),
            space1,
            map_opt(alpha1, TimeUnit::from_word),
            space1,
            alt((
                value(Direction::Ago, tag_no_case("ago")),
                value(Direction::Ahead, tag_no_case("ahead")),
            )),
        ))(i)?;
        Ok((
            i,
            RelativePhrase {
                amount,
                unit,
                direction,
            },
        ))
    }

    /// `5th,` -> `5,`. Only a suffix directly after leading digits is removed.
    fn strip_ordinal(token: &str) -> String {
        let suffix = alt((
            tag_no_case("st"),
            tag_no_case("nd"),
            tag_no_case("rd"),
            tag_no_case("th"),
        ));
        let parsed: PResult<'_, (&str, &str)> = pair(digit1, suffix)(token);
        match parsed {
            Ok((rest, (digits, _))) if !rest.starts_with(|c: char| c.is_alphanumeric()) => {
                format!("{digits}{rest}")
            }
            _ => token.to_string(),
        }
    }

}

pub mod validate {
    //! Accept/reject rules for candidate selections.

    use crate::core::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    pub enum Rejection {
        #[error("missing {0} date")]
        MissingEndpoint(Side),
        #[error("start {start} is after end {end}")]
        StartAfterEnd {
            start: CalendarDate,
            end: CalendarDate,
        },
        #[error("start and end are both {0} and same-day ranges are not allowed")]
        SameDay(CalendarDate),
        #[error("{date} is before the earliest allowed date {earliest}")]
        BeforeEarliest {
            date: CalendarDate,
            earliest: CalendarDate,
        },
        #[error("{date} is after the latest allowed date {latest}")]
        AfterLatest {
            date: CalendarDate,
            latest: CalendarDate,
        },
    }

    /// Check a start/end pair. `None` stands for an endpoint that never resolved.
    pub fn validate(
        start: Option<CalendarDate>,
        end: Option<CalendarDate>,
        bounds: &DateBounds,
        same_day_allowed: bool,
    ) -> Result<(), Rejection> {
        let start = start.ok_or(Rejection::MissingEndpoint(Side::Start))?;
        let end = end.ok_or(Rejection::MissingEndpoint(Side::End))?;
        if start.is_after(end) {
            return Err(Rejection::StartAfterEnd { start, end });
        }
        if start.is_same(end) && !same_day_allowed {
            return Err(Rejection::SameDay(start));
        }
        if start.is_before(bounds.earliest) {
            return Err(Rejection::BeforeEarliest {
                date: start,
                earliest: bounds.earliest,
            });
        }
        if end.is_after(bounds.latest) {
            return Err(Rejection::AfterLatest {
                date: end,
                latest: bounds.latest,
            });
        }
        Ok(())
    }

    pub fn validate_single(
        current: Option<CalendarDate>,
        bounds: &DateBounds,
    ) -> Result<(), Rejection> {
        let current = current.ok_or(Rejection::MissingEndpoint(Side::Current))?;
        if current.is_before(bounds.earliest) {
            return Err(Rejection::BeforeEarliest {
                date: current,
                earliest: bounds.earliest,
            });
        }
        if current.is_after(bounds.latest) {
            return Err(Rejection::AfterLatest {
                date: current,
                latest: bounds.latest,
            });
        }
        Ok(())
    }

    /// `ytd` on either field: first of this year through today (capped at `latest`).
    pub fn expand_ytd(today: CalendarDate, bounds: &DateBounds) -> (CalendarDate, CalendarDate) {
        (today.start_of_year(), today.min(bounds.latest))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn d(y: i32, m: u32, day: u32) -> CalendarDate {
            CalendarDate::from_ymd(y, m, day).unwrap()
        }

        #[test]
        fn rejects_iff_ordered_wrong_or_out_of_bounds() {
            let bounds = DateBounds::new(d(2024, 1, 5), d(2024, 1, 25)).unwrap();
            let days: Vec<CalendarDate> = d(2024, 1, 1).0.iter_days().take(30).map(CalendarDate).collect();
            for &s in &days {
                for &e in &days {
                    let strict = validate(Some(s), Some(e), &bounds, false);
                    let expect_reject = s >= e || !bounds.contains(s) || !bounds.contains(e);
                    assert_eq!(strict.is_err(), expect_reject, "{s}..{e} (same day not allowed)");

                    let relaxed = validate(Some(s), Some(e), &bounds, true);
                    let expect_reject = s > e || !bounds.contains(s) || !bounds.contains(e);
                    assert_eq!(relaxed.is_err(), expect_reject, "{s}..{e} (same day allowed)");
                }
            }
        }

        #[test]
        fn reasons_name_the_failed_rule() {
            let bounds = DateBounds::new(d(2024, 1, 1), d(2024, 12, 31)).unwrap();
            assert_eq!(
                validate(Some(d(2024, 3, 2)), Some(d(2024, 3, 1)), &bounds, false),
                Err(Rejection::StartAfterEnd {
                    start: d(2024, 3, 2),
                    end: d(2024, 3, 1)
                })
            );
            assert_eq!(
                validate(Some(d(2024, 3, 1)), Some(d(2024, 3, 1)), &bounds, false),
                Err(Rejection::SameDay(d(2024, 3, 1)))
            );
            assert!(matches!(
                validate(Some(d(2023, 12, 1)), Some(d(2024, 3, 1)), &bounds, false),
                Err(Rejection::BeforeEarliest { .. })
            ));
            assert!(matches!(
                validate(Some(d(2024, 3, 1)), Some(d(2025, 1, 1)), &bounds, false),
                Err(Rejection::AfterLatest { .. })
            ));
            assert_eq!(
                validate(None, Some(d(2024, 3, 1)), &bounds, false),
                Err(Rejection::MissingEndpoint(Side::Start))
            );
        }

        #[test]
        fn single_dates_only_check_bounds() {
            let bounds = DateBounds::new(d(2024, 1, 1), d(2024, 12, 31)).unwrap();
            assert_eq!(validate_single(Some(d(2024, 7, 4)), &bounds), Ok(()));
            assert!(validate_single(Some(d(2025, 1, 1)), &bounds).is_err());
            assert!(validate_single(None, &bounds).is_err());
        }

        #[test]
        fn ytd_is_capped_by_latest() {
            let bounds = DateBounds::new(d(2000, 1, 1), d(2024, 3, 1)).unwrap();
            assert_eq!(
                expand_ytd(d(2024, 6, 15), &bounds),
                (d(2024, 1, 1), d(2024, 3, 1))
            );
            assert_eq!(
                expand_ytd(d(2024, 2, 10), &bounds),
                (d(2024, 1, 1), d(2024, 2, 10))
            );
        }
    }
}

pub mod grid {
    //! Six-week month grids and the hover preview used while choosing the
    //! second endpoint of a range.

    use crate::core::*;
    use chrono::{Datelike, Weekday};
    use serde::{Deserialize, Serialize};

    /// Six weeks of seven days.
    pub const GRID_CELLS: usize = 42;
    pub const DAYS_PER_WEEK: usize = 7;
    /// Span of the counterpart date offered when a pick lands past the fixed endpoint.
    pub const PAIRED_SPAN_DAYS: i64 = 6;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GridCell {
        pub date: CalendarDate,
        pub day_of_month: u32,
        pub is_start: bool,
        pub is_end: bool,
        pub is_current: bool,
        pub is_selected: bool,
        pub is_outside_bounds: bool,
        /// Leading/trailing day from a neighbouring month (rendered faded).
        pub is_outside_month: bool,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MonthGrid {
        /// First day of the displayed month.
        pub month: CalendarDate,
        pub cells: Vec<GridCell>,
    }

    impl MonthGrid {
        pub fn weeks(&self) -> std::slice::Chunks<'_, GridCell> {
            self.cells.chunks(DAYS_PER_WEEK)
        }

        pub fn in_month(&self) -> impl Iterator<Item = &GridCell> {
            self.cells.iter().filter(|cell| !cell.is_outside_month)
        }
    }

    /// The dates a grid highlights.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Selection {
        pub start: Option<CalendarDate>,
        pub end: Option<CalendarDate>,
        pub current: Option<CalendarDate>,
    }

    impl Selection {
        /// Inclusive on both ends; false unless both endpoints are set.
        pub fn contains(&self, date: CalendarDate) -> bool {
            match (self.start, self.end) {
                (Some(start), Some(end)) => !date.is_before(start) && !date.is_after(end),
                _ => false,
            }
        }
    }

    impl From<&RangeState> for Selection {
        fn from(state: &RangeState) -> Self {
            Self {
                start: state.start,
                end: state.end,
                current: state.current,
            }
        }
    }

    /// Number of faded days before the 1st so the grid starts on `week_start`.
    pub fn leading_days(first: CalendarDate, week_start: Weekday) -> u32 {
        (first.0.weekday().num_days_from_sunday() + 7 - week_start.num_days_from_sunday()) % 7
    }

    /// Build the grid for the month containing `anchor`.
    ///
    /// Leading days only count as out of bounds when before `earliest`, trailing days
    /// only when after `latest`; in-month days check both ends.
    pub fn build(
        selection: &Selection,
        anchor: CalendarDate,
        bounds: &DateBounds,
        week_start: Weekday,
    ) -> MonthGrid {
        let first = anchor.start_of_month();
        let last = anchor.end_of_month();
        let leading = leading_days(first, week_start);
        let origin = first.add_days(-i64::from(leading)).unwrap_or(first);

        let cells = origin
            .0
            .iter_days()
            .take(GRID_CELLS)
            .map(CalendarDate)
            .map(|date| {
                let (is_outside_month, is_outside_bounds) = if date.is_before(first) {
                    (true, date.is_before(bounds.earliest))
                } else if date.is_after(last) {
                    (true, date.is_after(bounds.latest))
                } else {
                    (false, !bounds.contains(date))
                };
                GridCell {
                    date,
                    day_of_month: date.day(),
                    is_start: selection.start == Some(date),
                    is_end: selection.end == Some(date),
                    is_current: selection.current == Some(date),
                    is_selected: selection.contains(date),
                    is_outside_bounds,
                    is_outside_month,
                }
            })
            .collect();

        MonthGrid {
            month: first,
            cells,
        }
    }

    /* ------------------------------ Hover preview ------------------------------ */

    /// Provisional highlight while the pointer rests on `hovered`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PreviewWindow {
        pub hovered: CalendarDate,
        /// Days drawn as a provisional ("maybe") selection, in walk order.
        pub maybe: Vec<CalendarDate>,
        /// Counterpart endpoint paired with `hovered` when it lands past the fixed one.
        pub other: Option<CalendarDate>,
    }

    /// Walk from `hovered` toward `fixed` (forward when editing the start, backward
    /// when editing the end), marking the days in between.
    ///
    /// When `hovered` is on the far side of `fixed`, the walk instead spans up to six
    /// days away from it (stopping at the bounds) and the day it stops on becomes
    /// the paired `other` endpoint.
    pub fn preview(
        side: Side,
        fixed: Option<CalendarDate>,
        hovered: CalendarDate,
        bounds: &DateBounds,
        same_day_allowed: bool,
    ) -> PreviewWindow {
        let (step, fixed) = match (side, fixed) {
            (Side::Start, Some(fixed)) => (1, fixed),
            (Side::End, Some(fixed)) => (-1, fixed),
            _ => {
                return PreviewWindow {
                    hovered,
                    maybe: vec![hovered],
                    other: None,
                };
            }
        };

        let mut maybe = Vec::new();
        let mut other = None;
        let mut cur = hovered;
        for i in 0..GRID_CELLS {
            let Some(next) = cur.add_days(step) else {
                break;
            };
            if next == fixed || (same_day_allowed && cur == fixed) {
                break;
            }
            let crossed = if step > 0 {
                cur.is_after(fixed)
            } else {
                cur.is_before(fixed)
            };
            if crossed {
                if other.is_none() {
                    other = cur.add_days(step * PAIRED_SPAN_DAYS);
                }
                let leaves_bounds = if step > 0 {
                    next.is_after(bounds.latest)
                } else {
                    next.is_before(bounds.earliest)
                };
                if i as i64 >= PAIRED_SPAN_DAYS || leaves_bounds {
                    other = Some(cur);
                    break;
                }
            }
            maybe.push(next);
            cur = next;
        }

        PreviewWindow {
            hovered,
            maybe,
            other,
        }
    }

}

pub mod presets {
    //! Named quick ranges ("Last 30 days", "Last year", ...) resolved against a
    //! reference date. Presets that would start before the earliest allowed date are
    //! dropped from the offered list, never clamped.

    use crate::core::*;
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use tracing::debug;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind", content = "count", rename_all = "lowercase")]
    pub enum PresetExtent {
        Days(u32),
        Months(u32),
        All,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PresetSpec {
        pub id: String,
        pub label: String,
        pub extent: PresetExtent,
    }

    impl PresetSpec {
        pub fn new(id: &str, label: &str, extent: PresetExtent) -> Self {
            Self {
                id: id.to_string(),
                label: label.to_string(),
                extent,
            }
        }
    }

    /// The stock preset list, in display order.
    pub fn default_catalogue() -> Vec<PresetSpec> {
        vec![
            PresetSpec::new("last-30-days", "Last 30 days", PresetExtent::Days(30)),
            PresetSpec::new("last-month", "Last month", PresetExtent::Months(1)),
            PresetSpec::new("last-3-months", "Last 3 months", PresetExtent::Months(3)),
            PresetSpec::new("last-6-months", "Last 6 months", PresetExtent::Months(6)),
            PresetSpec::new("last-year", "Last year", PresetExtent::Months(12)),
            PresetSpec::new("all-time", "All time", PresetExtent::All),
        ]
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PresetRange {
        pub first_day: CalendarDate,
        pub last_day: CalendarDate,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PresetOutcome {
        Resolved(PresetRange),
        Dropped,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ResolvedPreset {
        pub id: String,
        pub label: String,
        pub range: PresetRange,
    }

    /// Resolve one preset.
    ///
    /// Month presets cover whole months: when `reference` is the last day of its month
    /// that month counts as complete, otherwise the range ends at the previous
    /// month's end. The twelve-month preset starts on the last day of the month 12
    /// (or 13) months back.
    pub fn resolve(
        extent: PresetExtent,
        reference: CalendarDate,
        earliest: CalendarDate,
    ) -> PresetOutcome {
        match compute(extent, reference, earliest) {
            Some(range) if !range.first_day.is_before(earliest) => PresetOutcome::Resolved(range),
            _ => PresetOutcome::Dropped,
        }
    }

    fn compute(
        extent: PresetExtent,
        reference: CalendarDate,
        earliest: CalendarDate,
    ) -> Option<PresetRange> {
        let range = match extent {
            PresetExtent::Days(count) => PresetRange {
                first_day: reference.add_days(-i64::from(count.saturating_sub(1)))?,
                last_day: reference,
            },
            PresetExtent::All => PresetRange {
                first_day: earliest,
                last_day: reference,
            },
            PresetExtent::Months(count) => {
                let is_last = reference.is_last_day_of_month();
                let last_day = if is_last {
                    reference
                } else {
                    reference.shift(-1, TimeUnit::Month)?.end_of_month()
                };
                let first_day = if count == 12 {
                    let back = if is_last { 12 } else { 13 };
                    reference.shift(-back, TimeUnit::Month)?.end_of_month()
                } else {
                    let back = if is_last { count.saturating_sub(1) } else { count };
                    reference
                        .shift(-i64::from(back), TimeUnit::Month)?
                        .start_of_month()
                };
                PresetRange {
                    first_day,
                    last_day,
                }
            }
        };
        Some(range)
    }

    /// Resolve a catalogue, keeping display order and omitting dropped presets.
    pub fn resolve_all(
        catalogue: &[PresetSpec],
        reference: CalendarDate,
        earliest: CalendarDate,
    ) -> IndexMap<String, ResolvedPreset> {
        catalogue
            .iter()
            .filter_map(|spec| match resolve(spec.extent, reference, earliest) {
                PresetOutcome::Resolved(range) => Some((
                    spec.id.clone(),
                    ResolvedPreset {
                        id: spec.id.clone(),
                        label: spec.label.clone(),
                        range,
                    },
                )),
                PresetOutcome::Dropped => {
                    debug!(id = %spec.id, %earliest, "preset starts before earliest date; dropped");
                    None
                }
            })
            .collect()
    }

}

pub mod config {
    //! Construction options for a calendar instance.
    //!
    //! [`CalendarOptions`] is the loose, serde-friendly shape (every field optional);
    //! [`CalendarOptions::resolve`] checks it and produces a [`CalendarConfig`].

    use crate::core::*;
    use crate::validate;
    use anyhow::{Context, Result};
    use chrono::{NaiveDate, Weekday};
    use serde::{Deserialize, Serialize};
    use std::{fs, path::Path};

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub struct CalendarOptions {
        pub mode: SelectionMode,
        pub earliest_date: Option<NaiveDate>,
        pub latest_date: Option<NaiveDate>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub current_date: Option<NaiveDate>,
        pub same_day_allowed: bool,
        pub display_format: Option<String>,
        pub display_year_format: Option<String>,
        pub display_month_format: Option<String>,
        /// First column of the grid; Sunday when unset.
        pub week_start: Option<Weekday>,
    }

    /// Validated configuration plus the initial selection.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CalendarConfig {
        pub mode: SelectionMode,
        pub bounds: DateBounds,
        pub formats: DisplayFormats,
        pub week_start: Weekday,
        pub initial: RangeState,
    }

    impl CalendarOptions {
        pub fn from_json(text: &str) -> Result<Self> {
            serde_json::from_str(text).context("parsing calendar options")
        }

        pub fn load(path: &Path) -> Result<Self> {
            let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
            Self::from_json(&text).with_context(|| format!("loading {:?}", path))
        }

        /// Check the options and fill defaults. Range mode defaults to the month
        /// ending today, single mode to today; defaults are clamped into the bounds,
        /// explicit dates outside them are an error.
        pub fn resolve(&self, today: CalendarDate) -> Result<CalendarConfig, ConfigError> {
            let defaults = DateBounds::default();
            let bounds = DateBounds::new(
                self.earliest_date.map(CalendarDate).unwrap_or(defaults.earliest),
                self.latest_date.map(CalendarDate).unwrap_or(defaults.latest),
            )?;

            let stock = DisplayFormats::default();
            let formats = DisplayFormats::new(
                self.display_format.as_deref().unwrap_or(&stock.date),
                self.display_year_format.as_deref().unwrap_or(&stock.year),
                self.display_month_format.as_deref().unwrap_or(&stock.month),
            )?;

            let current = self
                .current_date
                .map(|date| in_bounds("current_date", CalendarDate(date), &bounds))
                .transpose()?;

            let initial = match self.mode {
                SelectionMode::Single => {
                    for (field, value) in [("start_date", self.start_date), ("end_date", self.end_date)] {
                        if value.is_some() {
                            return Err(ConfigError::ModeMismatch {
                                mode: self.mode,
                                field,
                            });
                        }
                    }
                    RangeState {
                        start: None,
                        end: None,
                        current: Some(current.unwrap_or_else(|| bounds.clamp(today))),
                        same_day_allowed: self.same_day_allowed,
                    }
                }
                SelectionMode::Range => {
                    let end = match self.end_date {
                        Some(date) => in_bounds("end_date", CalendarDate(date), &bounds)?,
                        None => bounds.clamp(today),
                    };
                    let start = match self.start_date {
                        Some(date) => in_bounds("start_date", CalendarDate(date), &bounds)?,
                        None => bounds.clamp(
                            end.shift(-1, TimeUnit::Month)
                                .unwrap_or(bounds.earliest),
                        ),
                    };
                    validate::validate(Some(start), Some(end), &bounds, self.same_day_allowed)?;
                    RangeState {
                        start: Some(start),
                        end: Some(end),
                        current,
                        same_day_allowed: self.same_day_allowed,
                    }
                }
            };

            Ok(CalendarConfig {
                mode: self.mode,
                bounds,
                formats,
                week_start: self.week_start.unwrap_or(Weekday::Sun),
                initial,
            })
        }
    }

    fn in_bounds(
        field: &'static str,
        date: CalendarDate,
        bounds: &DateBounds,
    ) -> Result<CalendarDate, ConfigError> {
        if bounds.contains(date) {
            Ok(date)
        } else {
            Err(ConfigError::OutOfBounds {
                field,
                date,
                earliest: bounds.earliest,
                latest: bounds.latest,
            })
        }
    }

}

pub mod controller {
    //! Orchestrates parsing, validation, grids and presets for one widget instance.
    //!
    //! The controller exclusively owns the committed [`RangeState`]. Every intent runs
    //! to completion and returns a fresh [`ViewOutput`]; rejected edits are dropped
    //! and the previous committed state is shown again. Hosts that share a controller
    //! across threads must serialize access themselves.

    use crate::config::{CalendarConfig, CalendarOptions};
    use crate::core::*;
    use crate::grid::{self, MonthGrid, PreviewWindow, Selection};
    use crate::parser::{self, DateError, ParseContext, RawInput};
    use crate::presets::{self, PresetSpec, ResolvedPreset};
    use crate::validate::{self, Rejection};
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use tracing::{debug, info, warn};

    /* -------------------------------- Phases -------------------------------- */

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "phase", content = "side", rename_all = "snake_case")]
    pub enum Phase {
        Closed,
        /// Calendar shown; picks go to this field.
        Open(Side),
        PresetOpen,
    }

    /* -------------------------------- Intents -------------------------------- */

    /// Everything the presentation layer can ask for.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "intent", rename_all = "snake_case")]
    pub enum Intent {
        OpenAt {
            side: Side,
            #[serde(default)]
            month: Option<CalendarDate>,
        },
        PickDate {
            date: CalendarDate,
        },
        Hover {
            date: CalendarDate,
        },
        TypeText {
            side: Side,
            text: String,
        },
        NavigateMonth {
            delta: i32,
        },
        NavigateYear {
            delta: i32,
        },
        StepCurrent {
            amount: i64,
            unit: TimeUnit,
        },
        SelectPreset {
            id: String,
        },
        Close {
            #[serde(default)]
            force: bool,
        },
        TogglePresets,
    }

    /* -------------------------------- Output -------------------------------- */

    /// Arrows that would leave the allowed window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct NavDisabled {
        pub prev_month: bool,
        pub next_month: bool,
        pub prev_year: bool,
        pub next_year: bool,
    }

    /// Committed dates rendered with the display format.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct FieldText {
        pub start: Option<String>,
        pub end: Option<String>,
        pub current: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ViewOutput {
        pub phase: Phase,
        pub month_label: String,
        pub year_label: String,
        pub grid: MonthGrid,
        pub state: RangeState,
        pub fields: FieldText,
        pub nav_disabled: NavDisabled,
        /// Offered presets; empty unless the preset panel is open.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub presets: Vec<ResolvedPreset>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub preview: Option<PreviewWindow>,
    }

    #[derive(Debug, thiserror::Error)]
    enum EditError {
        #[error(transparent)]
        Date(#[from] DateError),
        #[error(transparent)]
        Rejected(#[from] Rejection),
    }

    pub type CommitCallback = Box<dyn FnMut(&RangeState)>;

    /* ------------------------------ Controller ------------------------------ */

    pub struct RangeController {
        config: CalendarConfig,
        state: RangeState,
        phase: Phase,
        /// Month navigated to with the arrows; `None` follows the committed selection.
        view_anchor: Option<CalendarDate>,
        catalogue: Vec<PresetSpec>,
        presets: IndexMap<String, ResolvedPreset>,
        clock: Box<dyn Clock>,
        on_commit: Option<CommitCallback>,
    }

    impl RangeController {
        pub fn new(
            options: &CalendarOptions,
            clock: impl Clock + 'static,
        ) -> Result<Self, ConfigError> {
            let config = options.resolve(clock.today())?;
            Ok(Self::with_config(config, clock))
        }

        pub fn with_config(config: CalendarConfig, clock: impl Clock + 'static) -> Self {
            Self {
                state: config.initial.clone(),
                config,
                phase: Phase::Closed,
                view_anchor: None,
                catalogue: presets::default_catalogue(),
                presets: IndexMap::new(),
                clock: Box::new(clock),
                on_commit: None,
            }
        }

        /// Called once per successful commit with the new state.
        pub fn on_commit(mut self, callback: impl FnMut(&RangeState) + 'static) -> Self {
            self.on_commit = Some(Box::new(callback));
            self
        }

        pub fn with_presets(mut self, catalogue: Vec<PresetSpec>) -> Self {
            self.catalogue = catalogue;
            self
        }

        pub fn state(&self) -> &RangeState {
            &self.state
        }

        pub fn phase(&self) -> Phase {
            self.phase
        }

        pub fn config(&self) -> &CalendarConfig {
            &self.config
        }

        pub fn apply(&mut self, intent: Intent) -> ViewOutput {
            match intent {
                Intent::OpenAt { side, month } => self.open_at(side, month),
                Intent::PickDate { date } => self.pick_date(date),
                Intent::Hover { date } => {
                    let window = self.hover(date);
                    let mut out = self.output();
                    out.preview = Some(window);
                    out
                }
                Intent::TypeText { side, text } => self.type_text(side, &text),
                Intent::NavigateMonth { delta } => self.navigate_month(delta),
                Intent::NavigateYear { delta } => self.navigate_year(delta),
                Intent::StepCurrent { amount, unit } => self.step_current(amount, unit),
                Intent::SelectPreset { id } => self.select_preset(&id),
                Intent::Close { force } => self.close(force),
                Intent::TogglePresets => self.toggle_presets(),
            }
        }

        /* ------------------------------ Intents ------------------------------ */

        /// Show the calendar for `side`, optionally at a specific month.
        pub fn open_at(&mut self, side: Side, month: Option<CalendarDate>) -> ViewOutput {
            let side = match (self.config.mode, side) {
                (SelectionMode::Single, _) => Side::Current,
                (SelectionMode::Range, Side::Current) => Side::Start,
                (SelectionMode::Range, side) => side,
            };
            if let Some(anchor) = month {
                self.view_anchor = Some(anchor);
            }
            if self.phase == Phase::PresetOpen {
                debug!("preset panel closed by calendar open");
            }
            if let Err(rejection) = self.check_state(&self.state) {
                warn!(%rejection, "committed selection fails validation");
            }
            self.phase = Phase::Open(side);
            debug!(%side, anchor = %self.anchor(), "calendar opened");
            self.output()
        }

        pub fn pick_date(&mut self, date: CalendarDate) -> ViewOutput {
            match self.phase {
                Phase::Open(Side::Current) => self.pick_single(date),
                Phase::Open(Side::Start) => self.pick_start(date),
                Phase::Open(Side::End) => self.pick_end(date),
                Phase::Closed | Phase::PresetOpen => {
                    debug!(%date, phase = ?self.phase, "pick ignored; calendar not open");
                }
            }
            self.output()
        }

        /// Provisional highlight for the focused side; no state change.
        pub fn hover(&self, date: CalendarDate) -> PreviewWindow {
            let (side, fixed) = match self.phase {
                Phase::Open(Side::Start) => (Side::Start, self.state.end),
                Phase::Open(Side::End) => (Side::End, self.state.start),
                _ => (Side::Current, None),
            };
            grid::preview(
                side,
                fixed,
                date,
                &self.config.bounds,
                self.state.same_day_allowed,
            )
        }

        /// Resolve typed text for one field and commit it if the result is valid.
        /// `ytd` in either field replaces the whole range.
        pub fn type_text(&mut self, side: Side, text: &str) -> ViewOutput {
            match self.check_text(side, text) {
                Ok(next) => {
                    self.state = next;
                    self.view_anchor = None;
                    self.commit("typed");
                }
                Err(reason) => debug!(%side, text, %reason, "typed date discarded"),
            }
            self.output()
        }

        pub fn navigate_month(&mut self, delta: i32) -> ViewOutput {
            self.navigate(i64::from(delta), TimeUnit::Month)
        }

        pub fn navigate_year(&mut self, delta: i32) -> ViewOutput {
            self.navigate(i64::from(delta), TimeUnit::Year)
        }

        /// Nudge the current date (arrow keys); out-of-bounds steps are discarded.
        pub fn step_current(&mut self, amount: i64, unit: TimeUnit) -> ViewOutput {
            let base = self.state.current.unwrap_or_else(|| self.committed_anchor());
            match base.shift(amount, unit) {
                Some(next) if self.config.bounds.contains(next) => {
                    self.state.current = Some(next);
                    self.view_anchor = None;
                }
                _ => debug!(%base, amount, %unit, "step leaves the allowed window"),
            }
            self.output()
        }

        /// Return to `Closed`, keeping the committed selection. A plain close remembers
        /// the navigated month for the next open; a forced one forgets it.
        pub fn close(&mut self, force: bool) -> ViewOutput {
            if self.phase != Phase::Closed {
                debug!(phase = ?self.phase, force, "closing");
            }
            self.phase = Phase::Closed;
            if force {
                self.view_anchor = None;
            }
            self.output()
        }

        pub fn toggle_presets(&mut self) -> ViewOutput {
            if self.config.mode == SelectionMode::Single {
                debug!("presets are only offered in range mode");
                return self.output();
            }
            if self.phase == Phase::PresetOpen {
                self.phase = Phase::Closed;
            } else {
                self.presets = self.offered_presets();
                self.phase = Phase::PresetOpen;
            }
            self.output()
        }

        /// Commit a preset range as-is; unknown or dropped ids are ignored.
        pub fn select_preset(&mut self, id: &str) -> ViewOutput {
            if self.config.mode == SelectionMode::Single {
                debug!(id, "presets are only offered in range mode");
                return self.output();
            }
            // An open panel commits exactly the ranges it lists.
            if self.phase != Phase::PresetOpen {
                self.presets = self.offered_presets();
            }
            let picked = self.presets.get(id).map(|preset| preset.range);
            match picked {
                Some(range) => {
                    self.state.start = Some(range.first_day);
                    self.state.end = Some(range.last_day);
                    self.phase = Phase::Closed;
                    self.view_anchor = None;
                    self.commit("preset");
                }
                None => debug!(id, "unknown or dropped preset ignored"),
            }
            self.output()
        }

        /// Presets resolved against the committed end (or today), in display order.
        pub fn offered_presets(&self) -> IndexMap<String, ResolvedPreset> {
            let reference = self
                .config
                .bounds
                .clamp(self.state.end.unwrap_or_else(|| self.today()));
            presets::resolve_all(&self.catalogue, reference, self.config.bounds.earliest)
        }

        /// Snapshot of what the presentation layer should show.
        pub fn output(&self) -> ViewOutput {
            let anchor = self.anchor();
            let formats = &self.config.formats;
            let text = |date: Option<CalendarDate>| date.map(|d| formats.format_date(d));
            ViewOutput {
                phase: self.phase,
                month_label: formats.format_month(anchor),
                year_label: formats.format_year(anchor),
                grid: grid::build(
                    &Selection::from(&self.state),
                    anchor,
                    &self.config.bounds,
                    self.config.week_start,
                ),
                state: self.state.clone(),
                fields: FieldText {
                    start: text(self.state.start),
                    end: text(self.state.end),
                    current: text(self.state.current),
                },
                nav_disabled: self.nav_disabled(anchor),
                presets: if self.phase == Phase::PresetOpen {
                    self.presets.values().cloned().collect()
                } else {
                    Vec::new()
                },
                preview: None,
            }
        }

        /* ------------------------------ Internals ------------------------------ */

        fn today(&self) -> CalendarDate {
            self.clock.today()
        }

        fn committed_anchor(&self) -> CalendarDate {
            self.state.anchor(&self.config.bounds, self.today())
        }

        fn anchor(&self) -> CalendarDate {
            self.view_anchor.unwrap_or_else(|| self.committed_anchor())
        }

        fn parse_context(&self) -> ParseContext<'_> {
            ParseContext {
                today: self.today(),
                bounds: self.config.bounds,
                current_anchor: self.committed_anchor(),
                formats: &self.config.formats,
            }
        }

        fn commit(&mut self, reason: &str) {
            info!(
                start = ?self.state.start,
                end = ?self.state.end,
                current = ?self.state.current,
                reason,
                "selection committed"
            );
            if let Some(callback) = self.on_commit.as_mut() {
                callback(&self.state);
            }
        }

        fn pick_single(&mut self, date: CalendarDate) {
            match validate::validate_single(Some(date), &self.config.bounds) {
                Ok(()) => {
                    self.state.current = Some(date);
                    self.phase = Phase::Closed;
                    self.view_anchor = None;
                    self.commit("pick");
                }
                Err(rejection) => debug!(%date, %rejection, "picked date discarded"),
            }
        }

        /// Start pick: a day past the committed end pulls the end along with it
        /// (the preview's paired date). Focus moves to the end field either way.
        fn pick_start(&mut self, date: CalendarDate) {
            let window = grid::preview(
                Side::Start,
                self.state.end,
                date,
                &self.config.bounds,
                self.state.same_day_allowed,
            );
            let end = window.other.or(self.state.end);
            match validate::validate(
                Some(date),
                end,
                &self.config.bounds,
                self.state.same_day_allowed,
            ) {
                Ok(()) => {
                    self.state.start = Some(date);
                    self.state.end = end;
                    debug!(%date, paired_end = ?window.other, "start picked");
                }
                Err(rejection) => debug!(%date, %rejection, "picked start discarded"),
            }
            self.view_anchor = None;
            self.phase = Phase::Open(Side::End);
        }

        fn pick_end(&mut self, date: CalendarDate) {
            match validate::validate(
                self.state.start,
                Some(date),
                &self.config.bounds,
                self.state.same_day_allowed,
            ) {
                Ok(()) => {
                    self.state.end = Some(date);
                    self.phase = Phase::Closed;
                    self.view_anchor = None;
                    self.commit("pick");
                }
                Err(rejection) => debug!(%date, %rejection, "picked end discarded"),
            }
        }

        fn check_text(&self, side: Side, text: &str) -> Result<RangeState, EditError> {
            let ctx = self.parse_context();
            let input = RawInput::classify(text);
            let mut next = self.state.clone();
            let bounds = &self.config.bounds;

            if self.config.mode == SelectionMode::Range && input.is_ytd() {
                let (start, end) = validate::expand_ytd(ctx.today, bounds);
                next.start = Some(start);
                next.end = Some(end);
            } else {
                let date = parser::resolve(&input, &ctx)?;
                match (self.config.mode, side) {
                    (SelectionMode::Single, _) | (SelectionMode::Range, Side::Current) => {
                        next.current = Some(date)
                    }
                    (SelectionMode::Range, Side::Start) => next.start = Some(date),
                    (SelectionMode::Range, Side::End) => next.end = Some(date),
                }
            }

            self.check_state(&next)?;
            Ok(next)
        }

        fn check_state(&self, state: &RangeState) -> Result<(), Rejection> {
            let bounds = &self.config.bounds;
            match self.config.mode {
                SelectionMode::Single => validate::validate_single(state.current, bounds),
                SelectionMode::Range => {
                    validate::validate(state.start, state.end, bounds, state.same_day_allowed)?;
                    match state.current {
                        Some(_) => validate::validate_single(state.current, bounds),
                        None => Ok(()),
                    }
                }
            }
        }

        fn navigate(&mut self, delta: i64, unit: TimeUnit) -> ViewOutput {
            let from = self.anchor().start_of_month();
            match from.shift(delta, unit) {
                Some(target) if self.month_visible(target) => {
                    self.view_anchor = Some(target);
                    debug!(%from, %target, "navigated");
                }
                _ => debug!(%from, delta, %unit, "navigation blocked by bounds"),
            }
            self.output()
        }

        /// A month is reachable when any of its days lies within the bounds.
        fn month_visible(&self, month: CalendarDate) -> bool {
            let bounds = &self.config.bounds;
            !month.end_of_month().is_before(bounds.earliest)
                && !month.start_of_month().is_after(bounds.latest)
        }

        fn nav_disabled(&self, anchor: CalendarDate) -> NavDisabled {
            let month = anchor.start_of_month();
            let blocked = |delta: i64, unit: TimeUnit| {
                month
                    .shift(delta, unit)
                    .is_none_or(|target| !self.month_visible(target))
            };
            NavDisabled {
                prev_month: blocked(-1, TimeUnit::Month),
                next_month: blocked(1, TimeUnit::Month),
                prev_year: blocked(-1, TimeUnit::Year),
                next_year: blocked(1, TimeUnit::Year),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;
        use std::{cell::RefCell, rc::Rc};

        fn d(y: i32, m: u32, day: u32) -> CalendarDate {
            CalendarDate::from_ymd(y, m, day).unwrap()
        }

        fn nd(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
            NaiveDate::from_ymd_opt(y, m, day)
        }

        fn range_options(start: CalendarDate, end: CalendarDate) -> CalendarOptions {
            CalendarOptions {
                start_date: Some(start.0),
                end_date: Some(end.0),
                ..Default::default()
            }
        }

        /// Controller plus a log of every committed state.
        fn controller(
            options: &CalendarOptions,
            today: CalendarDate,
        ) -> (RangeController, Rc<RefCell<Vec<RangeState>>>) {
            let commits = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&commits);
            let ctrl = RangeController::new(options, FixedClock(today))
                .expect("valid options")
                .on_commit(move |state| sink.borrow_mut().push(state.clone()));
            (ctrl, commits)
        }

        #[test]
        fn ytd_replaces_the_whole_range() {
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 3, 1), d(2024, 3, 31)), d(2024, 6, 15));
            let out = ctrl.type_text(Side::Start, "ytd");
            assert_eq!(out.state.start, Some(d(2024, 1, 1)));
            assert_eq!(out.state.end, Some(d(2024, 6, 15)));
            assert_eq!(commits.borrow().len(), 1);
            assert_eq!(out.fields.start.as_deref(), Some("January 1, 2024"));
        }

        #[test]
        fn invalid_text_keeps_committed_state() {
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 3, 1), d(2024, 3, 31)), d(2024, 6, 15));
            let before = ctrl.state().clone();
            ctrl.type_text(Side::End, "sometime soon");
            ctrl.type_text(Side::End, "February 1, 2024");
            assert_eq!(ctrl.state(), &before);
            assert!(commits.borrow().is_empty());

            let out = ctrl.type_text(Side::End, "April 2nd, 2024");
            assert_eq!(out.state.end, Some(d(2024, 4, 2)));
            assert_eq!(out.state.start, Some(d(2024, 3, 1)));
            assert_eq!(commits.borrow().len(), 1);
        }

        #[test]
        fn relative_text_uses_the_committed_anchor() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 3, 1), d(2024, 3, 31)), d(2024, 6, 15));
            let out = ctrl.type_text(Side::End, "2 weeks ahead");
            assert_eq!(out.state.end, Some(d(2024, 3, 15)));
        }

        #[test]
        fn navigate_month_back_from_mid_february() {
            let options = CalendarOptions {
                mode: SelectionMode::Single,
                current_date: nd(2024, 2, 15),
                ..Default::default()
            };
            let (mut ctrl, _) = controller(&options, d(2024, 6, 15));
            ctrl.open_at(Side::Current, None);
            let out = ctrl.navigate_month(-1);
            let in_month: Vec<_> = out.grid.in_month().map(|c| c.date).collect();
            assert_eq!(in_month.first(), Some(&d(2024, 1, 1)));
            assert_eq!(in_month.last(), Some(&d(2024, 1, 31)));
            assert_eq!(out.month_label, "January");
            assert_eq!(out.year_label, "2024");
            assert!(!out.nav_disabled.prev_month);
            assert_eq!(out.state.current, Some(d(2024, 2, 15)));
        }

        #[test]
        fn navigation_stops_at_the_bounds() {
            let options = CalendarOptions {
                mode: SelectionMode::Single,
                earliest_date: nd(2024, 1, 1),
                latest_date: nd(2024, 12, 31),
                current_date: nd(2024, 1, 20),
                ..Default::default()
            };
            let (mut ctrl, _) = controller(&options, d(2024, 6, 15));
            let out = ctrl.open_at(Side::Current, None);
            assert!(out.nav_disabled.prev_month);
            assert!(out.nav_disabled.prev_year);
            assert!(out.nav_disabled.next_year);
            assert!(!out.nav_disabled.next_month);

            let out = ctrl.navigate_month(-1);
            assert_eq!(out.grid.month, d(2024, 1, 1));
            let out = ctrl.navigate_year(1);
            assert_eq!(out.grid.month, d(2024, 1, 1));

            let out = ctrl.navigate_month(11);
            assert_eq!(out.grid.month, d(2024, 12, 1));
            assert!(out.nav_disabled.next_month);
            assert!(!out.nav_disabled.prev_month);
            let out = ctrl.navigate_month(1);
            assert_eq!(out.grid.month, d(2024, 12, 1));
        }

        #[test]
        fn pick_start_then_reject_end_before_it() {
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 5, 1), d(2024, 5, 31)), d(2024, 6, 15));
            ctrl.open_at(Side::Start, None);

            let out = ctrl.pick_date(d(2024, 5, 10));
            assert_eq!(out.state.start, Some(d(2024, 5, 10)));
            assert_eq!(out.phase, Phase::Open(Side::End));

            let out = ctrl.pick_date(d(2024, 5, 9));
            assert_eq!(out.state.end, Some(d(2024, 5, 31)));
            assert_eq!(out.phase, Phase::Open(Side::End));
            assert!(commits.borrow().is_empty());

            let out = ctrl.pick_date(d(2024, 5, 20));
            assert_eq!(out.state.end, Some(d(2024, 5, 20)));
            assert_eq!(out.phase, Phase::Closed);
            assert_eq!(commits.borrow().len(), 1);
        }

        #[test]
        fn pick_start_past_end_pairs_a_new_end() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 3, 1), d(2024, 3, 31)), d(2024, 6, 15));
            ctrl.open_at(Side::Start, None);
            let out = ctrl.pick_date(d(2024, 5, 10));
            assert_eq!(out.state.start, Some(d(2024, 5, 10)));
            assert_eq!(out.state.end, Some(d(2024, 5, 16)));
        }

        #[test]
        fn single_pick_commits_and_closes() {
            let options = CalendarOptions {
                mode: SelectionMode::Single,
                ..Default::default()
            };
            let (mut ctrl, commits) = controller(&options, d(2024, 6, 15));
            ctrl.open_at(Side::Start, None);
            assert_eq!(ctrl.phase(), Phase::Open(Side::Current));
            let out = ctrl.pick_date(d(2024, 6, 1));
            assert_eq!(out.state.current, Some(d(2024, 6, 1)));
            assert_eq!(out.phase, Phase::Closed);
            assert_eq!(commits.borrow().as_slice(), [out.state.clone()]);
        }

        #[test]
        fn picks_are_ignored_while_closed() {
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 5, 1), d(2024, 5, 31)), d(2024, 6, 15));
            let before = ctrl.output();
            let after = ctrl.pick_date(d(2024, 5, 3));
            assert_eq!(before, after);
            assert!(commits.borrow().is_empty());
        }

        #[test]
        fn close_is_idempotent() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 5, 1), d(2024, 5, 31)), d(2024, 6, 15));
            let first = ctrl.close(false);
            let second = ctrl.close(false);
            assert_eq!(first, second);
            assert_eq!(second.phase, Phase::Closed);
        }

        #[test]
        fn forced_close_forgets_the_navigated_month() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 5, 1), d(2024, 5, 31)), d(2024, 6, 15));
            ctrl.open_at(Side::Start, None);
            ctrl.navigate_month(2);
            assert_eq!(ctrl.close(false).grid.month, d(2024, 7, 1));
            assert_eq!(ctrl.open_at(Side::End, None).grid.month, d(2024, 7, 1));
            assert_eq!(ctrl.close(true).grid.month, d(2024, 5, 1));
        }

        #[test]
        fn presets_resolve_against_committed_end() {
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 6, 1), d(2024, 6, 15)), d(2024, 9, 1));
            let out = ctrl.toggle_presets();
            assert_eq!(out.phase, Phase::PresetOpen);
            assert_eq!(out.presets.len(), 6);
            assert_eq!(out.presets[1].range.first_day, d(2024, 5, 1));

            let out = ctrl.select_preset("last-month");
            assert_eq!(out.phase, Phase::Closed);
            assert_eq!(out.state.start, Some(d(2024, 5, 1)));
            assert_eq!(out.state.end, Some(d(2024, 5, 31)));
            assert!(out.presets.is_empty());
            assert_eq!(commits.borrow().len(), 1);

            ctrl.select_preset("last-decade");
            assert_eq!(commits.borrow().len(), 1);
        }

        #[test]
        fn open_panel_commits_the_listed_range() {
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 6, 1), d(2024, 6, 15)), d(2024, 9, 1));
            let out = ctrl.toggle_presets();
            assert_eq!(out.presets[1].range.first_day, d(2024, 5, 1));

            let out = ctrl.type_text(Side::End, "July 20, 2024");
            assert_eq!(out.phase, Phase::PresetOpen);
            assert_eq!(out.state.end, Some(d(2024, 7, 20)));
            assert_eq!(out.presets[1].range.last_day, d(2024, 5, 31));

            let out = ctrl.select_preset("last-month");
            assert_eq!(out.state.start, Some(d(2024, 5, 1)));
            assert_eq!(out.state.end, Some(d(2024, 5, 31)));
            assert_eq!(commits.borrow().len(), 2);
        }

        #[test]
        fn closed_panel_resolves_against_the_latest_end() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 6, 1), d(2024, 6, 15)), d(2024, 9, 1));
            ctrl.toggle_presets();
            ctrl.toggle_presets();
            ctrl.type_text(Side::End, "July 20, 2024");
            let out = ctrl.select_preset("last-month");
            assert_eq!(out.state.start, Some(d(2024, 6, 1)));
            assert_eq!(out.state.end, Some(d(2024, 6, 30)));
        }

        #[test]
        fn custom_catalogue_replaces_the_stock_presets() {
            use crate::presets::PresetExtent;
            let options = range_options(d(2024, 6, 1), d(2024, 6, 15));
            let mut ctrl = RangeController::new(&options, FixedClock(d(2024, 9, 1)))
                .expect("valid options")
                .with_presets(vec![PresetSpec::new("fortnight", "Two weeks", PresetExtent::Days(14))]);
            let out = ctrl.toggle_presets();
            assert_eq!(out.presets.len(), 1);
            let out = ctrl.select_preset("fortnight");
            assert_eq!(out.state.start, Some(d(2024, 6, 2)));
            assert_eq!(out.state.end, Some(d(2024, 6, 15)));
        }

        #[test]
        fn toggling_presets_twice_closes_the_panel() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 6, 1), d(2024, 6, 15)), d(2024, 9, 1));
            ctrl.open_at(Side::Start, None);
            assert_eq!(ctrl.toggle_presets().phase, Phase::PresetOpen);
            assert_eq!(ctrl.toggle_presets().phase, Phase::Closed);
        }

        #[test]
        fn single_mode_has_no_presets() {
            let options = CalendarOptions {
                mode: SelectionMode::Single,
                ..Default::default()
            };
            let (mut ctrl, _) = controller(&options, d(2024, 6, 15));
            assert_eq!(ctrl.toggle_presets().phase, Phase::Closed);
        }

        #[test]
        fn hover_previews_the_gap_to_the_fixed_end() {
            let (mut ctrl, _) =
                controller(&range_options(d(2024, 5, 1), d(2024, 5, 20)), d(2024, 6, 15));
            ctrl.open_at(Side::Start, None);
            let out = ctrl.apply(Intent::Hover { date: d(2024, 5, 17) });
            let window = out.preview.expect("preview present");
            assert_eq!(window.maybe, vec![d(2024, 5, 18), d(2024, 5, 19)]);
            assert_eq!(out.state.start, Some(d(2024, 5, 1)));
        }

        #[test]
        fn step_current_stays_inside_bounds() {
            let options = CalendarOptions {
                mode: SelectionMode::Single,
                latest_date: nd(2024, 6, 30),
                current_date: nd(2024, 6, 25),
                ..Default::default()
            };
            let (mut ctrl, _) = controller(&options, d(2024, 6, 15));
            assert_eq!(ctrl.step_current(-1, TimeUnit::Week).state.current, Some(d(2024, 6, 18)));
            assert_eq!(ctrl.step_current(1, TimeUnit::Month).state.current, Some(d(2024, 6, 18)));
        }

        #[test]
        fn intents_replay_from_json() {
            let intents: Vec<Intent> = serde_json::from_str(
                r#"[
                    {"intent": "open_at", "side": "start"},
                    {"intent": "pick_date", "date": "2024-05-10"},
                    {"intent": "pick_date", "date": "2024-05-12"},
                    {"intent": "close", "force": true}
                ]"#,
            )
            .unwrap();
            let (mut ctrl, commits) =
                controller(&range_options(d(2024, 5, 1), d(2024, 5, 31)), d(2024, 6, 15));
            let outputs: Vec<_> = intents.into_iter().map(|i| ctrl.apply(i)).collect();
            assert_eq!(outputs.len(), 4);
            assert_eq!(ctrl.state().start, Some(d(2024, 5, 10)));
            assert_eq!(ctrl.state().end, Some(d(2024, 5, 12)));
            assert_eq!(commits.borrow().len(), 1);
        }
    }
}

pub use config::CalendarOptions;
pub use controller::{Intent, RangeController, ViewOutput};
