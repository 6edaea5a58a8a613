use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Unit of a custom recurrence interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomUnit {
    Days,
    Weeks,
    Months,
}

impl CustomUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            CustomUnit::Days => "days",
            CustomUnit::Weeks => "weeks",
            CustomUnit::Months => "months",
        }
    }

    pub fn parse_unit(s: &str) -> Option<CustomUnit> {
        match s {
            "days" | "day" => Some(CustomUnit::Days),
            "weeks" | "week" => Some(CustomUnit::Weeks),
            "months" | "month" => Some(CustomUnit::Months),
            _ => None,
        }
    }
}

impl fmt::Display for CustomUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom recurrence interval. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval(NonZeroU32);

impl Interval {
    /// Returns `None` for 0.
    pub fn new(n: u32) -> Option<Interval> {
        NonZeroU32::new(n).map(Interval)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a task repeats.
///
/// `Unrecognized` holds whatever recurrence string was found on disk that
/// does not describe a valid rule. It is kept so that saving the book does
/// not silently rewrite user data, and it is never applicable to any date.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Custom {
        interval: Interval,
        unit: CustomUnit,
    },
    Unrecognized(String),
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::None)
    }

    /// The keyword used on disk and on the command line
    pub fn kind(&self) -> &str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Custom { .. } => "custom",
            Recurrence::Unrecognized(s) => s,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Custom { interval, unit } => write!(f, "every {} {}", interval, unit),
            Recurrence::Unrecognized(s) => write!(f, "{}?", s),
            other => f.write_str(other.kind()),
        }
    }
}

/// How month steps are measured.
///
/// `ThirtyDays` treats a month as exactly 30 days, which keeps monthly
/// applicability a plain modulus over elapsed days. `Calendar` steps by real
/// calendar months from the series anchor, clamping to the last day of
/// shorter months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthMode {
    #[default]
    ThirtyDays,
    Calendar,
}

impl MonthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MonthMode::ThirtyDays => "thirty-days",
            MonthMode::Calendar => "calendar",
        }
    }

    pub fn parse_mode(s: &str) -> Option<MonthMode> {
        match s {
            "thirty-days" => Some(MonthMode::ThirtyDays),
            "calendar" => Some(MonthMode::Calendar),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_rejects_zero() {
        assert!(Interval::new(0).is_none());
        assert_eq!(Interval::new(3).map(Interval::get), Some(3));
    }

    #[test]
    fn test_display_custom() {
        let r = Recurrence::Custom {
            interval: Interval::new(2).unwrap(),
            unit: CustomUnit::Weeks,
        };
        assert_eq!(r.to_string(), "every 2 weeks");
        assert_eq!(r.kind(), "custom");
    }

    #[test]
    fn test_unrecognized_keeps_its_keyword() {
        let r = Recurrence::Unrecognized("fortnightly".into());
        assert_eq!(r.kind(), "fortnightly");
        assert!(r.is_recurring());
    }

    #[test]
    fn test_month_mode_serde() {
        #[derive(Deserialize)]
        struct Wrap {
            mode: MonthMode,
        }
        let w: Wrap = toml::from_str("mode = \"calendar\"").unwrap();
        assert_eq!(w.mode, MonthMode::Calendar);
        assert_eq!(MonthMode::parse_mode("thirty-days"), Some(MonthMode::ThirtyDays));
        assert_eq!(MonthMode::parse_mode("lunar"), None);
    }

    #[test]
    fn test_unit_accepts_singular() {
        assert_eq!(CustomUnit::parse_unit("week"), Some(CustomUnit::Weeks));
        assert_eq!(CustomUnit::parse_unit("fortnights"), None);
    }
}
