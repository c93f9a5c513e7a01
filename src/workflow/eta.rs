//! Estimated delivery time picked when an admin confirms an order.

use chrono::{DateTime, Days, Duration, NaiveTime, TimeZone, Utc};

/// Quick-pick offered in the confirmation sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaOption {
    InHours(u32),
    /// 10:00 on the next calendar day, in the caller's timezone.
    NextDayAt10,
    Skip,
}

impl EtaOption {
    pub const QUICK_PICKS: [EtaOption; 5] = [
        EtaOption::InHours(2),
        EtaOption::InHours(4),
        EtaOption::InHours(6),
        EtaOption::NextDayAt10,
        EtaOption::Skip,
    ];

    pub fn label(&self) -> String {
        match self {
            EtaOption::InHours(h) => format!("In {h} hours"),
            EtaOption::NextDayAt10 => "Tomorrow, 10 AM".to_string(),
            EtaOption::Skip => "Skip".to_string(),
        }
    }

    /// Resolves the option against `now`. `Skip` yields `None`.
    pub fn resolve<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Option<DateTime<Utc>> {
        match self {
            EtaOption::InHours(h) => Some((now + Duration::hours(i64::from(*h))).with_timezone(&Utc)),
            EtaOption::NextDayAt10 => {
                let tz = now.timezone();
                let tomorrow = now.date_naive().checked_add_days(Days::new(1))?;
                let ten = tomorrow.and_time(NaiveTime::from_hms_opt(10, 0, 0)?);
                tz.from_local_datetime(&ten)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            EtaOption::Skip => None,
        }
    }
}
