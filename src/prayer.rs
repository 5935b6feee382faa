use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Used when the visitor's location is unknown.
    pub const NEW_DELHI: Coordinates = Coordinates {
        latitude: 28.6139,
        longitude: 77.2090,
    };
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::NEW_DELHI
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        };
        f.write_str(label)
    }
}

/// The five daily timings as `HH:MM` strings, in the API's field names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrayerTimes {
    pub fajr: String,
    pub dhuhr: String,
    pub asr: String,
    pub maghrib: String,
    pub isha: String,
}

impl PrayerTimes {
    pub fn raw(&self, prayer: Prayer) -> &str {
        match prayer {
            Prayer::Fajr => &self.fajr,
            Prayer::Dhuhr => &self.dhuhr,
            Prayer::Asr => &self.asr,
            Prayer::Maghrib => &self.maghrib,
            Prayer::Isha => &self.isha,
        }
    }

    pub fn time(&self, prayer: Prayer) -> Option<NaiveTime> {
        parse_clock(self.raw(prayer))
    }

    /// The first prayer later than `now`, wrapping to tomorrow's Fajr.
    pub fn next_after(&self, now: NaiveDateTime) -> Option<UpcomingPrayer> {
        let today = now.date();
        let upcoming = Prayer::ALL.iter().find_map(|&prayer| {
            let at = today.and_time(self.time(prayer)?);
            (at > now).then_some((prayer, at))
        });
        let (prayer, at) = match upcoming {
            Some(found) => found,
            None => {
                let fajr = self.time(Prayer::Fajr)?;
                (Prayer::Fajr, today.succ_opt()?.and_time(fajr))
            }
        };
        Some(UpcomingPrayer {
            prayer,
            at,
            remaining: (at - now).max(Duration::zero()),
        })
    }

    /// The most recent prayer whose time has started, if any today.
    pub fn active_at(&self, now: NaiveTime) -> Option<Prayer> {
        Prayer::ALL
            .iter()
            .rev()
            .copied()
            .find(|&prayer| self.time(prayer).is_some_and(|at| at <= now))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingPrayer {
    pub prayer: Prayer,
    pub at: NaiveDateTime,
    pub remaining: Duration,
}

/// Accepts `HH:MM`, ignoring any trailing timezone label such as `(IST)`.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let clock = raw.split_whitespace().next()?;
    NaiveTime::parse_from_str(clock, "%H:%M").ok()
}

/// `05:07` becomes `05:07 AM`, `13:30` becomes `01:30 PM`.
pub fn format_12h(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

pub fn format_countdown(remaining: Duration) -> String {
    let seconds = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
