//! Ordering window settings
//!
//! The window is driven by `system_settings` rows:
//!
//! | key | example |
//! |-----|---------|
//! | `ordering_enabled` | `true` |
//! | `ordering_timezone` | `Europe/Madrid` |
//! | `ordering_days` | `mon,tue,wed,thu,fri` |
//! | `ordering_opens_at` | `07:00` |
//! | `ordering_closes_at` | `14:00` |
//! | `ordering_closed_message` | free text, optional |
//!
//! Ordering is active iff enabled, today is an ordering day and the local
//! time is in `[opens_at, closes_at)`. A window whose close time is before its
//! open time runs past midnight.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BoxError;
use crate::orders::traits::OrderingWindowProvider;

pub const KEY_ENABLED: &str = "ordering_enabled";
pub const KEY_TIMEZONE: &str = "ordering_timezone";
pub const KEY_DAYS: &str = "ordering_days";
pub const KEY_OPENS_AT: &str = "ordering_opens_at";
pub const KEY_CLOSES_AT: &str = "ordering_closes_at";
pub const KEY_CLOSED_MESSAGE: &str = "ordering_closed_message";

const DISABLED_MESSAGE: &str = "Online ordering is currently unavailable";

/// Current ordering window state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingWindowStatus {
    pub active: bool,
    /// Shown to the customer when not active
    pub message: Option<String>,
}

impl OrderingWindowStatus {
    pub fn open() -> Self {
        Self {
            active: true,
            message: None,
        }
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self {
            active: false,
            message: Some(message.into()),
        }
    }
}

/// A fixed status is its own provider (tests, manual override)
#[async_trait]
impl OrderingWindowProvider for OrderingWindowStatus {
    async fn ordering_window(&self) -> Result<OrderingWindowStatus, BoxError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Weekly ordering schedule
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingSchedule {
    pub enabled: bool,
    pub timezone: Tz,
    pub days: Vec<Weekday>,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub closed_message: Option<String>,
}

impl Default for OrderingSchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: Tz::UTC,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            opens_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            closes_at: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
            closed_message: None,
        }
    }
}

fn parse_time(key: &'static str, value: &str) -> Result<NaiveTime, SettingsError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| SettingsError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

impl OrderingSchedule {
    /// Build from `system_settings` key/value pairs; missing keys keep defaults
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut schedule = Self::default();

        if let Some(v) = settings.get(KEY_ENABLED) {
            schedule.enabled = match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    return Err(SettingsError::InvalidValue {
                        key: KEY_ENABLED,
                        value: v.clone(),
                    });
                }
            };
        }
        if let Some(v) = settings.get(KEY_TIMEZONE) {
            schedule.timezone = v.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: KEY_TIMEZONE,
                value: v.clone(),
            })?;
        }
        if let Some(v) = settings.get(KEY_DAYS) {
            schedule.days = v
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|d| {
                    d.parse::<Weekday>()
                        .map_err(|_| SettingsError::InvalidValue {
                            key: KEY_DAYS,
                            value: v.clone(),
                        })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = settings.get(KEY_OPENS_AT) {
            schedule.opens_at = parse_time(KEY_OPENS_AT, v)?;
        }
        if let Some(v) = settings.get(KEY_CLOSES_AT) {
            schedule.closes_at = parse_time(KEY_CLOSES_AT, v)?;
        }
        schedule.closed_message = settings
            .get(KEY_CLOSED_MESSAGE)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(schedule)
    }

    /// Window state at `now`
    pub fn evaluate(&self, now: DateTime<Utc>) -> OrderingWindowStatus {
        if !self.enabled {
            return OrderingWindowStatus::closed(
                self.closed_message
                    .clone()
                    .unwrap_or_else(|| DISABLED_MESSAGE.to_string()),
            );
        }

        let local = now.with_timezone(&self.timezone);
        let time = local.time();
        let today = local.weekday();

        let open = if self.opens_at <= self.closes_at {
            self.days.contains(&today) && time >= self.opens_at && time < self.closes_at
        } else {
            // Overnight: evening belongs to today, early morning to yesterday
            (self.days.contains(&today) && time >= self.opens_at)
                || (self.days.contains(&today.pred()) && time < self.closes_at)
        };

        if open {
            OrderingWindowStatus::open()
        } else {
            OrderingWindowStatus::closed(self.closed_message())
        }
    }

    fn closed_message(&self) -> String {
        if let Some(message) = &self.closed_message {
            return message.clone();
        }
        let days = self
            .days
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Ordering is open {days} from {} to {}",
            self.opens_at.format("%H:%M"),
            self.closes_at.format("%H:%M")
        )
    }
}

#[async_trait]
impl OrderingWindowProvider for OrderingSchedule {
    async fn ordering_window(&self) -> Result<OrderingWindowStatus, BoxError> {
        Ok(self.evaluate(Utc::now()))
    }
}
