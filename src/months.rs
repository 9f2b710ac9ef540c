//! The cyclic calendar that drives seasonal behaviour and traffic.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Seasonal traffic multiplier; peaks in July.
    pub fn traffic_level(self) -> f64 {
        match self {
            Month::January | Month::February | Month::December => 0.90,
            Month::March | Month::November => 0.92,
            Month::April | Month::October => 0.94,
            Month::May | Month::September => 0.96,
            Month::June | Month::August => 0.98,
            Month::July => 1.0,
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Month::ALL
            .into_iter()
            .find(|month| month.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SimulationError::InvalidArgument(format!("unknown month '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthEntry {
    pub month: Month,
    pub traffic_level: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, f64>,
}

/// A twelve-slot circular queue of months in calendar order.
///
/// [`MonthCycle::rotate`] is the only operation that advances time; the
/// driver calls it exactly once per step. Only [`MonthCycle::new`] builds
/// one, so the queue always holds all twelve months.
#[derive(Debug, Clone, Serialize)]
pub struct MonthCycle {
    queue: VecDeque<MonthEntry>,
}

impl MonthCycle {
    pub fn new() -> Self {
        let queue = Month::ALL
            .into_iter()
            .map(|month| MonthEntry {
                month,
                traffic_level: month.traffic_level(),
                attributes: BTreeMap::new(),
            })
            .collect();
        Self { queue }
    }

    /// Pop the front month, push it to the back and return it.
    pub fn rotate(&mut self) -> MonthEntry {
        let entry = self
            .queue
            .pop_front()
            .expect("month cycle always holds twelve entries");
        self.queue.push_back(entry.clone());
        entry
    }

    /// The month the next [`rotate`](Self::rotate) will return.
    pub fn peek(&self) -> Month {
        self.queue[0].month
    }

    /// Rotate until January is back at the front.
    pub fn reset(&mut self) {
        while self.peek() != Month::January {
            self.rotate();
        }
    }

    /// Attach a named per-month attribute; months absent from `values` are left untouched.
    pub fn with_attribute(mut self, name: &str, values: &HashMap<Month, f64>) -> Self {
        for entry in self.queue.iter_mut() {
            if let Some(value) = values.get(&entry.month) {
                entry.attributes.insert(name.to_string(), *value);
            }
        }
        self
    }

    pub fn attribute_level(&self, month: Month, name: &str) -> Option<f64> {
        let entry = self.queue.iter().find(|entry| entry.month == month)?;
        match name {
            "traffic_level" => Some(entry.traffic_level),
            other => entry.attributes.get(other).copied(),
        }
    }

    pub fn order(&self) -> Vec<Month> {
        self.queue.iter().map(|entry| entry.month).collect()
    }
}

impl Default for MonthCycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_rotation_is_january() {
        let mut cycle = MonthCycle::new();
        let entry = cycle.rotate();
        assert_eq!(entry.month, Month::January);
        assert_eq!(entry.traffic_level, 0.9);
        assert_eq!(cycle.rotate().month, Month::February);
    }

    #[test]
    fn twelve_rotations_close_the_cycle() {
        let mut cycle = MonthCycle::new();
        cycle.rotate();
        cycle.rotate();
        let start = cycle.order();
        for _ in 0..12 {
            cycle.rotate();
        }
        assert_eq!(cycle.order(), start);
    }

    #[test]
    fn wraps_after_december() {
        let mut cycle = MonthCycle::new();
        let months: Vec<Month> = (0..13).map(|_| cycle.rotate().month).collect();
        assert_eq!(months[11], Month::December);
        assert_eq!(months[12], Month::January);
    }

    #[test]
    fn reset_realigns_to_january() {
        let mut cycle = MonthCycle::new();
        for _ in 0..5 {
            cycle.rotate();
        }
        cycle.reset();
        assert_eq!(cycle.rotate().month, Month::January);

        let mut fresh = MonthCycle::new();
        fresh.reset();
        assert_eq!(fresh.peek(), Month::January);
    }

    #[test]
    fn traffic_levels_stay_in_band() {
        for month in Month::ALL {
            let level = month.traffic_level();
            assert!((0.9..=1.0).contains(&level));
        }
        assert_eq!(Month::July.traffic_level(), 1.0);
    }

    #[test]
    fn extra_attributes_do_not_disturb_order() {
        let temps: HashMap<Month, f64> = [(Month::January, 0.1), (Month::July, 0.8)]
            .into_iter()
            .collect();
        let mut cycle = MonthCycle::new().with_attribute("temp", &temps);
        assert_eq!(cycle.attribute_level(Month::January, "temp"), Some(0.1));
        assert_eq!(cycle.attribute_level(Month::March, "temp"), None);
        assert_eq!(cycle.attribute_level(Month::July, "traffic_level"), Some(1.0));
        assert_eq!(cycle.rotate().month, Month::January);
    }

    #[test]
    fn parses_month_names() {
        assert_eq!("october".parse::<Month>().unwrap(), Month::October);
        assert!(matches!(
            "Smarch".parse::<Month>(),
            Err(SimulationError::InvalidArgument(_))
        ));
    }
}
