//! The user's filter selection: ships and date range.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::range::DateRange;

/// Why a selection cannot be aggregated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissingInput {
    NoShips,
    NoStartDate,
    NoEndDate,
    /// Start date is after the end date.
    InvertedRange,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MissingInput::NoShips => "Please select at least one ship.",
            MissingInput::NoStartDate => "Please select a start date.",
            MissingInput::NoEndDate => "Please select an end date.",
            MissingInput::InvertedRange => "The start date must not be after the end date.",
        };
        f.write_str(msg)
    }
}

/// Versioned selection state.
///
/// Every mutation bumps [`version`](Selection::version), so a consumer can
/// tell whether the selection it captured is still the one on screen.
/// Ship order is the order the user picked them in and decides the order
/// of aggregated output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    ships: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    version: u64,
}

impl Selection {
    pub fn new<I, S>(ships: I, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self {
            start,
            end,
            ..Default::default()
        };
        selection.ships = normalize_ships(ships);
        selection
    }

    pub fn ships(&self) -> &[String] {
        &self.ships
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the selected ships. Blank names and repeats are dropped.
    pub fn set_ships<I, S>(&mut self, ships: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ships = normalize_ships(ships);
        self.version += 1;
    }

    pub fn clear_ships(&mut self) {
        self.ships.clear();
        self.version += 1;
    }

    pub fn set_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.start = start;
        self.end = end;
        self.version += 1;
    }

    /// The date range, if both ends are set and ordered.
    pub fn range(&self) -> Result<DateRange, MissingInput> {
        let start = self.start.ok_or(MissingInput::NoStartDate)?;
        let end = self.end.ok_or(MissingInput::NoEndDate)?;
        DateRange::new(start, end).ok_or(MissingInput::InvertedRange)
    }

    /// Ships and range, or the first missing piece of input.
    pub fn validate(&self) -> Result<(&[String], DateRange), MissingInput> {
        if self.ships.is_empty() {
            return Err(MissingInput::NoShips);
        }
        Ok((&self.ships, self.range()?))
    }
}

fn normalize_ships<I, S>(ships: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for ship in ships {
        let ship = ship.into().trim().to_string();
        if !ship.is_empty() && !out.contains(&ship) {
            out.push(ship);
        }
    }
    out
}
