//! Tick source and game calendar.
//!
//! The clock does not sleep. The driver feeds it wall time through
//! [`GameClock::advance`] and runs as many ticks as it reports due.

use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::error::{CoreError, Result};

/// Game time. One tick advances it by one second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Calendar {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Calendar boundaries crossed by a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockEvents {
    pub minute: bool,
    pub hour: bool,
    pub day: bool,
    pub month: bool,
    pub year: bool,
}

impl Calendar {
    pub const SECONDS_PER_MINUTE: u32 = 60;
    pub const MINUTES_PER_HOUR: u32 = 60;
    pub const HOURS_PER_DAY: u32 = 24;
    pub const DAYS_PER_MONTH: u32 = 30;
    pub const MONTHS_PER_YEAR: u32 = 12;

    fn advance_second(&mut self) -> ClockEvents {
        let mut events = ClockEvents::default();
        self.second = (self.second + 1) % Self::SECONDS_PER_MINUTE;
        if self.second != 0 {
            return events;
        }
        events.minute = true;
        self.minute = (self.minute + 1) % Self::MINUTES_PER_HOUR;
        if self.minute != 0 {
            return events;
        }
        events.hour = true;
        self.hour = (self.hour + 1) % Self::HOURS_PER_DAY;
        if self.hour != 0 {
            return events;
        }
        events.day = true;
        self.day = (self.day + 1) % Self::DAYS_PER_MONTH;
        if self.day != 0 {
            return events;
        }
        events.month = true;
        self.month = (self.month + 1) % Self::MONTHS_PER_YEAR;
        if self.month != 0 {
            debug!("month {}", self.month);
            return events;
        }
        events.year = true;
        self.year += 1;
        debug!("year {}", self.year);
        events
    }
}

#[derive(Debug, Clone)]
pub struct GameClock {
    frequency: f32,
    running: bool,
    accumulator: Duration,
    calendar: Calendar,
}

impl GameClock {
    /// A paused clock ticking `frequency` times per wall second once resumed.
    pub fn new(frequency: f32) -> Result<Self> {
        let mut clock = Self {
            frequency: 0.0,
            running: false,
            accumulator: Duration::ZERO,
            calendar: Calendar::default(),
        };
        clock.set_frequency(frequency)?;
        Ok(clock)
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Stops ticking. Sub-tick time already accumulated is kept.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Zero is allowed and stops ticks without pausing.
    pub fn set_frequency(&mut self, frequency: f32) -> Result<()> {
        if !frequency.is_finite() || frequency < 0.0 {
            return Err(CoreError::InvalidFrequency(frequency));
        }
        self.frequency = frequency;
        Ok(())
    }

    pub fn period(&self) -> Option<Duration> {
        if self.frequency > 0.0 {
            Some(Duration::from_secs_f64(1.0 / f64::from(self.frequency)))
        } else {
            None
        }
    }

    /// Feeds wall time into the clock and returns how many ticks are due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if !self.running {
            return 0;
        }
        let period = match self.period() {
            Some(period) if !period.is_zero() => period,
            _ => return 0,
        };
        self.accumulator += elapsed;
        let mut due = 0;
        while self.accumulator >= period {
            self.accumulator -= period;
            due += 1;
        }
        due
    }

    /// Wall time left until the next tick is due, if the clock can tick at all.
    pub fn until_next_tick(&self) -> Option<Duration> {
        if !self.running {
            return None;
        }
        self.period()
            .map(|period| period.saturating_sub(self.accumulator))
    }

    /// Advances the calendar by one game second.
    pub fn tick(&mut self) -> ClockEvents {
        self.calendar.advance_second()
    }
}
