//! Time of day.

use crate::config::ClockSection;

/// Hour night begins.
pub const NIGHT_START: f32 = 20.0;
/// Hour night ends.
pub const NIGHT_END: f32 = 6.0;

/// Transitions crossed during one [`GameClock::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockTick {
    /// Midnight passed.
    pub new_day: bool,
    /// 20:00 passed.
    pub nightfall: bool,
    /// 06:00 passed.
    pub dawn: bool,
}

/// In-game clock running at a fixed ratio to simulated time.
#[derive(Clone, Debug, PartialEq)]
pub struct GameClock {
    hours: f32,
    day: u32,
    hours_per_second: f32,
}

impl GameClock {
    /// Starts on day 1 at `config.start_hour`.
    #[must_use]
    pub fn new(config: &ClockSection) -> Self {
        Self {
            hours: config.start_hour.rem_euclid(24.0),
            day: 1,
            hours_per_second: 24.0 / config.day_length_seconds,
        }
    }

    /// Hours since midnight, `0.0..24.0`.
    #[must_use]
    pub const fn hours(&self) -> f32 {
        self.hours
    }

    /// Day counter, starting at 1.
    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }

    /// 20:00 to 06:00.
    #[must_use]
    pub fn is_night(&self) -> bool {
        self.hours >= NIGHT_START || self.hours < NIGHT_END
    }

    /// Wall-clock display, `HH:MM`.
    #[must_use]
    pub fn time_string(&self) -> String {
        let minutes = (self.hours * 60.0) as u32;
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }

    /// Moves the clock on by `dt` simulated seconds.
    pub fn advance(&mut self, dt: f32) -> ClockTick {
        let was_night = self.is_night();
        let before = self.hours;
        let mut after = before + dt * self.hours_per_second;

        let mut tick = ClockTick::default();
        while after >= 24.0 {
            after -= 24.0;
            self.day += 1;
            tick.new_day = true;
        }
        self.hours = after;

        let now_night = self.is_night();
        tick.nightfall = !was_night && now_night;
        tick.dawn = was_night && !now_night;
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(start_hour: f32) -> GameClock {
        GameClock::new(&ClockSection {
            start_hour,
            day_length_seconds: 240.0,
        })
    }

    #[test]
    fn test_night_window() {
        assert!(!clock(8.0).is_night());
        assert!(!clock(19.9).is_night());
        assert!(clock(20.0).is_night());
        assert!(clock(2.0).is_night());
        assert!(!clock(6.0).is_night());
    }

    #[test]
    fn test_advance_crosses_nightfall_and_midnight() {
        // 240 s per day: 10 s per hour
        let mut c = clock(19.0);
        let tick = c.advance(15.0);
        assert!(tick.nightfall);
        assert!(!tick.new_day);
        assert!((c.hours() - 20.5).abs() < 1e-4);

        let tick = c.advance(40.0);
        assert!(tick.new_day);
        assert_eq!(c.day(), 2);
        assert_eq!(c.time_string(), "00:30");

        let tick = c.advance(60.0);
        assert!(tick.dawn);
        assert!(!c.is_night());
    }
}
