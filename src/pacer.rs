/*
 *  pacer.rs
 *
 *  lcdmon - smart screen monitor
 *	(c) 2020-26 Stuart Hunter
 *
 *	Fixed-interval tick pacing for the monitor loops
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::time::{Duration, Instant};

use crate::display::traits::Clock;

pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

// a tick that overruns its slot is not made up; the next deadline is
// rescheduled from now, so a stalled panel never causes a burst of ticks
impl Pacer {
    /// First deadline is one interval after `now`, like a ticker
    pub fn new(interval: Duration, now: Instant) -> Self {
        let frame = interval.max(Duration::from_millis(1));
        Self { next_deadline: now + frame, frame }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.frame
    }

    /// Returns true if a tick is due; if true, it also schedules the next deadline.
    #[inline]
    pub fn should_tick(&mut self, now: Instant) -> bool {
        if now >= self.next_deadline {
            self.schedule(now);
            true
        } else {
            false
        }
    }

    /// Block until the next deadline, then schedule the one after
    pub fn wait(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        if let Some(remaining) = self.next_deadline.checked_duration_since(now) {
            if !remaining.is_zero() {
                clock.sleep(remaining);
            }
        }
        let now = clock.now();
        self.schedule(now);
    }

    fn schedule(&mut self, now: Instant) {
        self.next_deadline += self.frame;
        if self.next_deadline <= now {
            self.next_deadline = now + self.frame;
        }
    }
}
