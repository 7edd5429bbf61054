/*
 *  display/cache.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per-element change detection for partial panel updates
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::HashMap;

/// Last value drawn for a screen element, kept only for comparison
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Text(String),
    Float(f64),
    Int(i64),
    Flag(bool),
}

impl From<&str> for CacheValue {
    fn from(v: &str) -> Self { CacheValue::Text(v.to_string()) }
}

impl From<String> for CacheValue {
    fn from(v: String) -> Self { CacheValue::Text(v) }
}

impl From<&String> for CacheValue {
    fn from(v: &String) -> Self { CacheValue::Text(v.clone()) }
}

impl From<f64> for CacheValue {
    fn from(v: f64) -> Self { CacheValue::Float(v) }
}

impl From<i64> for CacheValue {
    fn from(v: i64) -> Self { CacheValue::Int(v) }
}

impl From<usize> for CacheValue {
    fn from(v: usize) -> Self { CacheValue::Int(v as i64) }
}

impl From<bool> for CacheValue {
    fn from(v: bool) -> Self { CacheValue::Flag(v) }
}

#[derive(Debug)]
struct Entry {
    value: CacheValue,
    /// Cycle in which the value last changed
    changed_in: u64,
    /// Cycle in which the key was last checked
    seen_in: u64,
}

/// Memo of what each screen element last showed.
///
/// Owned by a single compositor; keys are the monitor's element names
/// (`header`, `cpu_3`, `proc_0`, ...). Each key should be checked at most
/// once per cycle.
#[derive(Debug, Default)]
pub struct RegionCache {
    entries: HashMap<String, Entry>,
    cycle: u64,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render cycle
    pub fn begin_cycle(&mut self) {
        self.cycle += 1;
    }

    /// True when `value` differs from what `key` last held (always true the
    /// first time a key is seen). The stored value is updated on change.
    pub fn changed(&mut self, key: &str, value: impl Into<CacheValue>) -> bool {
        let value = value.into();
        self.check(key, value, |prev, next| prev == next)
    }

    /// Like [`changed`](Self::changed) but floats within `threshold` of the
    /// stored value count as unchanged
    pub fn changed_float(&mut self, key: &str, value: f64, threshold: f64) -> bool {
        self.check(key, CacheValue::Float(value), |prev, _| match prev {
            CacheValue::Float(p) => (value - p).abs() < threshold,
            _ => false,
        })
    }

    fn check<F>(&mut self, key: &str, value: CacheValue, same: F) -> bool
    where
        F: FnOnce(&CacheValue, &CacheValue) -> bool,
    {
        let cycle = self.cycle;
        match self.entries.get_mut(key) {
            Some(entry) => {
                debug_assert!(cycle == 0 || entry.seen_in != cycle, "cache key '{key}' checked twice in one cycle");
                entry.seen_in = cycle;
                if same(&entry.value, &value) {
                    return false;
                }
                entry.value = value;
                entry.changed_in = cycle;
                true
            }
            None => {
                self.entries.insert(key.to_string(), Entry { value, changed_in: cycle, seen_in: cycle });
                true
            }
        }
    }

    /// Forget everything that changed in the current cycle, so those
    /// elements report changed (and get redrawn) next cycle
    pub fn rollback_cycle(&mut self) -> usize {
        let cycle = self.cycle;
        let before = self.entries.len();
        self.entries.retain(|_, e| e.changed_in != cycle);
        before - self.entries.len()
    }

    /// Drop all entries; every element redraws on its next check
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
