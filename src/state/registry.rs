//! Ordered registry of timers backed by the row store

use std::{str::FromStr, sync::Arc};

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::timer::{normalize_duration, Timer, TimerKind, TimerType};
use crate::{
    error::TimerError,
    events::{AppEvent, EventBus},
    store::{NewTimerRow, RowPatch, TimerRow, TimerStore},
};

/// Fields for a new timer. Type and duration are normalized, never rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTimer {
    #[serde(default)]
    pub timer_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub text_alert: bool,
    #[serde(default)]
    pub audio_alert: bool,
    #[serde(default = "default_show_on_web")]
    pub show_on_web: bool,
}

fn default_show_on_web() -> bool {
    true
}

impl Default for NewTimer {
    fn default() -> Self {
        Self {
            timer_type: String::new(),
            name: String::new(),
            description: String::new(),
            duration_ms: None,
            text_alert: false,
            audio_alert: false,
            show_on_web: default_show_on_web(),
        }
    }
}

/// Partial update; a field is applied when present, whatever its value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimerPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub timer_type: Option<String>,
    pub duration_ms: Option<i64>,
    pub text_alert: Option<bool>,
    pub audio_alert: Option<bool>,
    pub show_on_web: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = TimerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            other => Err(TimerError::Validation {
                field: "direction",
                reason: format!("expected UP or DOWN, got {:?}", other),
            }),
        }
    }
}

pub struct TimerRegistry {
    store: Box<dyn TimerStore>,
    events: EventBus,
    timers: Vec<Timer>,
    loaded: bool,
}

impl TimerRegistry {
    pub fn new(store: Box<dyn TimerStore>, events: EventBus) -> Self {
        Self {
            store,
            events,
            timers: Vec::new(),
            loaded: false,
        }
    }

    /// Load every row on first use or when forced, repairing weight order.
    ///
    /// A forced reload keeps the runtime state of timers whose ID and type
    /// did not change.
    pub fn load_all(&mut self, force: bool) -> Result<&[Timer], TimerError> {
        if self.loaded && !force {
            return Ok(&self.timers);
        }

        let mut rows = self.store.select_all()?;
        rows.sort_by_key(|row| (row.weight, row.id));
        self.repair_weights(&mut rows);

        let previous = std::mem::take(&mut self.timers);
        self.timers = rows
            .into_iter()
            .map(|row| {
                let mut timer = timer_from_row(row);
                if let Some(old) = previous
                    .iter()
                    .find(|old| old.id == timer.id && old.kind == timer.kind)
                {
                    timer.status = old.status;
                    timer.state = old.state.clone();
                }
                timer
            })
            .collect();
        self.loaded = true;

        debug!("Loaded {} timers", self.timers.len());
        self.emit_changed();
        Ok(&self.timers)
    }

    /// The live ordered list
    pub fn get_all(&mut self, force: bool) -> Result<&[Timer], TimerError> {
        self.load_all(force)
    }

    pub fn get(&mut self, id: i64) -> Result<&Timer, TimerError> {
        self.ensure_loaded()?;
        self.timers
            .iter()
            .find(|timer| timer.id == id)
            .ok_or(TimerError::NotFound(id))
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn create(&mut self, new: NewTimer) -> Result<Timer, TimerError> {
        self.ensure_loaded()?;

        let timer_type = TimerType::normalize(&new.timer_type);
        let kind = TimerKind::new(timer_type, normalize_duration(timer_type, new.duration_ms));
        let weight = self.next_weight();

        let row = NewTimerRow {
            timer_type: timer_type.as_str().to_string(),
            name: new.name.clone(),
            description: new.description.clone(),
            duration_ms: kind.duration_ms().map(to_db_ms),
            weight,
            text_alert: new.text_alert,
            audio_alert: new.audio_alert,
            show_on_web: new.show_on_web,
        };
        let id = self.store.insert(&row)?;

        let mut timer = Timer::new(id, kind, new.name, new.description, weight);
        timer.text_alert = new.text_alert;
        timer.audio_alert = new.audio_alert;
        timer.show_on_web = new.show_on_web;

        let position = self
            .timers
            .partition_point(|existing| (existing.weight, existing.id) < (weight, id));
        self.timers.insert(position, timer.clone());

        info!(id, weight, "Created {} timer", timer_type.as_str());
        self.emit_changed();
        Ok(timer)
    }

    pub fn update(&mut self, id: i64, patch: TimerPatch) -> Result<Timer, TimerError> {
        let index = self.index_of(id)?;
        let current = &self.timers[index];

        let requested_duration = match patch.duration_ms {
            Some(ms) => Some(u64::try_from(ms).map_err(|_| TimerError::Validation {
                field: "duration",
                reason: format!("{} is negative", ms),
            })?),
            None => None,
        };
        let timer_type = patch
            .timer_type
            .as_deref()
            .map(TimerType::normalize)
            .unwrap_or_else(|| current.timer_type());
        let kind = match timer_type {
            TimerType::Stopwatch => TimerKind::Stopwatch,
            _ => TimerKind::new(timer_type, requested_duration.or(current.duration_ms())),
        };

        let mut row_patch = RowPatch {
            name: patch.name.clone(),
            description: patch.description.clone(),
            text_alert: patch.text_alert,
            audio_alert: patch.audio_alert,
            show_on_web: patch.show_on_web,
            ..RowPatch::default()
        };
        if patch.timer_type.is_some() {
            row_patch.timer_type = Some(timer_type.as_str().to_string());
        }
        if patch.timer_type.is_some() || patch.duration_ms.is_some() {
            row_patch.duration_ms = Some(kind.duration_ms().map(to_db_ms));
        }

        if !self.store.update_fields(id, &row_patch)? {
            return Err(TimerError::NotFound(id));
        }

        let timer = &mut self.timers[index];
        if let Some(name) = patch.name {
            timer.name = name;
        }
        if let Some(description) = patch.description {
            timer.description = description;
        }
        if let Some(text_alert) = patch.text_alert {
            timer.text_alert = text_alert;
        }
        if let Some(audio_alert) = patch.audio_alert {
            timer.audio_alert = audio_alert;
        }
        if let Some(show_on_web) = patch.show_on_web {
            timer.show_on_web = show_on_web;
        }
        if timer.kind != kind {
            timer.set_kind(kind);
        }
        let updated = timer.clone();

        self.sort();
        info!(id, "Updated timer");
        self.emit_changed();
        Ok(updated)
    }

    /// Swap weights with the neighbour in `direction`.
    ///
    /// Returns `Ok(false)` when the timer is already at that edge.
    pub fn move_timer(&mut self, id: i64, direction: MoveDirection) -> Result<bool, TimerError> {
        let index = self.index_of(id)?;
        let neighbour = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|&i| i < self.timers.len()),
        };
        let Some(neighbour) = neighbour else {
            debug!(id, ?direction, "Timer already at edge, move ignored");
            return Ok(false);
        };

        let (moving_id, moving_weight) = (self.timers[index].id, self.timers[index].weight);
        let (other_id, other_weight) = (self.timers[neighbour].id, self.timers[neighbour].weight);

        if !self.store.update_weight(moving_id, other_weight)? {
            return Err(TimerError::NotFound(moving_id));
        }
        if let Err(e) = self.store.update_weight(other_id, moving_weight) {
            // The next full reload repairs the duplicate weight left behind
            error!(
                moving_id,
                other_id, "Second weight write failed, persisted order diverged: {}", e
            );
            return Err(e.into());
        }

        self.timers[index].weight = other_weight;
        self.timers[neighbour].weight = moving_weight;
        self.sort();

        info!(id, ?direction, "Moved timer");
        self.emit_changed();
        Ok(true)
    }

    pub fn delete(&mut self, id: i64) -> Result<(), TimerError> {
        let index = self.index_of(id)?;
        if !self.store.delete(id)? {
            warn!(id, "Timer row was already missing from the store");
        }
        self.timers.remove(index);

        info!(id, "Deleted timer");
        self.emit_changed();
        Ok(())
    }

    pub fn start(&mut self, id: i64) -> Result<Timer, TimerError> {
        self.apply(id, Timer::start)
    }

    pub fn stop(&mut self, id: i64) -> Result<Timer, TimerError> {
        self.apply(id, Timer::stop)
    }

    pub fn pause(&mut self, id: i64) -> Result<Timer, TimerError> {
        self.apply(id, Timer::pause)
    }

    pub fn unpause(&mut self, id: i64) -> Result<Timer, TimerError> {
        self.apply(id, Timer::unpause)
    }

    pub fn set_elapsed_time(&mut self, id: i64, elapsed_ms: u64) -> Result<Timer, TimerError> {
        self.apply(id, |timer| timer.set_elapsed_time(elapsed_ms))
    }

    pub fn start_all(&mut self) -> Result<usize, TimerError> {
        self.apply_all(Timer::start)
    }

    pub fn stop_all(&mut self) -> Result<usize, TimerError> {
        self.apply_all(Timer::stop)
    }

    pub fn pause_all(&mut self) -> Result<usize, TimerError> {
        self.apply_all(Timer::pause)
    }

    pub fn unpause_all(&mut self) -> Result<usize, TimerError> {
        self.apply_all(Timer::unpause)
    }

    /// Advance every timer by `interval_ms`, then emit one change event.
    ///
    /// Returns `false` without emitting when there is nothing to tick.
    pub fn tick(&mut self, interval_ms: u64) -> bool {
        if self.timers.is_empty() {
            return false;
        }
        for timer in &mut self.timers {
            let was_complete = timer.is_complete();
            timer.tick(interval_ms);
            if !was_complete && timer.is_complete() {
                info!(id = timer.id, name = %timer.name, "Timer complete");
            }
        }
        self.emit_changed();
        true
    }

    fn apply(&mut self, id: i64, f: impl FnOnce(&mut Timer)) -> Result<Timer, TimerError> {
        let index = self.index_of(id)?;
        let timer = &mut self.timers[index];
        f(timer);
        let updated = timer.clone();
        self.emit_changed();
        Ok(updated)
    }

    fn apply_all(&mut self, f: impl Fn(&mut Timer)) -> Result<usize, TimerError> {
        self.ensure_loaded()?;
        self.timers.iter_mut().for_each(f);
        self.emit_changed();
        Ok(self.timers.len())
    }

    fn ensure_loaded(&mut self) -> Result<(), TimerError> {
        if !self.loaded {
            self.load_all(false)?;
        }
        Ok(())
    }

    fn index_of(&mut self, id: i64) -> Result<usize, TimerError> {
        self.ensure_loaded()?;
        self.timers
            .iter()
            .position(|timer| timer.id == id)
            .ok_or(TimerError::NotFound(id))
    }

    fn next_weight(&self) -> i64 {
        self.timers
            .iter()
            .map(|timer| timer.weight)
            .max()
            .map(|max| max + 1)
            .unwrap_or(self.timers.len() as i64 + 1)
    }

    fn sort(&mut self) {
        self.timers.sort_by_key(|timer| (timer.weight, timer.id));
    }

    /// Renumber weights to 1..N when they are not strictly increasing
    fn repair_weights(&mut self, rows: &mut [TimerRow]) {
        if rows.windows(2).all(|pair| pair[0].weight < pair[1].weight) {
            return;
        }

        warn!("Timer weights are not strictly increasing, renormalizing");
        for (position, row) in rows.iter_mut().enumerate() {
            let weight = position as i64 + 1;
            if row.weight == weight {
                continue;
            }
            if let Err(e) = self.store.update_weight(row.id, weight) {
                warn!(id = row.id, "Failed to persist repaired weight: {}", e);
            }
            row.weight = weight;
        }
    }

    fn emit_changed(&self) {
        self.events
            .publish(AppEvent::TimersChanged(Arc::new(self.timers.clone())));
    }
}

fn timer_from_row(row: TimerRow) -> Timer {
    let timer_type = TimerType::normalize(row.timer_type.as_deref().unwrap_or_default());
    let kind = TimerKind::new(timer_type, normalize_duration(timer_type, row.duration_ms));
    let mut timer = Timer::new(row.id, kind, row.name, row.description, row.weight);
    timer.text_alert = row.text_alert;
    timer.audio_alert = row.audio_alert;
    timer.show_on_web = row.show_on_web;
    timer
}

fn to_db_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}
