//! Pure stopwatch entities and timing logic with no platform dependencies.
//! Every transition takes the current time explicitly and returns a new value,
//! so the engine can swap whole entities in and out of its collection.

/// A recorded split.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Lap {
    pub lap_number: u32,
    pub lap_time_ms: u64,
    pub total_time_ms: u64,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Stopwatch {
    pub id: String,
    pub name: String,
    pub elapsed_ms: u64,
    pub is_running: bool,
    pub laps: Vec<Lap>,
    /// Wall-clock time at which elapsed was zero for the current run segment.
    pub start_epoch_ms: u64,
}

impl Stopwatch {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elapsed_ms: 0,
            is_running: false,
            laps: Vec::new(),
            start_epoch_ms: 0,
        }
    }

    /// Returns the running copy, or `None` if already running.
    pub fn started(&self, now_ms: u64) -> Option<Self> {
        if self.is_running {
            return None;
        }
        Some(Self {
            is_running: true,
            // Resuming keeps the time already on the clock
            start_epoch_ms: now_ms.saturating_sub(self.elapsed_ms),
            ..self.clone()
        })
    }

    /// Returns the stopped copy with elapsed frozen, or `None` if not running.
    pub fn stopped(&self) -> Option<Self> {
        if !self.is_running {
            return None;
        }
        Some(Self {
            is_running: false,
            ..self.clone()
        })
    }

    /// Refreshes elapsed from the wall clock. `None` when not running.
    pub fn ticked(&self, now_ms: u64) -> Option<Self> {
        if !self.is_running {
            return None;
        }
        // Never run backwards if the wall clock steps back
        let elapsed_ms = now_ms
            .saturating_sub(self.start_epoch_ms)
            .max(self.elapsed_ms);
        Some(Self {
            elapsed_ms,
            ..self.clone()
        })
    }

    /// Appends a lap at the current elapsed value. `None` when not running.
    pub fn with_lap(&self) -> Option<Self> {
        if !self.is_running {
            return None;
        }
        let mut laps = self.laps.clone();
        laps.push(next_lap(&self.laps, self.elapsed_ms));
        Some(Self {
            laps,
            ..self.clone()
        })
    }

    pub fn reset(&self) -> Self {
        Self {
            elapsed_ms: 0,
            is_running: false,
            laps: Vec::new(),
            start_epoch_ms: 0,
            ..self.clone()
        }
    }

    pub fn renamed(&self, raw: &str, default_label: &str) -> Self {
        Self {
            name: normalize_name(raw, default_label),
            ..self.clone()
        }
    }

    pub fn last_lap(&self) -> Option<&Lap> {
        self.laps.last()
    }
}

/// Builds the lap that follows `laps` when the clock reads `elapsed_ms`.
pub fn next_lap(laps: &[Lap], elapsed_ms: u64) -> Lap {
    let previous_total = laps.last().map(|lap| lap.total_time_ms).unwrap_or(0);
    Lap {
        lap_number: laps.len() as u32 + 1,
        lap_time_ms: elapsed_ms.saturating_sub(previous_total),
        total_time_ms: elapsed_ms,
    }
}

/// "<label> <n>", where n is 1-based.
pub fn default_name(label: &str, n: usize) -> String {
    format!("{} {}", label, n)
}

/// Trims whitespace; blank input collapses to the default label.
pub fn normalize_name(raw: &str, default_label: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default_label.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format milliseconds as "MM:SS.cs". Minutes are not clamped and the
/// centiseconds are truncated.
pub fn format_elapsed(ms: u64) -> String {
    let total_secs = ms / 1000;
    let cs = (ms % 1000) / 10;
    let m = total_secs / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}.{:02}", m, s, cs)
}
