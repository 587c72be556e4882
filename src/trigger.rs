//! Single-target control, for a hardware button or shared toolbar that acts
//! on "the current stopwatch" without naming one.

use crate::engine::TimerEngine;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriggerIntent {
    /// Start if stopped, stop if running.
    StartStop,
    /// Record a lap if running, start if stopped.
    Lap,
}

impl TimerEngine {
    /// Fires `intent` at the active stopwatch, falling back to the first one,
    /// or to a freshly added one when there are none. Returns the target id.
    pub fn trigger(&self, intent: TriggerIntent) -> String {
        let snapshot = self.snapshot();
        let target = snapshot.active().or_else(|| snapshot.stopwatches.first());

        let (id, running) = match target {
            Some(sw) => (sw.id.clone(), sw.is_running),
            None => (self.add(), false),
        };

        log::debug!("trigger {:?} -> {} (running: {})", intent, id, running);
        match (intent, running) {
            (_, false) => self.start(&id),
            (TriggerIntent::StartStop, true) => self.stop(&id),
            (TriggerIntent::Lap, true) => self.record_lap(&id),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn manual_engine() -> (TimerEngine, ManualClock) {
        let clock = ManualClock::new(0);
        let engine = TimerEngine::with_clock(EngineConfig::default(), Arc::new(clock.clone()));
        (engine, clock)
    }

    fn wait_elapsed(engine: &TimerEngine, id: &str, ms: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.get(id).map(|sw| sw.elapsed_ms) != Some(ms) {
            assert!(Instant::now() < deadline, "timed out waiting for {}ms", ms);
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_trigger_on_empty_creates_and_starts() {
        let (engine, _) = manual_engine();
        let id = engine.trigger(TriggerIntent::StartStop);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.active_id.as_deref(), Some(id.as_str()));
        assert!(snapshot.get(&id).unwrap().is_running);
    }

    #[test]
    fn test_trigger_toggles_active() {
        let (engine, _) = manual_engine();
        let a = engine.add();
        let b = engine.add();
        engine.set_active(&b);

        assert_eq!(engine.trigger(TriggerIntent::StartStop), b);
        assert!(engine.get(&b).unwrap().is_running);
        assert!(!engine.get(&a).unwrap().is_running);

        engine.trigger(TriggerIntent::StartStop);
        assert!(!engine.get(&b).unwrap().is_running);
    }

    #[test]
    fn test_trigger_lap() {
        let (engine, clock) = manual_engine();
        let id = engine.add();

        // Idle watch: a lap press starts it
        engine.trigger(TriggerIntent::Lap);
        assert!(engine.get(&id).unwrap().is_running);
        assert!(engine.get(&id).unwrap().laps.is_empty());

        clock.advance(1500);
        wait_elapsed(&engine, &id, 1500);
        engine.trigger(TriggerIntent::Lap);

        let laps = engine.get(&id).unwrap().laps;
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].lap_time_ms, 1500);
    }
}
