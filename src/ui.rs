use std::fmt::Write;

use timer_core::{format_elapsed, Stopwatch};

use crate::engine::Snapshot;

/// Laps shown per stopwatch, most recent first.
pub const MAX_VISIBLE_LAPS: usize = 5;

pub fn draw_stopwatch(out: &mut String, row: usize, sw: &Stopwatch, active: bool) {
    let marker = if active { '>' } else { ' ' };
    let state = if sw.is_running { "running" } else { "stopped" };
    writeln!(
        out,
        "{} {:2}. {:<20} {}  [{}]",
        marker,
        row,
        sw.name,
        format_elapsed(sw.elapsed_ms),
        state
    )
    .ok();

    for lap in sw.laps.iter().rev().take(MAX_VISIBLE_LAPS) {
        writeln!(
            out,
            "       Lap {:2}: {}  total {}",
            lap.lap_number,
            format_elapsed(lap.lap_time_ms),
            format_elapsed(lap.total_time_ms)
        )
        .ok();
    }
    if sw.laps.len() > MAX_VISIBLE_LAPS {
        writeln!(out, "       ... {} earlier", sw.laps.len() - MAX_VISIBLE_LAPS).ok();
    }
}

/// Renders the whole collection. Rows are 1-based, in creation order.
pub fn draw_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if snapshot.is_empty() {
        out.push_str("  (no stopwatches - 'add' or 'go' to create one)\n");
        return out;
    }
    for (i, sw) in snapshot.stopwatches.iter().enumerate() {
        let active = snapshot.active_id.as_deref() == Some(sw.id.as_str());
        draw_stopwatch(&mut out, i + 1, sw, active);
    }
    out
}

pub fn help_text() -> &'static str {
    "Commands (n = row number):\n\
     \x20 add             new stopwatch\n\
     \x20 rm <n>          remove\n\
     \x20 start <n>       start / resume\n\
     \x20 stop <n>        stop\n\
     \x20 lap <n>         record lap\n\
     \x20 reset <n>       reset\n\
     \x20 name <n> <txt>  rename\n\
     \x20 use <n>         make active\n\
     \x20 go              start/stop the active stopwatch\n\
     \x20 split           lap the active stopwatch\n\
     \x20 show            redraw\n\
     \x20 help            this text\n\
     \x20 quit            exit"
}
