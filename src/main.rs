use std::io::{self, BufRead, Write};

use stopwatches::{ui, EngineConfig, TimerEngine, TriggerIntent};

const APP_NAME: &str = "stopwatches";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Add,
    Remove(usize),
    Start(usize),
    Stop(usize),
    Lap(usize),
    Reset(usize),
    Rename(usize, String),
    Use(usize),
    Go,
    Split,
    Show,
    Help,
    Quit,
}

fn parse_row(arg: Option<&str>) -> Option<usize> {
    arg?.trim().parse::<usize>().ok().filter(|&n| n > 0)
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, Some(rest.trim_start())),
        None => (line, None),
    };
    let cmd = match verb {
        "add" | "a" => Command::Add,
        "rm" => Command::Remove(parse_row(rest)?),
        "start" => Command::Start(parse_row(rest)?),
        "stop" => Command::Stop(parse_row(rest)?),
        "lap" | "l" => Command::Lap(parse_row(rest)?),
        "reset" | "r" => Command::Reset(parse_row(rest)?),
        "name" => {
            let (row, name) = match rest?.split_once(char::is_whitespace) {
                Some((row, name)) => (row, name),
                None => (rest?, ""),
            };
            Command::Rename(parse_row(Some(row))?, name.to_string())
        }
        "use" => Command::Use(parse_row(rest)?),
        "go" | "g" => Command::Go,
        "split" | "s" => Command::Split,
        "show" | "" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// Maps a 1-based row to the id shown on that row.
fn id_at(engine: &TimerEngine, row: usize) -> Option<String> {
    engine
        .snapshot()
        .stopwatches
        .get(row - 1)
        .map(|sw| sw.id.clone())
}

/// Returns false when the host should exit.
fn handle_command(engine: &TimerEngine, cmd: Command) -> bool {
    let by_row = |row: usize, op: fn(&TimerEngine, &str)| match id_at(engine, row) {
        Some(id) => op(engine, &id),
        None => log::warn!("no stopwatch on row {}", row),
    };

    match cmd {
        Command::Add => {
            engine.add();
        }
        Command::Remove(row) => by_row(row, TimerEngine::remove),
        Command::Start(row) => by_row(row, TimerEngine::start),
        Command::Stop(row) => by_row(row, TimerEngine::stop),
        Command::Lap(row) => by_row(row, TimerEngine::record_lap),
        Command::Reset(row) => by_row(row, TimerEngine::reset),
        Command::Use(row) => by_row(row, TimerEngine::set_active),
        Command::Rename(row, name) => match id_at(engine, row) {
            Some(id) => engine.rename(&id, &name),
            None => log::warn!("no stopwatch on row {}", row),
        },
        Command::Go => {
            engine.trigger(TriggerIntent::StartStop);
        }
        Command::Split => {
            engine.trigger(TriggerIntent::Lap);
        }
        Command::Show => {}
        Command::Help => {
            println!("{}", ui::help_text());
            return true;
        }
        Command::Quit => return false,
    }
    true
}

fn main() {
    env_logger::init();

    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        log::warn!("{}; using defaults", e);
        EngineConfig::default()
    });
    let engine = TimerEngine::new(config);
    log::info!("{} ready", APP_NAME);

    println!("{}", ui::help_text());
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("{}> ", APP_NAME);
    stdout.flush().ok();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("stdin read failed: {}", e);
                break;
            }
        };
        match parse_command(&line) {
            Some(cmd) => {
                if !handle_command(&engine, cmd) {
                    break;
                }
                print!("{}", ui::draw_snapshot(&engine.snapshot()));
            }
            None => log::error!("unknown command: {:?}", line.trim()),
        }
        print!("{}> ", APP_NAME);
        stdout.flush().ok();
    }

    engine.shutdown();
    log::info!("{} exiting", APP_NAME);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stopwatches::ManualClock;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("add"), Some(Command::Add));
        assert_eq!(parse_command("  start 2 "), Some(Command::Start(2)));
        assert_eq!(parse_command("lap 1"), Some(Command::Lap(1)));
        assert_eq!(
            parse_command("name 1   Morning run "),
            Some(Command::Rename(1, "  Morning run".to_string()))
        );
        assert_eq!(parse_command("name 3"), Some(Command::Rename(3, String::new())));
        assert_eq!(parse_command(""), Some(Command::Show));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("start"), None);
        assert_eq!(parse_command("start 0"), None);
        assert_eq!(parse_command("stop x"), None);
        assert_eq!(parse_command("dance"), None);
    }

    #[test]
    fn test_handle_command_routes_rows() {
        let clock = ManualClock::new(0);
        let engine = TimerEngine::with_clock(EngineConfig::default(), Arc::new(clock));
        assert!(handle_command(&engine, Command::Add));
        assert!(handle_command(&engine, Command::Add));
        assert!(handle_command(&engine, Command::Rename(2, "  Intervals ".to_string())));
        assert!(handle_command(&engine, Command::Use(2)));
        assert!(handle_command(&engine, Command::Go));
        assert!(handle_command(&engine, Command::Remove(9)));

        let snapshot = engine.snapshot();
        let second = &snapshot.stopwatches[1];
        assert_eq!(second.name, "Intervals");
        assert!(second.is_running);
        assert_eq!(snapshot.active_id.as_deref(), Some(second.id.as_str()));
        assert!(!snapshot.stopwatches[0].is_running);

        assert!(!handle_command(&engine, Command::Quit));
    }
}
