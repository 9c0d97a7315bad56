//! Operator REPL
//!
//! Line-oriented console for the chamber operator. Commands are parsed
//! into a [`Command`] first so parsing stays testable apart from the
//! terminal loop.

use anyhow::Result;
use plenum_application::ports::audit::AuditSink;
use plenum_application::{PulsationProcessor, RollCallService, SessionService};
use plenum_domain::{BallotValue, RollCallView, SessionView};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(u32),
    Close,
    Status,
    Roll {
        number: u32,
        kind: String,
        topic: String,
        over_present: bool,
        fraction: f64,
    },
    Key { device: String, key: String },
    ForceClose,
    Tie(BallotValue),
    Floor(String),
    Grant,
    Revoke,
    Tail,
    Help,
    Quit,
}

#[derive(Debug, PartialEq)]
pub struct ParseError(String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse one console line. Empty lines are the caller's problem.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or("");
    let rest: Vec<&str> = words.collect();

    let usage = |text: &str| Err(ParseError(format!("Usage: {}", text)));

    match head {
        "open" => match rest.first().and_then(|w| w.parse().ok()) {
            Some(n) if rest.len() == 1 => Ok(Command::Open(n)),
            _ => usage("open <session-number>"),
        },
        "close" => Ok(Command::Close),
        "status" => Ok(Command::Status),
        "roll" => parse_roll(&rest),
        "key" => match rest.as_slice() {
            [device, key] => Ok(Command::Key {
                device: device.to_string(),
                key: key.to_string(),
            }),
            _ => usage("key <device-id> <key>"),
        },
        "force-close" => Ok(Command::ForceClose),
        "tie" => match rest.as_slice() {
            [word] => word
                .parse()
                .map(Command::Tie)
                .map_err(|_| ParseError("Usage: tie <positive|negative>".to_string())),
            _ => usage("tie <positive|negative>"),
        },
        "floor" => match rest.as_slice() {
            [member] => Ok(Command::Floor(member.to_string())),
            _ => usage("floor <member-id>"),
        },
        "grant" => Ok(Command::Grant),
        "revoke" => Ok(Command::Revoke),
        "tail" => Ok(Command::Tail),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ParseError(format!(
            "Unknown command: {}. Type help for the list.",
            other
        ))),
    }
}

/// `roll <number> <kind> <topic…> [--over-present] [--fraction <f>]`
fn parse_roll(rest: &[&str]) -> Result<Command, ParseError> {
    const USAGE: &str =
        "Usage: roll <number> <kind> <topic...> [--over-present] [--fraction <f>]";

    let mut over_present = false;
    let mut fraction = 0.0;
    let mut positional: Vec<&str> = Vec::new();

    let mut words = rest.iter();
    while let Some(word) = words.next() {
        match *word {
            "--over-present" => over_present = true,
            "--fraction" => {
                fraction = words
                    .next()
                    .and_then(|w| w.parse().ok())
                    .filter(|f| (0.0..=1.0).contains(f))
                    .ok_or_else(|| {
                        ParseError("--fraction takes a number between 0 and 1".to_string())
                    })?;
            }
            w => positional.push(w),
        }
    }

    let [number, kind, topic @ ..] = positional.as_slice() else {
        return Err(ParseError(USAGE.to_string()));
    };
    let number = number
        .parse()
        .map_err(|_| ParseError(USAGE.to_string()))?;
    if topic.is_empty() {
        return Err(ParseError(USAGE.to_string()));
    }

    Ok(Command::Roll {
        number,
        kind: kind.to_string(),
        topic: topic.join(" "),
        over_present,
        fraction,
    })
}

pub struct ConsoleRepl {
    sessions: SessionService,
    roll_calls: RollCallService,
    processor: Arc<PulsationProcessor>,
    audit: Arc<dyn AuditSink>,
}

impl ConsoleRepl {
    pub fn new(
        sessions: SessionService,
        roll_calls: RollCallService,
        processor: Arc<PulsationProcessor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            sessions,
            roll_calls,
            processor,
            audit,
        }
    }

    /// Run the interactive loop until `quit` or EOF.
    pub fn run(&self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("plenum").join("history.txt"));
        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        println!("plenum console. Type help for commands.");

        loop {
            match rl.readline("plenum> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);

                    match parse_command(line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.dispatch(command),
                        Err(e) => println!("{}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }
        Ok(())
    }

    fn dispatch(&self, command: Command) {
        match command {
            Command::Open(n) => match self.sessions.open(n) {
                Ok(view) => print_session(&view),
                Err(e) => println!("{}", e),
            },
            Command::Close => match self.sessions.close() {
                Ok(view) => println!(
                    "Session {} closed ({} roll calls held)",
                    view.number,
                    view.roll_calls.len()
                ),
                Err(e) => println!("{}", e),
            },
            Command::Status => match self.sessions.current() {
                Some(view) => print_status(&view, self.roll_calls.current().as_ref()),
                None => println!("No session is open"),
            },
            Command::Roll {
                number,
                kind,
                topic,
                over_present,
                fraction,
            } => match self
                .roll_calls
                .open(number, &kind, &topic, over_present, fraction)
            {
                Ok(view) => print_roll_call(&view),
                Err(e) => println!("{}", e),
            },
            Command::Key { device, key } => match self.processor.process(&device, &key) {
                Ok(result) => match serde_json::to_string_pretty(&result) {
                    Ok(json) => println!("{}", json),
                    Err(e) => println!("render error: {}", e),
                },
                Err(e) => println!("{}", e),
            },
            Command::ForceClose => match self.roll_calls.force_close() {
                Ok(view) => print_roll_call(&view),
                Err(e) => println!("{}", e),
            },
            Command::Tie(value) => match self.roll_calls.tie_break(value) {
                Ok(view) => print_roll_call(&view),
                Err(e) => println!("{}", e),
            },
            Command::Floor(member_id) => {
                match self.sessions.toggle_floor_request(&member_id) {
                    Ok(toggle) => println!("Floor request: {:?}", toggle),
                    Err(e) => println!("{}", e),
                }
            }
            Command::Grant => match self.sessions.grant_floor() {
                Ok(Some(member)) => println!("Floor granted to {}", member.short_label()),
                Ok(None) => println!("Floor queue is empty; holder cleared"),
                Err(e) => println!("{}", e),
            },
            Command::Revoke => match self.sessions.revoke_floor() {
                Ok(()) => println!("Floor revoked"),
                Err(e) => println!("{}", e),
            },
            Command::Tail => {
                for line in self.audit.tail() {
                    println!("{}", line);
                }
            }
            Command::Help => print_help(),
            Command::Quit => {}
        }
    }
}

fn print_session(view: &SessionView) {
    println!(
        "Session {} open: {} members, {} present, quorum {}",
        view.number, view.total_count, view.present_count, view.quorum
    );
}

fn print_status(view: &SessionView, current: Option<&RollCallView>) {
    print_session(view);
    match current {
        Some(round) => print_roll_call(round),
        None => println!("No roll call open ({} held this session)", view.roll_calls.len()),
    }
    if view.floor_queue.is_empty() && view.floor_holder.is_none() {
        println!("Floor: free");
    } else {
        let queue: Vec<String> = view.floor_queue.iter().map(|m| m.short_label()).collect();
        println!(
            "Floor: holder {}, queue [{}]",
            view.floor_holder
                .as_ref()
                .map(|m| m.short_label())
                .unwrap_or_else(|| "-".to_string()),
            queue.join(", ")
        );
    }
}

fn print_roll_call(view: &RollCallView) {
    println!(
        "Roll call {} ({}) \"{}\": {} - {} positive, {} negative, {} abstentions",
        view.number, view.kind, view.topic, view.state, view.positive, view.negative, view.abstain
    );
}

fn print_help() {
    println!("Commands:");
    println!("  open <n>                 Open session n from the roster file");
    println!("  close                    Close the session (force-closes a running roll call)");
    println!("  status                   Session, roll call and floor summary");
    println!("  roll <n> <kind> <topic>  Open a roll call");
    println!("      [--over-present]     Count the special majority over cast ballots");
    println!("      [--fraction <f>]     Special-majority fraction, 0 for simple majority");
    println!("  key <device> <k>         Inject a keypad pulsation");
    println!("  force-close              Close the roll call without waiting for ballots");
    println!("  tie <positive|negative>  Resolve a tied roll call");
    println!("  floor <member-id>        Toggle a member's floor request");
    println!("  grant                    Give the floor to the head of the queue");
    println!("  revoke                   Take the floor back");
    println!("  tail                     Recent audit lines");
    println!("  help                     This help");
    println!("  quit                     Exit");
}
