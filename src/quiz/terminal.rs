// A text front-end for the quiz.
//
// The main loop waits for a line of input for at most one tick; every tick
// advances the timer of the session, which submits the quiz when the time
// is up.

use chrono::Utc;
use log::{debug, info, warn};
use quiz_session::{Participant, Session, Submission, Tick};
use rand::thread_rng;
use rand::Rng;
use snafu::prelude::*;
use std::io::{BufRead, Write};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::quiz::github::ContentHost;
use crate::quiz::io_results::Publisher;
use crate::quiz::io_source::fetch_quiz;
use crate::quiz::*;

pub const THANK_YOU: &str = "Thank you for participating! Your responses have been recorded.";

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Input {
    Line(String),
    Closed,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum Command {
    Select { question: usize, option: usize },
    List,
    Submit,
    Help,
}

fn parse_command(line: &str) -> Command {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["submit"] | ["s"] => Command::Submit,
        ["list"] | ["l"] => Command::List,
        [q, o] => match (q.parse::<usize>(), o.parse::<usize>()) {
            (Ok(question), Ok(option)) => Command::Select { question, option },
            _ => Command::Help,
        },
        _ => Command::Help,
    }
}

/// Forwards the lines of the standard input to a channel, from a separate thread.
fn spawn_stdin_reader() -> QuizResult<Receiver<Input>> {
    let (tx, rx) = channel();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(l) => {
                        if tx.send(Input::Line(l)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Error reading the standard input: {}", e);
                        break;
                    }
                }
            }
            let _ = tx.send(Input::Closed);
        })
        .whatever_context("Cannot start the input reader")?;
    Ok(rx)
}

pub fn run_terminal<H: ContentHost + ?Sized>(
    session: &mut Session,
    host: &H,
    quiz_path: &str,
    publisher: &Publisher,
    tick: Duration,
) -> QuizResult<()> {
    let input = spawn_stdin_reader()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    drive(
        session,
        host,
        quiz_path,
        publisher,
        tick,
        &input,
        &mut thread_rng(),
        &mut out,
    )
}

fn say<W: Write>(out: &mut W, text: &str) -> QuizResult<()> {
    writeln!(out, "{}", text).context(TerminalSnafu {})?;
    out.flush().context(TerminalSnafu {})
}

/// Asks for the four identity fields. `None` if the input ends first.
fn read_participant<W: Write>(input: &Receiver<Input>, out: &mut W) -> QuizResult<Option<Participant>> {
    let labels = ["Participant 1 Name", "Participant 2 Name", "Phone Number", "Email ID"];
    let mut values: Vec<String> = Vec::new();
    for label in labels {
        loop {
            say(out, &format!("{}:", label))?;
            match input.recv() {
                Ok(Input::Line(l)) if !l.trim().is_empty() => {
                    values.push(l.trim().to_string());
                    break;
                }
                Ok(Input::Line(_)) => say(out, "Please fill in all fields to start the quiz.")?,
                Ok(Input::Closed) | Err(_) => return Ok(None),
            }
        }
    }
    Ok(Some(Participant {
        name1: values[0].clone(),
        name2: values[1].clone(),
        phone: values[2].clone(),
        email: values[3].clone(),
    }))
}

fn show_questions<W: Write>(session: &Session, out: &mut W) -> QuizResult<()> {
    say(out, "Quiz Questions")?;
    for (i, q) in session.questions().iter().enumerate() {
        say(out, &format!("{}. {}", i + 1, q.question))?;
        let chosen = session.answers().get(&q.question);
        for (j, option) in q.options.iter().enumerate() {
            let mark = if chosen == Some(option) { "*" } else { " " };
            say(out, &format!("  {} {}) {}", mark, j + 1, option))?;
        }
    }
    say(out, "Answer with '<question> <option>', 'list' to show the questions again, 'submit' when done.")
}

/// Fetches the questions if they are not there yet, and shows them.
fn load_questions<H: ContentHost + ?Sized, R: Rng + ?Sized, W: Write>(
    session: &mut Session,
    host: &H,
    quiz_path: &str,
    rng: &mut R,
    out: &mut W,
) -> QuizResult<()> {
    let fetched = fetch_quiz(session, host, quiz_path, rng).map(|_| ());
    match fetched {
        Ok(()) => show_questions(session, out),
        Err(e) => {
            warn!("Error fetching quiz data: {}", e);
            say(out, &format!("Error: {}", e))
        }
    }
}

fn finish<H: ContentHost + ?Sized, W: Write>(
    host: &H,
    publisher: &Publisher,
    submission: &Submission,
    out: &mut W,
) -> QuizResult<()> {
    if let Some(result) = &submission.result {
        let report = publisher.publish(host, result);
        if let Some(Err(e)) = &report.local {
            say(out, &format!("Error saving the score: {}", e))?;
        }
    }
    say(out, THANK_YOU)
}

fn announce(remaining_secs: u64, last: &mut Option<u64>) -> bool {
    if *last == Some(remaining_secs) {
        return false;
    }
    *last = Some(remaining_secs);
    remaining_secs % 10 == 0 || remaining_secs <= 5
}

/// Runs the whole quiz against the given input and output.
#[allow(clippy::too_many_arguments)]
pub fn drive<H: ContentHost + ?Sized, R: Rng + ?Sized, W: Write>(
    session: &mut Session,
    host: &H,
    quiz_path: &str,
    publisher: &Publisher,
    tick: Duration,
    input: &Receiver<Input>,
    rng: &mut R,
    out: &mut W,
) -> QuizResult<()> {
    say(out, "Online Quiz")?;
    let participant = match read_participant(input, out)? {
        Some(p) => p,
        None => {
            info!("Input closed before the quiz started");
            return Ok(());
        }
    };
    session
        .start(participant, Utc::now())
        .context(SessionSnafu {})?;
    say(
        out,
        &format!("You have {} seconds.", session.rules().duration_secs),
    )?;
    load_questions(session, host, quiz_path, rng, out)?;

    let mut input_open = true;
    let mut last_announced: Option<u64> = None;
    loop {
        let received = if input_open {
            match input.recv_timeout(tick) {
                Ok(Input::Line(l)) => Some(l),
                Ok(Input::Closed) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("drive: input closed, waiting for the timer");
                    input_open = false;
                    None
                }
                Err(RecvTimeoutError::Timeout) => None,
            }
        } else {
            thread::sleep(tick);
            None
        };

        match session.tick(Utc::now()) {
            Tick::TimedOut(submission) => {
                say(out, "Time is up!")?;
                return finish(host, publisher, &submission, out);
            }
            Tick::Closed | Tick::NotStarted => return Ok(()),
            Tick::Running { remaining_secs } => {
                if announce(remaining_secs, &mut last_announced) {
                    say(out, &format!("Time Left: {} seconds", remaining_secs))?;
                }
            }
        }

        if session.snapshot().is_none() {
            load_questions(session, host, quiz_path, rng, out)?;
        }

        let line = match received {
            Some(l) => l,
            None => continue,
        };
        match parse_command(&line) {
            Command::Submit => match session.submit() {
                Ok(submission) => return finish(host, publisher, &submission, out),
                Err(e) => say(out, &format!("Error: {}", e))?,
            },
            Command::List => show_questions(session, out)?,
            Command::Select { question, option } => {
                let picked = session.questions().get(question.wrapping_sub(1)).and_then(|q| {
                    q.options
                        .get(option.wrapping_sub(1))
                        .map(|o| (q.question.clone(), o.clone()))
                });
                match picked {
                    Some((q, o)) => match session.select(&q, &o) {
                        Ok(()) => say(out, &format!("{}: {}", q, o))?,
                        Err(e) => say(out, &format!("Error: {}", e))?,
                    },
                    None => say(out, &format!("No option {} for question {}", option, question))?,
                }
            }
            Command::Help => say(
                out,
                "Commands: '<question> <option>', 'list', 'submit'.",
            )?,
        }
    }
}
