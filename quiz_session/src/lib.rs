mod config;
pub mod manual;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use std::collections::HashMap;

pub use crate::config::*;

/// The set of questions presented during one session.
///
/// The order of the rows is randomized once, when the snapshot is built, and
/// never changes afterwards.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuizSnapshot {
    rows: Vec<QuestionRow>,
}

impl QuizSnapshot {
    /// Builds a snapshot from the rows in the given order.
    pub fn new(rows: Vec<QuestionRow>) -> QuizSnapshot {
        QuizSnapshot { rows }
    }

    /// Builds a snapshot after shuffling the rows.
    pub fn shuffled<R: Rng + ?Sized>(mut rows: Vec<QuestionRow>, rng: &mut R) -> QuizSnapshot {
        rows.shuffle(rng);
        QuizSnapshot { rows }
    }

    pub fn rows(&self) -> &[QuestionRow] {
        &self.rows
    }

    /// The questions as they are presented, keyed by their text.
    ///
    /// A question appears at the position of its first occurrence, with the
    /// options of its last occurrence.
    pub fn questions(&self) -> Vec<&QuestionRow> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut res: Vec<&QuestionRow> = Vec::new();
        for row in self.rows.iter() {
            if let Some(pos) = positions.get(row.question.as_str()) {
                debug!("questions: duplicate question {:?} replaced", row.question);
                res[*pos] = row;
            } else {
                positions.insert(row.question.as_str(), res.len());
                res.push(row);
            }
        }
        res
    }

    /// The mapping from question text to the correct option. Last row wins.
    pub fn correct_answers(&self) -> HashMap<String, String> {
        self.rows
            .iter()
            .map(|r| (r.question.clone(), r.correct_answer.clone()))
            .collect()
    }

    fn find(&self, question: &str) -> Option<&QuestionRow> {
        self.rows.iter().rev().find(|r| r.question == question)
    }
}

/// Counts the questions where the selected option matches the correct one.
///
/// Keys present in only one of the mappings do not count.
pub fn score(answers: &HashMap<String, String>, correct_answers: &HashMap<String, String>) -> u32 {
    answers
        .iter()
        .filter(|(q, a)| correct_answers.get(*q) == Some(*a))
        .count() as u32
}

/// The state of a session after a tick of the timer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Tick {
    NotStarted,
    Running { remaining_secs: u64 },
    TimedOut(Submission),
    Closed,
}

/// All the state held for one participant, from the identity form to the
/// final submission.
///
/// Every field moves forward only: nothing is reset within a session.
#[derive(Debug, Clone)]
pub struct Session {
    rules: QuizRules,
    participant: Option<Participant>,
    start_time: Option<DateTime<Utc>>,
    // The largest elapsed time seen by the timer so far.
    max_elapsed_secs: u64,
    snapshot: Option<QuizSnapshot>,
    correct_answers: Option<HashMap<String, String>>,
    user_answers: HashMap<String, String>,
    submitted: bool,
    quiz_closed: bool,
    score: Option<u32>,
}

impl Session {
    pub fn new(rules: &QuizRules) -> Session {
        Session {
            rules: *rules,
            participant: None,
            start_time: None,
            max_elapsed_secs: 0,
            snapshot: None,
            correct_answers: None,
            user_answers: HashMap::new(),
            submitted: false,
            quiz_closed: false,
            score: None,
        }
    }

    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    /// Records the participant and starts the clock.
    pub fn start(&mut self, participant: Participant, now: DateTime<Utc>) -> Result<(), SessionErrors> {
        if self.participant.is_some() {
            return Err(SessionErrors::AlreadyStarted);
        }
        if !participant.is_complete() {
            return Err(SessionErrors::IncompleteParticipant);
        }
        info!("Session started at {} for {:?}", now, participant);
        self.participant = Some(participant);
        self.start_time = Some(now);
        Ok(())
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn snapshot(&self) -> Option<&QuizSnapshot> {
        self.snapshot.as_ref()
    }

    /// Shuffles and keeps the rows, unless a snapshot is already held.
    /// In that case the rows are dropped and the existing snapshot is returned.
    pub fn install_snapshot<R: Rng + ?Sized>(
        &mut self,
        rows: Vec<QuestionRow>,
        rng: &mut R,
    ) -> &QuizSnapshot {
        let correct_answers = &mut self.correct_answers;
        self.snapshot.get_or_insert_with(|| {
            info!("Installing quiz snapshot with {} rows", rows.len());
            let snapshot = QuizSnapshot::shuffled(rows, rng);
            *correct_answers = Some(snapshot.correct_answers());
            snapshot
        })
    }

    /// The questions to present. Empty until a snapshot is installed.
    pub fn questions(&self) -> Vec<&QuestionRow> {
        self.snapshot
            .as_ref()
            .map(|s| s.questions())
            .unwrap_or_default()
    }

    /// Records the option chosen for a question, replacing any earlier choice.
    pub fn select(&mut self, question: &str, option: &str) -> Result<(), SessionErrors> {
        if !self.is_started() {
            return Err(SessionErrors::NotStarted);
        }
        if self.submitted {
            return Err(SessionErrors::AlreadySubmitted);
        }
        let snapshot = self.snapshot.as_ref().ok_or(SessionErrors::NoQuestions)?;
        let row = snapshot
            .find(question)
            .ok_or_else(|| SessionErrors::UnknownQuestion(question.to_string()))?;
        if !row.has_option(option) {
            return Err(SessionErrors::UnknownOption {
                question: question.to_string(),
                option: option.to_string(),
            });
        }
        debug!("select: {:?} -> {:?}", question, option);
        self.user_answers
            .insert(question.to_string(), option.to_string());
        Ok(())
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.user_answers
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let start = self.start_time?;
        let observed = (now - start).num_seconds().max(0) as u64;
        Some(observed.max(self.max_elapsed_secs))
    }

    /// Seconds left before the quiz closes, or `None` if it has not started.
    ///
    /// Never more than what the last tick reported, even if the clock goes
    /// backwards.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let elapsed = self.elapsed_secs(now)?;
        Some(self.rules.duration_secs.saturating_sub(elapsed))
    }

    /// Advances the timer. The first tick that finds no time left submits
    /// the session; every later tick reports it as closed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.submitted {
            return Tick::Closed;
        }
        if let Some(elapsed) = self.elapsed_secs(now) {
            self.max_elapsed_secs = elapsed;
        }
        match self.remaining_secs(now) {
            None => Tick::NotStarted,
            Some(0) => {
                info!("Time is up, submitting automatically");
                Tick::TimedOut(self.close(SubmitReason::Timeout))
            }
            Some(remaining_secs) => Tick::Running { remaining_secs },
        }
    }

    /// Submits the answers given so far.
    pub fn submit(&mut self) -> Result<Submission, SessionErrors> {
        if !self.is_started() {
            return Err(SessionErrors::NotStarted);
        }
        if self.submitted {
            return Err(SessionErrors::AlreadySubmitted);
        }
        if self.snapshot.is_none() {
            return Err(SessionErrors::NoQuestions);
        }
        Ok(self.close(SubmitReason::Manual))
    }

    fn close(&mut self, reason: SubmitReason) -> Submission {
        self.submitted = true;
        self.quiz_closed = true;
        let result = match (&self.correct_answers, &self.participant) {
            (Some(correct), Some(participant)) => {
                let s = score(&self.user_answers, correct);
                info!(
                    "Submission ({:?}): {} correct out of {} questions",
                    reason,
                    s,
                    correct.len()
                );
                self.score = Some(s);
                Some(ResultRow::new(participant, s))
            }
            _ => {
                info!("Submission ({:?}) without any loaded question", reason);
                None
            }
        };
        Submission { reason, result }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn is_closed(&self) -> bool {
        self.quiz_closed
    }

    pub fn score(&self) -> Option<u32> {
        self.score
    }
}
