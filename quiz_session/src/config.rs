// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One row of the quiz source: a question, its four options and the
/// text of the correct option.
///
/// The question text is also the identity of the row. Two rows with the
/// same text collapse into one entry when the quiz is presented and scored.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct QuestionRow {
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: String,
}

impl QuestionRow {
    pub fn new(question: &str, options: [&str; 4], correct_answer: &str) -> QuestionRow {
        QuestionRow {
            question: question.to_string(),
            options: options.map(|s| s.to_string()),
            correct_answer: correct_answer.to_string(),
        }
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// The identity fields collected before the quiz starts.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Participant {
    pub name1: String,
    pub name2: String,
    pub phone: String,
    pub email: String,
}

impl Participant {
    /// All four fields must be filled in for the quiz to start.
    pub fn is_complete(&self) -> bool {
        [&self.name1, &self.name2, &self.phone, &self.email]
            .iter()
            .all(|s| !s.trim().is_empty())
    }
}

// ******** Output data structures *********

/// The names of the columns of the results table, in order.
pub const RESULT_COLUMNS: [&str; 5] = ["Participant 1", "Participant 2", "Phone", "Email", "Score"];

/// A row appended to the results table once per session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResultRow {
    pub participant1: String,
    pub participant2: String,
    pub phone: String,
    pub email: String,
    pub score: u32,
}

impl ResultRow {
    pub fn new(participant: &Participant, score: u32) -> ResultRow {
        ResultRow {
            participant1: participant.name1.clone(),
            participant2: participant.name2.clone(),
            phone: participant.phone.clone(),
            email: participant.email.clone(),
            score,
        }
    }
}

/// What caused a session to be submitted.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SubmitReason {
    Manual,
    Timeout,
}

/// The outcome of a submission.
///
/// A timeout that fires before any question was loaded closes the session
/// without a score: `result` is then `None` and nothing should be published.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Submission {
    pub reason: SubmitReason,
    pub result: Option<ResultRow>,
}

/// Errors returned when an operation does not fit the current state of the session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SessionErrors {
    IncompleteParticipant,
    AlreadyStarted,
    NotStarted,
    AlreadySubmitted,
    NoQuestions,
    UnknownQuestion(String),
    UnknownOption { question: String, option: String },
}

impl Error for SessionErrors {}

impl Display for SessionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionErrors::IncompleteParticipant => {
                write!(f, "please fill in all fields to start the quiz")
            }
            SessionErrors::AlreadyStarted => write!(f, "the quiz has already started"),
            SessionErrors::NotStarted => write!(f, "the quiz has not started"),
            SessionErrors::AlreadySubmitted => write!(f, "the quiz has already been submitted"),
            SessionErrors::NoQuestions => write!(f, "no questions have been loaded"),
            SessionErrors::UnknownQuestion(q) => write!(f, "unknown question: {}", q),
            SessionErrors::UnknownOption { question, option } => {
                write!(f, "option {:?} is not offered for question {:?}", option, question)
            }
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct QuizRules {
    /// Time allowed from the start of the quiz, in seconds.
    pub duration_secs: u64,
}

impl QuizRules {
    pub const DEFAULT_RULES: QuizRules = QuizRules { duration_secs: 60 };
}

impl Default for QuizRules {
    fn default() -> Self {
        QuizRules::DEFAULT_RULES
    }
}
