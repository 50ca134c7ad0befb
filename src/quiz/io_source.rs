// Reading the questions of the quiz.

use log::{debug, info};
use quiz_session::{QuestionRow, QuizSnapshot, Session};
use rand::Rng;
use snafu::prelude::*;

use crate::quiz::github::ContentHost;
use crate::quiz::io_common::{get_col_index_mapping, header_names, first_sheet_from_bytes, TableCell};
use crate::quiz::*;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Question",
    "Option 1",
    "Option 2",
    "Option 3",
    "Option 4",
    "Correct Answer",
];

/// Parses the questions from the content of an Excel file.
///
/// The table must have at least one data row and all the required columns.
/// Rows where every cell is blank are skipped.
pub fn parse_quiz_rows(bytes: &[u8], name: &str) -> QuizResult<Vec<QuestionRow>> {
    let wrange = first_sheet_from_bytes(bytes, name)?;

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyQuizDataSnafu {})?;
    debug!("parse_quiz_rows: header: {:?}", header);

    let data: Vec<Vec<TableCell>> = iter
        .map(|row| row.iter().map(TableCell::from_calamine).collect::<Vec<_>>())
        .filter(|row: &Vec<TableCell>| !row.iter().all(|c| c.is_empty()))
        .collect();
    ensure!(!data.is_empty(), EmptyQuizDataSnafu {});

    let col_indexes = get_col_index_mapping(&REQUIRED_COLUMNS, &header_names(header))?;
    debug!("parse_quiz_rows: col_indexes: {:?}", col_indexes);

    let res: Vec<QuestionRow> = data
        .iter()
        .map(|row| {
            let cell = |idx: usize| row.get(col_indexes[idx]).map(|c| c.text()).unwrap_or_default();
            QuestionRow {
                question: cell(0),
                options: [cell(1), cell(2), cell(3), cell(4)],
                correct_answer: cell(5),
            }
        })
        .collect();
    debug!("parse_quiz_rows: {} questions", res.len());
    Ok(res)
}

/// Returns the snapshot of the session, downloading and shuffling the
/// questions if this has not happened yet.
///
/// Once a snapshot is held, the host is not contacted any more.
pub fn fetch_quiz<'a, H: ContentHost + ?Sized, R: Rng + ?Sized>(
    session: &'a mut Session,
    host: &H,
    path: &str,
    rng: &mut R,
) -> QuizResult<&'a QuizSnapshot> {
    if session.snapshot().is_none() {
        info!("Fetching quiz data from {}", path);
        let reply = host.get_raw(path)?;
        ensure!(
            reply.status == 200,
            SourceStatusSnafu {
                status: reply.status
            }
        );
        let rows = parse_quiz_rows(&reply.body, path)?;
        session.install_snapshot(rows, rng);
    }
    session.snapshot().context(EmptyQuizDataSnafu {})
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::quiz::github::{HttpReply, PutContents};
    use quiz_session::QuizRules;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_xlsxwriter::Workbook;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// An in-memory repository.
    #[derive(Default)]
    pub(crate) struct FakeHost {
        pub raw: RefCell<HashMap<String, HttpReply>>,
        pub contents: RefCell<HashMap<String, HttpReply>>,
        pub put_status: Cell<Option<u16>>,
        pub puts: RefCell<Vec<(String, PutContents)>>,
        pub raw_calls: Cell<u32>,
    }

    impl ContentHost for FakeHost {
        fn get_raw(&self, path: &str) -> QuizResult<HttpReply> {
            self.raw_calls.set(self.raw_calls.get() + 1);
            Ok(self.raw.borrow().get(path).cloned().unwrap_or(HttpReply {
                status: 404,
                body: b"404: Not Found".to_vec(),
            }))
        }

        fn get_contents(&self, path: &str) -> QuizResult<HttpReply> {
            Ok(self.contents.borrow().get(path).cloned().unwrap_or(HttpReply {
                status: 404,
                body: br#"{"message": "Not Found"}"#.to_vec(),
            }))
        }

        fn put_contents(&self, path: &str, body: &PutContents) -> QuizResult<HttpReply> {
            self.puts.borrow_mut().push((path.to_string(), body.clone()));
            let status = self.put_status.get().unwrap_or(201);
            Ok(HttpReply {
                status,
                body: b"{}".to_vec(),
            })
        }
    }

    /// Writes a workbook with a header and rows of text cells.
    pub(crate) fn xlsx(header: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in header.iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                sheet.write_string((r + 1) as u32, c as u16, *v).unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn quiz_bytes() -> Vec<u8> {
        xlsx(
            &REQUIRED_COLUMNS,
            &[
                vec!["2+2?", "3", "4", "5", "6", "4"],
                vec!["Capital of France?", "Rome", "Paris", "Oslo", "Bern", "Paris"],
                vec!["Largest planet?", "Mars", "Venus", "Jupiter", "Earth", "Jupiter"],
            ],
        )
    }

    #[test]
    fn parse_rows() {
        let rows = parse_quiz_rows(&quiz_bytes(), "quiz").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], QuestionRow::new("Capital of France?", ["Rome", "Paris", "Oslo", "Bern"], "Paris"));
    }

    #[test]
    fn numeric_cells_read_as_text() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in REQUIRED_COLUMNS.iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        sheet.write_string(1, 0, "3*3?").unwrap();
        for (c, v) in [6.0, 9.0, 12.0, 15.0, 9.0].iter().enumerate() {
            sheet.write_number(1, (c + 1) as u16, *v).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();
        let rows = parse_quiz_rows(&bytes, "quiz").unwrap();
        assert_eq!(rows, vec![QuestionRow::new("3*3?", ["6", "9", "12", "15"], "9")]);
    }

    #[test]
    fn extra_columns_in_any_order() {
        let bytes = xlsx(
            &["Correct Answer", "Id", "Option 4", "Option 3", "Option 2", "Option 1", "Question"],
            &[vec!["b", "17", "d", "c", "b", "a", "Pick b"]],
        );
        let rows = parse_quiz_rows(&bytes, "quiz").unwrap();
        assert_eq!(rows, vec![QuestionRow::new("Pick b", ["a", "b", "c", "d"], "b")]);
    }

    #[test]
    fn missing_columns() {
        let bytes = xlsx(
            &["Question", "Option 1", "Option 2"],
            &[vec!["Q?", "a", "b"]],
        );
        match parse_quiz_rows(&bytes, "quiz") {
            Err(QuizError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Option 3", "Option 4", "Correct Answer"])
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn header_only_is_empty() {
        let bytes = xlsx(&REQUIRED_COLUMNS, &[]);
        assert!(matches!(
            parse_quiz_rows(&bytes, "quiz"),
            Err(QuizError::EmptyQuizData {})
        ));
    }

    #[test]
    fn not_a_spreadsheet() {
        assert!(matches!(
            parse_quiz_rows(b"<html>not found</html>", "quiz"),
            Err(QuizError::OpeningExcel { .. })
        ));
    }

    fn host_with_quiz() -> FakeHost {
        let host = FakeHost::default();
        host.raw.borrow_mut().insert(
            "quiz_data.xlsx".to_string(),
            HttpReply {
                status: 200,
                body: quiz_bytes(),
            },
        );
        host
    }

    #[test]
    fn fetch_once_per_session() {
        let host = host_with_quiz();
        let mut session = Session::new(&QuizRules::DEFAULT_RULES);
        let mut rng = StdRng::seed_from_u64(11);
        let first = fetch_quiz(&mut session, &host, "quiz_data.xlsx", &mut rng)
            .unwrap()
            .clone();
        let second = fetch_quiz(&mut session, &host, "quiz_data.xlsx", &mut rng)
            .unwrap()
            .clone();
        assert_eq!(first, second);
        assert_eq!(first.rows().len(), 3);
        assert_eq!(host.raw_calls.get(), 1);
    }

    #[test]
    fn fetch_failure_leaves_no_questions() {
        let host = FakeHost::default();
        let mut session = Session::new(&QuizRules::DEFAULT_RULES);
        let mut rng = StdRng::seed_from_u64(11);
        match fetch_quiz(&mut session, &host, "quiz_data.xlsx", &mut rng) {
            Err(QuizError::SourceStatus { status }) => assert_eq!(status, 404),
            x => panic!("unexpected {:?}", x),
        }
        assert!(session.snapshot().is_none());
        assert!(session.questions().is_empty());

        // Tried again on the next attempt.
        let _ = fetch_quiz(&mut session, &host, "quiz_data.xlsx", &mut rng);
        assert_eq!(host.raw_calls.get(), 2);
    }

    #[test]
    fn schema_error_presents_no_question() {
        let host = FakeHost::default();
        host.raw.borrow_mut().insert(
            "quiz_data.xlsx".to_string(),
            HttpReply {
                status: 200,
                body: xlsx(&["Question", "Option 1", "Correct Answer"], &[vec!["Q?", "a", "a"]]),
            },
        );
        let mut session = Session::new(&QuizRules::DEFAULT_RULES);
        let mut rng = StdRng::seed_from_u64(11);
        assert!(matches!(
            fetch_quiz(&mut session, &host, "quiz_data.xlsx", &mut rng),
            Err(QuizError::MissingColumns { .. })
        ));
        assert!(session.questions().is_empty());
    }

    #[test]
    fn duplicate_question_shown_once() {
        let host = FakeHost::default();
        host.raw.borrow_mut().insert(
            "quiz_data.xlsx".to_string(),
            HttpReply {
                status: 200,
                body: xlsx(
                    &REQUIRED_COLUMNS,
                    &[
                        vec!["Same?", "a", "b", "c", "d", "a"],
                        vec!["Same?", "w", "x", "y", "z", "z"],
                    ],
                ),
            },
        );
        let mut session = Session::new(&QuizRules::DEFAULT_RULES);
        let mut rng = StdRng::seed_from_u64(5);
        fetch_quiz(&mut session, &host, "quiz_data.xlsx", &mut rng).unwrap();
        let snapshot_last = session.snapshot().unwrap().rows()[1].clone();
        let questions = session.questions();
        assert_eq!(questions.len(), 1);
        assert_eq!(*questions[0], snapshot_last);
    }
}
