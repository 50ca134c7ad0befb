// Keeping the scores: a results table appended to on every submission.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use calamine::{DataType, Range};
use log::{debug, info, warn};
use quiz_session::{ResultRow, RESULT_COLUMNS};
use rust_xlsxwriter::{Format, Formula, Workbook};
use snafu::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::quiz::github::{ContentHost, ContentsFile, PutContents};
use crate::quiz::io_common::{first_sheet_from_bytes, first_sheet_from_path, header_names, TableCell};
use crate::quiz::*;

/// A table of results, kept cell by cell as it was read.
#[derive(PartialEq, Debug, Clone)]
pub struct ResultsTable {
    header: Vec<String>,
    rows: Vec<Vec<TableCell>>,
}

impl ResultsTable {
    /// A table with the result columns and no row.
    pub fn empty() -> ResultsTable {
        ResultsTable {
            header: RESULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_range(wrange: &Range<DataType>) -> ResultsTable {
        let mut iter = wrange.rows();
        let header = match iter.next() {
            Some(h) => header_names(h),
            None => return ResultsTable::empty(),
        };
        let rows: Vec<Vec<TableCell>> = iter
            .map(|row| {
                let mut cells: Vec<TableCell> = row.iter().map(TableCell::from_calamine).collect();
                cells.resize(header.len(), TableCell::Empty);
                cells
            })
            .collect();
        debug!("from_range: header: {:?}, {} rows", header, rows.len());
        ResultsTable { header, rows }
    }

    pub fn from_xlsx(bytes: &[u8], name: &str) -> QuizResult<ResultsTable> {
        Ok(ResultsTable::from_range(&first_sheet_from_bytes(bytes, name)?))
    }

    /// Reads the table from a file, or starts an empty one if the file does not exist.
    pub fn read_local(path: &Path) -> QuizResult<ResultsTable> {
        if !path.exists() {
            info!("No results file at {}, starting a new one", path.display());
            return Ok(ResultsTable::empty());
        }
        let p = path.display().to_string();
        Ok(ResultsTable::from_range(&first_sheet_from_path(&p)?))
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<TableCell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.header.iter().position(|h| h == name) {
            return idx;
        }
        self.header.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(TableCell::Empty);
        }
        self.header.len() - 1
    }

    /// Adds a row at the end. Result columns absent from the header are added to it.
    pub fn append(&mut self, result: &ResultRow) {
        let values = [
            TableCell::Text(result.participant1.clone()),
            TableCell::Text(result.participant2.clone()),
            TableCell::Text(result.phone.clone()),
            TableCell::Text(result.email.clone()),
            TableCell::Number(result.score as f64),
        ];
        let indexes: Vec<usize> = RESULT_COLUMNS.iter().map(|c| self.column(c)).collect();
        let mut row = vec![TableCell::Empty; self.header.len()];
        for (idx, value) in indexes.into_iter().zip(values) {
            row[idx] = value;
        }
        self.rows.push(row);
    }

    /// Writes the table as an Excel file, header first.
    ///
    /// Dates keep a date format so they read back as dates. Error values are
    /// written as the matching error constant.
    pub fn to_xlsx(&self) -> QuizResult<Vec<u8>> {
        // Built-in format 14 (m/d/yy) is recognized as a date by readers.
        let date_format = Format::new().set_num_format_index(14);
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, name) in self.header.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, name.as_str())
                .context(WritingExcelSnafu {})?;
        }
        for (r, row) in self.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                let written = match cell {
                    TableCell::Empty => continue,
                    TableCell::Text(s) => worksheet.write_string(r, c, s.as_str()),
                    TableCell::Number(n) => worksheet.write_number(r, c, *n),
                    TableCell::DateTime(n) => {
                        worksheet.write_number_with_format(r, c, *n, &date_format)
                    }
                    TableCell::Bool(b) => worksheet.write_boolean(r, c, *b),
                    TableCell::Error(e) => {
                        let formula = Formula::new(format!("={}", e)).set_result(e.as_str());
                        worksheet.write_formula(r, c, formula)
                    }
                };
                written.context(WritingExcelSnafu {})?;
            }
        }
        workbook.save_to_buffer().context(WritingExcelSnafu {})
    }
}

/// Appends a result to the table kept in the repository.
///
/// The file is read with its version token, then written back with the same
/// token. A missing file is created. Nothing protects against another writer
/// updating the file between the two requests.
pub fn publish_remote<H: ContentHost + ?Sized>(
    host: &H,
    path: &str,
    message: &str,
    result: &ResultRow,
) -> QuizResult<()> {
    let reply = host.get_contents(path)?;
    let (mut table, sha) = if reply.status == 200 {
        let file: ContentsFile = serde_json::from_slice(&reply.body).context(ParsingJsonSnafu {})?;
        // The API wraps the base64 payload in lines.
        let b64: String = file.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD.decode(b64).context(DecodingContentSnafu { path })?;
        (ResultsTable::from_xlsx(&bytes, path)?, Some(file.sha))
    } else {
        info!(
            "Results file {} not found (status {}), creating it",
            path, reply.status
        );
        (ResultsTable::empty(), None)
    };

    table.append(result);
    let body = PutContents {
        message: message.to_string(),
        content: STANDARD.encode(table.to_xlsx()?),
        sha,
    };
    let reply = host.put_contents(path, &body)?;
    ensure!(
        reply.status == 200 || reply.status == 201,
        ResultsStatusSnafu {
            status: reply.status,
            path,
            body: reply.body_text(),
        }
    );
    info!("Score successfully updated in {} ({} rows)", path, table.len());
    Ok(())
}

/// Appends a result to the table kept in a local file, replacing the file.
pub fn save_local(path: &Path, result: &ResultRow) -> QuizResult<()> {
    let mut table = ResultsTable::read_local(path)?;
    table.append(result);
    let bytes = table.to_xlsx()?;
    fs::write(path, bytes).context(LocalFileSnafu {
        path: path.display().to_string(),
    })?;
    info!("Score saved in {} ({} rows)", path.display(), table.len());
    Ok(())
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RemoteTarget {
    pub path: String,
    pub message: String,
}

/// The outcome of each write. `None` when the destination is not configured.
#[derive(Debug)]
pub struct PublishReport {
    pub remote: Option<QuizResult<()>>,
    pub local: Option<QuizResult<()>>,
}

/// Sends a result to every configured destination, independently.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Publisher {
    remote: Option<RemoteTarget>,
    local: Option<PathBuf>,
}

impl Publisher {
    pub fn new(remote: Option<RemoteTarget>, local: Option<PathBuf>) -> Publisher {
        Publisher { remote, local }
    }

    pub fn publish<H: ContentHost + ?Sized>(&self, host: &H, result: &ResultRow) -> PublishReport {
        let remote = self.remote.as_ref().map(|target| {
            let res = publish_remote(host, &target.path, &target.message, result);
            if let Err(e) = &res {
                warn!("Failed to update GitHub file {}: {}", target.path, e);
            }
            res
        });
        let local = self.local.as_ref().map(|path| save_local(path, result));
        PublishReport { remote, local }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::github::HttpReply;
    use crate::quiz::io_source::tests::FakeHost;

    fn result(name: &str, score: u32) -> ResultRow {
        ResultRow {
            participant1: name.to_string(),
            participant2: "Bob".to_string(),
            phone: "5550100".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            score,
        }
    }

    fn table_with(n: usize) -> ResultsTable {
        let mut t = ResultsTable::empty();
        for i in 0..n {
            t.append(&result(&format!("P{}", i), i as u32));
        }
        t
    }

    fn expected_row(r: &ResultRow) -> Vec<TableCell> {
        vec![
            TableCell::Text(r.participant1.clone()),
            TableCell::Text(r.participant2.clone()),
            TableCell::Text(r.phone.clone()),
            TableCell::Text(r.email.clone()),
            TableCell::Number(r.score as f64),
        ]
    }

    fn decode_put(body: &PutContents) -> ResultsTable {
        let bytes = STANDARD.decode(&body.content).unwrap();
        ResultsTable::from_xlsx(&bytes, "put").unwrap()
    }

    #[test]
    fn append_keeps_prior_rows() {
        let before = ResultsTable::from_xlsx(&table_with(3).to_xlsx().unwrap(), "t").unwrap();
        assert_eq!(before.len(), 3);
        let mut after = before.clone();
        let r = result("Anna", 2);
        after.append(&r);
        let after = ResultsTable::from_xlsx(&after.to_xlsx().unwrap(), "t").unwrap();
        assert_eq!(after.len(), 4);
        assert_eq!(&after.rows()[..3], before.rows());
        assert_eq!(after.rows()[3], expected_row(&r));
        assert_eq!(after.header(), RESULT_COLUMNS);
    }

    #[test]
    fn append_keeps_dates() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in RESULT_COLUMNS.iter().chain(["Taken On"].iter()).enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        for (c, v) in ["Carl", "Dora", "5550199", "carl@example.com"].iter().enumerate() {
            sheet.write_string(1, c as u16, *v).unwrap();
        }
        sheet.write_number(1, 4, 2).unwrap();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_number_with_format(1, 5, 45352.0, &date).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let before = ResultsTable::from_xlsx(&bytes, "t").unwrap();
        assert_eq!(before.rows()[0][5], TableCell::DateTime(45352.0));
        let mut after = before.clone();
        after.append(&result("Anna", 1));
        let after = ResultsTable::from_xlsx(&after.to_xlsx().unwrap(), "t").unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(&after.rows()[..1], before.rows());
        assert_eq!(after.rows()[1][5], TableCell::Empty);

        // A second append goes through the date format written above.
        let mut again = after.clone();
        again.append(&result("Eve", 0));
        let again = ResultsTable::from_xlsx(&again.to_xlsx().unwrap(), "t").unwrap();
        assert_eq!(again.rows()[0][5], TableCell::DateTime(45352.0));
    }

    #[test]
    fn foreign_header_gets_result_columns() {
        let bytes = crate::quiz::io_source::tests::xlsx(
            &["Email", "Comment"],
            &[vec!["old@example.com", "first"]],
        );
        let mut t = ResultsTable::from_xlsx(&bytes, "t").unwrap();
        t.append(&result("Anna", 1));
        assert_eq!(
            t.header(),
            ["Email", "Comment", "Participant 1", "Participant 2", "Phone", "Score"]
        );
        assert_eq!(t.rows()[0][2], TableCell::Empty);
        assert_eq!(t.rows()[1][0], TableCell::Text("anna@example.com".to_string()));
        assert_eq!(t.rows()[1][1], TableCell::Empty);
        assert_eq!(t.rows()[1][5], TableCell::Number(1.0));
    }

    #[test]
    fn remote_missing_file_is_created() {
        let host = FakeHost::default();
        let r = result("Anna", 3);
        publish_remote(&host, "results.xlsx", "Append new quiz score", &r).unwrap();
        let puts = host.puts.borrow();
        assert_eq!(puts.len(), 1);
        let (path, body) = &puts[0];
        assert_eq!(path, "results.xlsx");
        assert_eq!(body.message, "Append new quiz score");
        assert_eq!(body.sha, None);
        let t = decode_put(body);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0], expected_row(&r));
    }

    #[test]
    fn remote_existing_file_is_updated_with_sha() {
        let host = FakeHost::default();
        let existing = table_with(2);
        // Line-wrapped like the API does.
        let encoded = STANDARD.encode(existing.to_xlsx().unwrap());
        let wrapped: Vec<String> = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect();
        let file = ContentsFile {
            content: wrapped.join("\n"),
            sha: "3d21ec53a331a6f037a91c368710b99387d012c1".to_string(),
        };
        host.contents.borrow_mut().insert(
            "results.xlsx".to_string(),
            HttpReply {
                status: 200,
                body: serde_json::to_vec(&file).unwrap(),
            },
        );
        let r = result("Anna", 4);
        publish_remote(&host, "results.xlsx", "m", &r).unwrap();
        let puts = host.puts.borrow();
        let (_, body) = &puts[0];
        assert_eq!(body.sha.as_deref(), Some("3d21ec53a331a6f037a91c368710b99387d012c1"));
        let t = decode_put(body);
        assert_eq!(t.len(), 3);
        assert_eq!(&t.rows()[..2], existing.rows());
        assert_eq!(t.rows()[2], expected_row(&r));
    }

    #[test]
    fn remote_rejected_put_is_an_error() {
        let host = FakeHost::default();
        host.put_status.set(Some(409));
        match publish_remote(&host, "results.xlsx", "m", &result("Anna", 1)) {
            Err(QuizError::ResultsStatus { status, .. }) => assert_eq!(status, 409),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn local_file_grows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.xlsx");
        save_local(&path, &result("Anna", 1)).unwrap();
        save_local(&path, &result("Carl", 2)).unwrap();
        let t = ResultsTable::read_local(&path).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[1], expected_row(&result("Carl", 2)));
    }

    #[test]
    fn local_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("sample.xlsx");
        assert!(matches!(
            save_local(&path, &result("Anna", 1)),
            Err(QuizError::LocalFile { .. })
        ));
    }

    #[test]
    fn publisher_paths_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.xlsx");
        let host = FakeHost::default();
        host.put_status.set(Some(500));
        let publisher = Publisher::new(
            Some(RemoteTarget {
                path: "results.xlsx".to_string(),
                message: "m".to_string(),
            }),
            Some(path.clone()),
        );
        let report = publisher.publish(&host, &result("Anna", 1));
        assert!(matches!(report.remote, Some(Err(_))));
        assert!(matches!(report.local, Some(Ok(()))));
        assert_eq!(ResultsTable::read_local(&path).unwrap().len(), 1);

        let local_only = Publisher::new(None, None);
        let report = local_only.publish(&host, &result("Anna", 1));
        assert!(report.remote.is_none());
        assert!(report.local.is_none());
    }
}
