use std::{
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use derive_more::{AsRef, Deref};
use fs_err::File;
use log::debug;
use serde_json::Value;
use thiserror::Error;

/// Ordered, duplicate-free list of upper-cased course codes.
#[derive(Clone, PartialEq, Eq, Debug, AsRef, Deref)]
#[as_ref(forward)]
pub struct CourseList(Vec<String>);

#[derive(Debug, Error)]
pub enum CourseListLoadError {
    #[error("Course list file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("An I/O error occurred when loading the course list: {0:?}")]
    Io(io::Error),
    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("JSON in {0:?} must be an object with an array named 'course_codes'")]
    Format(PathBuf),
    #[error("No usable course codes found in {0:?}")]
    Empty(PathBuf),
}

impl CourseList {
    /// Loads a JSON document of the form `{"course_codes": [...]}`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CourseListLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CourseListLoadError::NotFound(path.to_owned()),
            _ => CourseListLoadError::Io(e),
        })?;
        let value: Value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            CourseListLoadError::Json {
                path: path.to_owned(),
                source,
            }
        })?;
        let Some(raw_codes) = value.get("course_codes").and_then(Value::as_array) else {
            return Err(CourseListLoadError::Format(path.to_owned()));
        };
        let list = Self::from_codes(raw_codes.iter().filter_map(|code| match code.as_str() {
            Some(code) => Some(code),
            None => {
                debug!("Ignoring non-string course code {code}");
                None
            }
        }));
        if list.is_empty() {
            return Err(CourseListLoadError::Empty(path.to_owned()));
        }
        debug!("Loaded {} course code(s) from {path:?}", list.len());
        Ok(list)
    }

    /// Trims and upper-cases each code, dropping blanks and later duplicates.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = vec![];
        for code in codes {
            let code = code.as_ref().trim();
            if code.is_empty() {
                continue;
            }
            let code = code.to_uppercase();
            if !cleaned.contains(&code) {
                cleaned.push(code);
            }
        }
        Self(cleaned)
    }

    pub fn truncate(&mut self, limit: usize) {
        self.0.truncate(limit);
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{CourseList, CourseListLoadError};

    fn write_input(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_normalises_and_deduplicates() {
        let file = write_input(r#"{"course_codes": ["comp1511", "COMP1511", " comp2521 "]}"#);
        let list = CourseList::load(file.path()).unwrap();
        assert_eq!(list.as_slice(), ["COMP1511", "COMP2521"]);
    }

    #[test]
    fn test_load_skips_unusable_entries() {
        let file = write_input(
            r#"{"course_codes": [null, 3, "", "   ", "math1131", {"a": 1}, "Math1131", "ARTS1000"]}"#,
        );
        let list = CourseList::load(file.path()).unwrap();
        assert_eq!(list.as_slice(), ["MATH1131", "ARTS1000"]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CourseList::load(dir.path().join("missing.json")),
            Err(CourseListLoadError::NotFound(_))
        ));

        let file = write_input("{not json");
        assert!(matches!(
            CourseList::load(file.path()),
            Err(CourseListLoadError::Json { .. })
        ));

        for contents in [r#"["COMP1511"]"#, r#"{"course_codes": "COMP1511"}"#, r#"{"codes": []}"#] {
            let file = write_input(contents);
            assert!(
                matches!(
                    CourseList::load(file.path()),
                    Err(CourseListLoadError::Format(_))
                ),
                "{contents}"
            );
        }

        let file = write_input(r#"{"course_codes": [" ", 1]}"#);
        assert!(matches!(
            CourseList::load(file.path()),
            Err(CourseListLoadError::Empty(_))
        ));
    }

    #[test]
    fn test_truncate() {
        let mut list = CourseList::from_codes(["a", "b", "c"]);
        list.truncate(2);
        assert_eq!(list.into_inner(), ["A", "B"]);
    }
}
