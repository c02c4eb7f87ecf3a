use crate::{
    data::student::{NewStudent, Student},
    error::{
        BadNameMatchSnafu, CollegeError, CollegeResult, InvalidStudentIdSnafu, MissingStudentSnafu,
    },
};
use async_trait::async_trait;
use snafu::{OptionExt, ensure};
use std::{fmt::Debug, str::FromStr};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod student;

/// How a read is going to be used by the caller.
///
/// `Detached` signals that the caller will mutate the returned copy and write it back wholesale.
/// Stores without an identity map (both of ours) treat the two modes the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Tracked,
    Detached,
}

/// How `get_by_name` compares the requested name against stored names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    #[default]
    Substring,
    Exact,
}

impl FromStr for NameMatch {
    type Err = CollegeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" | "contains" => Ok(Self::Substring),
            "exact" => Ok(Self::Exact),
            _ => BadNameMatchSnafu { provided: s }.fail(),
        }
    }
}

/// Storage for student records.
///
/// Absent rows are `Ok(None)`, never an error. Store failures (including the unique email
/// constraint) come back as server-side errors.
#[async_trait]
pub trait StudentRepository: Send + Sync + Debug {
    async fn get_all(&self) -> CollegeResult<Vec<Student>>;
    async fn get_by_id(&self, id: i32, mode: ReadMode) -> CollegeResult<Option<Student>>;
    /// Returns the lowest-id student whose name matches.
    async fn get_by_name(&self, name: &str, matching: NameMatch) -> CollegeResult<Option<Student>>;
    async fn create(&self, student: NewStudent) -> CollegeResult<i32>;
    /// Fails with `MissingStudent` if no row has `student.id`.
    async fn update(&self, student: Student) -> CollegeResult<i32>;
    async fn delete(&self, student: &Student) -> CollegeResult<bool>;

    async fn shutdown(&self) {}
}

/// Checks a raw route id. Non-positive ids are a bad request, ids past `i32::MAX` can never exist.
pub fn student_id(raw: i64) -> CollegeResult<i32> {
    ensure!(raw > 0, InvalidStudentIdSnafu { id: raw });
    i32::try_from(raw).ok().context(MissingStudentSnafu { id: raw })
}
