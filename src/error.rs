use crate::data::student::FieldViolation;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snafu::Snafu;
use std::num::ParseIntError;

pub type CollegeResult<T> = Result<T, CollegeError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CollegeError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error getting db connection"))]
    GetDatabaseConnection { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("A student with the email {email:?} already exists"))]
    DuplicateEmail { email: String },
    #[snafu(display("Error migrating DB schema"))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse `{}` as a number", name))]
    ParseNumber {
        source: ParseIntError,
        name: &'static str,
    },
    #[snafu(display("Unknown name match mode {provided:?}, expected `substring` or `exact`"))]
    BadNameMatch { provided: String },
    #[snafu(display("Invalid student ID {id}, IDs must be positive"))]
    InvalidStudentId { id: i64 },
    #[snafu(display("Invalid student name, names must not be empty"))]
    EmptyStudentName,
    #[snafu(display("Missing or malformed request body: {reason}"))]
    MissingBody { reason: String },
    #[snafu(display("Student with ID {id} not found"))]
    MissingStudent { id: i64 },
    #[snafu(display("Student with name {name:?} not found"))]
    MissingStudentNamed { name: String },
    #[snafu(display("Student failed validation"))]
    ValidationFailed { violations: Vec<FieldViolation> },
    #[snafu(display("Patch test failed at {path}: expected {expected}, found {found}"))]
    PatchConflict {
        path: String,
        expected: serde_json::Value,
        found: serde_json::Value,
    },
    #[snafu(display("Unknown or malformed patch path {path:?}"))]
    InvalidPatchPath { path: String },
    #[snafu(display("Invalid value for {path}: {reason}"))]
    InvalidPatchValue { path: String, reason: &'static str },
    #[snafu(display("Unable to map `{field}`: {reason}"))]
    InvalidMapping { field: &'static str, reason: String },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldViolation>,
}

impl CollegeError {
    pub const fn status_code(&self) -> StatusCode {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input

        match self {
            Self::OpenDatabase { .. } | Self::GetDatabaseConnection { .. } => ISE,
            Self::MakeQuery { .. } | Self::DuplicateEmail { .. } | Self::Migrate { .. } => ISE,
            Self::BadEnvVar { .. } | Self::ParseNumber { .. } | Self::BadNameMatch { .. } => ISE,
            Self::InvalidStudentId { .. } | Self::EmptyStudentName | Self::MissingBody { .. } => BI,
            Self::MissingStudent { .. } | Self::MissingStudentNamed { .. } => NF,
            Self::ValidationFailed { .. } | Self::PatchConflict { .. } => BI,
            Self::InvalidPatchPath { .. } | Self::InvalidPatchValue { .. } => BI,
            Self::InvalidMapping { .. } => BI,
        }
    }
}

impl IntoResponse for CollegeError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            warn!(%self, "Rejected request");
        }

        let message = self.to_string();
        let errors = match self {
            Self::ValidationFailed { violations } => violations,
            _ => Vec::new(),
        };

        (status_code, Json(ErrorBody { message, errors })).into_response()
    }
}
