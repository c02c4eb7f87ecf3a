use crate::error::{CollegeError, CollegeResult, InvalidMappingSnafu, ValidationFailedSnafu};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ensure};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

/// Stands in for empty strings when a stored student is shown to the outside world.
pub const NO_DATA_FOUND: &str = "No data found";
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 250;
pub const MAX_ADDRESS_LEN: usize = 500;

const SHORT_DATE: &[BorrowedFormatItem<'_>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");
const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// A stored student. Names may be up to 250 chars here, addresses up to 500.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub date_of_birth: Date,
}

/// A student that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub date_of_birth: Date,
}

impl NewStudent {
    pub fn with_id(self, id: i32) -> Student {
        let Self {
            name,
            email,
            address,
            date_of_birth,
        } = self;

        Student {
            id,
            name,
            email,
            address,
            date_of_birth,
        }
    }
}

/// What goes over the wire. The id lives in the route, never in here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl StudentDto {
    pub fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = vec![];

        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "Student name is required"));
        } else if self.name.chars().count() > MAX_NAME_LEN {
            violations.push(FieldViolation::new(
                "name",
                format!("Student name must be at most {MAX_NAME_LEN} characters"),
            ));
        }

        if self.email.trim().is_empty() {
            violations.push(FieldViolation::new("email", "Student email is required"));
        } else if self.email.chars().count() > MAX_EMAIL_LEN {
            violations.push(FieldViolation::new(
                "email",
                format!("Student email must be at most {MAX_EMAIL_LEN} characters"),
            ));
        } else if !EmailAddress::is_valid(&self.email) {
            violations.push(FieldViolation::new(
                "email",
                "Please enter a valid email address",
            ));
        }

        if self.address.trim().is_empty() {
            violations.push(FieldViolation::new("address", "Student address is required"));
        } else if self.address.chars().count() > MAX_ADDRESS_LEN {
            violations.push(FieldViolation::new(
                "address",
                format!("Student address must be at most {MAX_ADDRESS_LEN} characters"),
            ));
        }

        if self
            .date_of_birth
            .as_deref()
            .is_some_and(|date_of_birth| parse_date(date_of_birth).is_none())
        {
            violations.push(FieldViolation::new(
                "date_of_birth",
                "Date of birth must look like 12/31/2002 or 2002-12-31",
            ));
        }

        violations
    }

    pub fn validate(&self) -> CollegeResult<()> {
        let violations = self.violations();
        ensure!(violations.is_empty(), ValidationFailedSnafu { violations });
        Ok(())
    }
}

pub fn short_date(date: Date) -> String {
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    Date::parse(raw, SHORT_DATE)
        .or_else(|_| Date::parse(raw, ISO_DATE))
        .ok()
}

fn or_placeholder(value: &str) -> String {
    if value.trim().is_empty() {
        NO_DATA_FOUND.to_string()
    } else {
        value.to_string()
    }
}

impl From<&Student> for StudentDto {
    fn from(student: &Student) -> Self {
        Self {
            name: or_placeholder(&student.name),
            email: student.email.clone(),
            address: or_placeholder(student.address.as_deref().unwrap_or_default()),
            date_of_birth: Some(short_date(student.date_of_birth)),
        }
    }
}

impl TryFrom<StudentDto> for NewStudent {
    type Error = CollegeError;

    fn try_from(
        StudentDto {
            name,
            email,
            address,
            date_of_birth,
        }: StudentDto,
    ) -> Result<Self, Self::Error> {
        let raw_date = date_of_birth.context(InvalidMappingSnafu {
            field: "date_of_birth",
            reason: "a date of birth is needed to store a student",
        })?;
        let date_of_birth = parse_date(&raw_date).with_context(|| InvalidMappingSnafu {
            field: "date_of_birth",
            reason: format!("{raw_date:?} is not a recognised date"),
        })?;

        let address = if address.trim().is_empty() || address == NO_DATA_FOUND {
            None
        } else {
            Some(address)
        };

        Ok(Self {
            name,
            email,
            address,
            date_of_birth,
        })
    }
}
