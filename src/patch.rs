//! Partial updates: a small JSON-patch interpreter over [`StudentDto`], and the pipeline that
//! loads a student, patches a detached copy, validates it, and writes it back.
//!
//! Nothing is written until every operation has applied and the result has validated, so a
//! failing patch leaves the stored student exactly as it was.

use crate::{
    data::{
        ReadMode, StudentRepository,
        student::{NewStudent, StudentDto},
        student_id,
    },
    error::{
        CollegeResult, InvalidPatchPathSnafu, InvalidPatchValueSnafu, MissingStudentSnafu,
        PatchConflictSnafu,
    },
};
use serde::Deserialize;
use serde_json::Value;
use snafu::{OptionExt, ensure};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentField {
    Name,
    Email,
    Address,
    DateOfBirth,
}

impl StudentField {
    pub fn from_path(path: &str) -> CollegeResult<Self> {
        let name = path.strip_prefix('/').unwrap_or(path);

        match name.to_ascii_lowercase().as_str() {
            "name" | "studentname" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "address" => Ok(Self::Address),
            "date_of_birth" | "dateofbirth" | "dob" => Ok(Self::DateOfBirth),
            _ => InvalidPatchPathSnafu { path }.fail(),
        }
    }

    pub const fn pointer(self) -> &'static str {
        match self {
            Self::Name => "/name",
            Self::Email => "/email",
            Self::Address => "/address",
            Self::DateOfBirth => "/date_of_birth",
        }
    }

    fn text_mut(self, dto: &mut StudentDto) -> Option<&mut String> {
        match self {
            Self::Name => Some(&mut dto.name),
            Self::Email => Some(&mut dto.email),
            Self::Address => Some(&mut dto.address),
            Self::DateOfBirth => None,
        }
    }

    pub fn value_of(self, dto: &StudentDto) -> Value {
        match self {
            Self::Name => Value::from(dto.name.as_str()),
            Self::Email => Value::from(dto.email.as_str()),
            Self::Address => Value::from(dto.address.as_str()),
            Self::DateOfBirth => dto
                .date_of_birth
                .as_deref()
                .map_or(Value::Null, Value::from),
        }
    }

    //null on a required field clears it, validation reports it afterwards
    fn set(self, dto: &mut StudentDto, value: Value) -> CollegeResult<()> {
        match (self, value) {
            (Self::DateOfBirth, Value::Null) => dto.date_of_birth = None,
            (Self::DateOfBirth, Value::String(date)) => dto.date_of_birth = Some(date),
            (field, Value::Null) => field.clear(dto),
            (field, Value::String(text)) => {
                if let Some(slot) = field.text_mut(dto) {
                    *slot = text;
                }
            }
            (field, _) => {
                return InvalidPatchValueSnafu {
                    path: field.pointer(),
                    reason: "expected a string",
                }
                .fail();
            }
        }
        Ok(())
    }

    fn clear(self, dto: &mut StudentDto) {
        match self {
            Self::Name => dto.name.clear(),
            Self::Email => dto.email.clear(),
            Self::Address => dto.address.clear(),
            Self::DateOfBirth => dto.date_of_birth = None,
        }
    }
}

impl PatchOperation {
    pub fn apply_to(&self, dto: &mut StudentDto) -> CollegeResult<()> {
        match self {
            //the dto has no collection slots, so add on a field is a replace
            Self::Add { path, value } | Self::Replace { path, value } => {
                StudentField::from_path(path)?.set(dto, value.clone())
            }
            Self::Remove { path } => {
                StudentField::from_path(path)?.clear(dto);
                Ok(())
            }
            Self::Move { from, path } => {
                let from = StudentField::from_path(from)?;
                let to = StudentField::from_path(path)?;
                if from != to {
                    let value = from.value_of(dto);
                    from.clear(dto);
                    to.set(dto, value)?;
                }
                Ok(())
            }
            Self::Copy { from, path } => {
                let value = StudentField::from_path(from)?.value_of(dto);
                StudentField::from_path(path)?.set(dto, value)
            }
            Self::Test { path, value } => {
                let field = StudentField::from_path(path)?;
                let found = field.value_of(dto);
                ensure!(
                    found == *value,
                    PatchConflictSnafu {
                        path: field.pointer(),
                        expected: value.clone(),
                        found,
                    }
                );
                Ok(())
            }
        }
    }
}

/// Applies every operation in order. The first failure discards the whole working copy.
pub fn apply_patch(
    mut dto: StudentDto,
    operations: &[PatchOperation],
) -> CollegeResult<StudentDto> {
    for operation in operations {
        operation.apply_to(&mut dto)?;
    }
    Ok(dto)
}

pub async fn patch_student(
    repository: &dyn StudentRepository,
    raw_id: i64,
    operations: &[PatchOperation],
) -> CollegeResult<i32> {
    let id = student_id(raw_id)?;

    let existing = repository
        .get_by_id(id, ReadMode::Detached)
        .await?
        .context(MissingStudentSnafu { id })?;

    let patched = apply_patch(StudentDto::from(&existing), operations)?;
    patched.validate()?;

    let student = NewStudent::try_from(patched)?.with_id(existing.id);
    let id = repository.update(student).await?;
    debug!(id, operations = operations.len(), "Patched student");
    Ok(id)
}
