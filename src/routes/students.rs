use crate::{
    data::{
        ReadMode,
        student::{NewStudent, StudentDto},
        student_id,
    },
    error::{
        CollegeError, CollegeResult, EmptyStudentNameSnafu, MissingStudentNamedSnafu,
        MissingStudentSnafu,
    },
    patch::{PatchOperation, patch_student},
    state::CollegeState,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use snafu::{OptionExt, ensure};

fn body<T>(body: Result<Json<T>, JsonRejection>) -> CollegeResult<T> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| CollegeError::MissingBody {
            reason: rejection.body_text(),
        })
}

pub async fn get_all_students(
    State(state): State<CollegeState>,
) -> CollegeResult<Json<Vec<StudentDto>>> {
    let students = state.get_all().await?;
    debug!(count = students.len(), "Got all students");
    Ok(Json(students.iter().map(StudentDto::from).collect()))
}

//ids and names share a path segment, anything that parses as a number is an id
pub async fn get_student(
    State(state): State<CollegeState>,
    Path(key): Path<String>,
) -> CollegeResult<Json<StudentDto>> {
    match key.parse::<i64>() {
        Ok(raw_id) => get_student_by_id(&state, raw_id).await,
        Err(_) => get_student_by_name(&state, &key).await,
    }
}

async fn get_student_by_id(state: &CollegeState, raw_id: i64) -> CollegeResult<Json<StudentDto>> {
    let id = student_id(raw_id)?;
    let student = state
        .get_by_id(id, ReadMode::Tracked)
        .await?
        .context(MissingStudentSnafu { id })?;

    Ok(Json(StudentDto::from(&student)))
}

async fn get_student_by_name(state: &CollegeState, name: &str) -> CollegeResult<Json<StudentDto>> {
    ensure!(!name.trim().is_empty(), EmptyStudentNameSnafu);

    let student = state
        .get_by_name(name, state.name_match())
        .await?
        .context(MissingStudentNamedSnafu { name })?;

    Ok(Json(StudentDto::from(&student)))
}

pub async fn create_student(
    State(state): State<CollegeState>,
    dto: Result<Json<StudentDto>, JsonRejection>,
) -> CollegeResult<impl IntoResponse> {
    let dto = body(dto)?;
    dto.validate()?;

    let new_student = NewStudent::try_from(dto)?;
    let id = state.create(new_student.clone()).await?;
    info!(id, "Created student");

    let created = StudentDto::from(&new_student.with_id(id));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/students/{id}"))],
        Json(created),
    ))
}

pub async fn update_student(
    State(state): State<CollegeState>,
    Path(raw_id): Path<i64>,
    dto: Result<Json<StudentDto>, JsonRejection>,
) -> CollegeResult<StatusCode> {
    let id = student_id(raw_id)?;
    let dto = body(dto)?;
    dto.validate()?;

    let student = NewStudent::try_from(dto)?.with_id(id);
    state.update(student).await?;
    info!(id, "Updated student");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_student_partial(
    State(state): State<CollegeState>,
    Path(raw_id): Path<i64>,
    operations: Result<Json<Vec<PatchOperation>>, JsonRejection>,
) -> CollegeResult<StatusCode> {
    let id = student_id(raw_id)?;
    let operations = body(operations)?;

    patch_student(&*state, i64::from(id), &operations).await?;
    info!(id, "Partially updated student");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_student(
    State(state): State<CollegeState>,
    Path(raw_id): Path<i64>,
) -> CollegeResult<StatusCode> {
    let id = student_id(raw_id)?;
    let student = state
        .get_by_id(id, ReadMode::Tracked)
        .await?
        .context(MissingStudentSnafu { id })?;

    //someone else may have got there between the read and the delete
    ensure!(state.delete(&student).await?, MissingStudentSnafu { id });
    info!(id, "Deleted student");

    Ok(StatusCode::NO_CONTENT)
}
