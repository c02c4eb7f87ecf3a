use crate::{
    routes::students::{
        create_student, delete_student, get_all_students, get_student, update_student,
        update_student_partial,
    },
    state::CollegeState,
};
use axum::{
    Router,
    routing::{get, post},
};

pub mod students;

pub fn router() -> Router<CollegeState> {
    Router::new()
        .route("/students/all", get(get_all_students))
        .route("/students", post(create_student))
        .route(
            "/students/{key}",
            get(get_student)
                .put(update_student)
                .patch(update_student_partial)
                .delete(delete_student),
        )
}
