use crate::{
    data::{
        NameMatch, ReadMode, StudentRepository,
        student::{NewStudent, Student},
    },
    error::{
        CollegeError, CollegeResult, GetDatabaseConnectionSnafu, MakeQuerySnafu,
        MissingStudentSnafu,
    },
};
use async_trait::async_trait;
use futures::TryStreamExt;
use snafu::{OptionExt, ResultExt};
use sqlx::{Pool, Postgres, pool::PoolConnection};

const SELECT_STUDENTS: &str =
    "SELECT id, name, email, address, date_of_birth FROM public.students";

#[derive(Debug, Clone)]
pub struct PgStudentRepository {
    pool: Pool<Postgres>,
}

impl PgStudentRepository {
    pub const fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_connection(&self) -> CollegeResult<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .context(GetDatabaseConnectionSnafu)
    }
}

//unique violations on write can only come from the email index
fn write_error(source: sqlx::Error, email: &str) -> CollegeError {
    match &source {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            CollegeError::DuplicateEmail {
                email: email.to_string(),
            }
        }
        _ => CollegeError::MakeQuery { source },
    }
}

fn escape_like(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('%');
    for c in name.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    async fn get_all(&self) -> CollegeResult<Vec<Student>> {
        let mut conn = self.get_connection().await?;

        sqlx::query_as::<_, Student>(&format!("{SELECT_STUDENTS} ORDER BY id"))
            .fetch(&mut *conn)
            .try_collect()
            .await
            .context(MakeQuerySnafu)
    }

    async fn get_by_id(&self, id: i32, mode: ReadMode) -> CollegeResult<Option<Student>> {
        //no identity map here, every read is already detached
        trace!(id, ?mode, "Fetching student");
        let mut conn = self.get_connection().await?;

        sqlx::query_as::<_, Student>(&format!("{SELECT_STUDENTS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .context(MakeQuerySnafu)
    }

    async fn get_by_name(&self, name: &str, matching: NameMatch) -> CollegeResult<Option<Student>> {
        let mut conn = self.get_connection().await?;

        let (condition, pattern) = match matching {
            NameMatch::Substring => ("name LIKE $1", escape_like(name)),
            NameMatch::Exact => ("name = $1", name.to_string()),
        };

        sqlx::query_as::<_, Student>(&format!(
            "{SELECT_STUDENTS} WHERE {condition} ORDER BY id LIMIT 1"
        ))
        .bind(pattern)
        .fetch_optional(&mut *conn)
        .await
        .context(MakeQuerySnafu)
    }

    async fn create(&self, student: NewStudent) -> CollegeResult<i32> {
        let mut conn = self.get_connection().await?;

        sqlx::query_scalar::<_, i32>(
            "INSERT INTO public.students (name, email, address, date_of_birth) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.address)
        .bind(student.date_of_birth)
        .fetch_one(&mut *conn)
        .await
        .map_err(|source| write_error(source, &student.email))
    }

    async fn update(&self, student: Student) -> CollegeResult<i32> {
        let mut conn = self.get_connection().await?;

        sqlx::query_scalar::<_, i32>(
            "UPDATE public.students SET name = $2, email = $3, address = $4, date_of_birth = $5 WHERE id = $1 RETURNING id",
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.address)
        .bind(student.date_of_birth)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|source| write_error(source, &student.email))?
        .context(MissingStudentSnafu { id: student.id })
    }

    async fn delete(&self, student: &Student) -> CollegeResult<bool> {
        let mut conn = self.get_connection().await?;

        let result = sqlx::query("DELETE FROM public.students WHERE id = $1")
            .bind(student.id)
            .execute(&mut *conn)
            .await
            .context(MakeQuerySnafu)?;
        Ok(result.rows_affected() > 0)
    }

    async fn shutdown(&self) {
        self.pool.close().await;
    }
}
