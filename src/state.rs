use crate::{
    config::RuntimeConfiguration,
    data::{NameMatch, StudentRepository, postgres::PgStudentRepository},
    error::{CollegeResult, MigrateSnafu, OpenDatabaseSnafu},
};
use snafu::ResultExt;
use sqlx::postgres::PgPoolOptions;
use std::{ops::Deref, sync::Arc};

#[derive(Clone, Debug)]
pub struct CollegeState {
    students: Arc<dyn StudentRepository>,
    name_match: NameMatch,
}

impl CollegeState {
    pub async fn new(options: PgPoolOptions, config: &RuntimeConfiguration) -> CollegeResult<Self> {
        let pool = options
            .connect(&config.db_config().get_db_path())
            .await
            .context(OpenDatabaseSnafu)?;

        sqlx::migrate!().run(&pool).await.context(MigrateSnafu)?;

        Ok(Self::with_repository(
            Arc::new(PgStudentRepository::new(pool)),
            config.name_match(),
        ))
    }

    pub fn with_repository(students: Arc<dyn StudentRepository>, name_match: NameMatch) -> Self {
        Self {
            students,
            name_match,
        }
    }

    pub const fn name_match(&self) -> NameMatch {
        self.name_match
    }

    pub async fn sensible_shutdown(&self) {
        self.students.shutdown().await;
    }
}

impl Deref for CollegeState {
    type Target = dyn StudentRepository;

    fn deref(&self) -> &Self::Target {
        &*self.students
    }
}
