use crate::{
    data::{
        NameMatch, ReadMode, StudentRepository,
        student::{NewStudent, Student},
    },
    error::{CollegeResult, DuplicateEmailSnafu, MissingStudentSnafu},
};
use async_trait::async_trait;
use snafu::ensure;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use time::macros::date;
use tokio::sync::RwLock;

/// A store owned by whoever builds it, with the same unique-email rule as the real table.
#[derive(Debug, Default)]
pub struct MemoryStudentRepository {
    inner: RwLock<Inner>,
    calls: AtomicUsize,
    closed: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    students: BTreeMap<i32, Student>,
    last_id: i32,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.students
            .values()
            .any(|student| student.email == email && Some(student.id) != except)
    }
}

fn name_matches(matching: NameMatch, candidate: &str, wanted: &str) -> bool {
    match matching {
        NameMatch::Substring => candidate.contains(wanted),
        NameMatch::Exact => candidate == wanted,
    }
}

impl MemoryStudentRepository {
    pub fn seeded() -> Self {
        let mut inner = Inner::default();
        for new_student in [
            NewStudent {
                name: "John Doe".into(),
                email: "johndoe@example.com".into(),
                address: Some("123 Main St".into()),
                date_of_birth: date!(2002 - 12 - 12),
            },
            NewStudent {
                name: "Jane Doe".into(),
                email: "janedoe@example.com".into(),
                address: Some("245 Oxford St".into()),
                date_of_birth: date!(2003 - 11 - 06),
            },
        ] {
            inner.last_id += 1;
            inner
                .students
                .insert(inner.last_id, new_student.with_id(inner.last_id));
        }

        Self {
            inner: RwLock::new(inner),
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// How many repository operations have been run against this store.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<Student> {
        self.inner.read().await.students.values().cloned().collect()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StudentRepository for MemoryStudentRepository {
    async fn get_all(&self) -> CollegeResult<Vec<Student>> {
        self.record_call();
        Ok(self.snapshot().await)
    }

    async fn get_by_id(&self, id: i32, _mode: ReadMode) -> CollegeResult<Option<Student>> {
        self.record_call();
        Ok(self.inner.read().await.students.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str, matching: NameMatch) -> CollegeResult<Option<Student>> {
        self.record_call();
        Ok(self
            .inner
            .read()
            .await
            .students
            .values()
            .find(|student| name_matches(matching, &student.name, name))
            .cloned())
    }

    async fn create(&self, student: NewStudent) -> CollegeResult<i32> {
        self.record_call();
        let mut inner = self.inner.write().await;
        ensure!(
            !inner.email_taken(&student.email, None),
            DuplicateEmailSnafu {
                email: student.email
            }
        );

        inner.last_id += 1;
        let id = inner.last_id;
        inner.students.insert(id, student.with_id(id));
        Ok(id)
    }

    async fn update(&self, student: Student) -> CollegeResult<i32> {
        self.record_call();
        let mut inner = self.inner.write().await;
        let id = student.id;
        ensure!(
            inner.students.contains_key(&id),
            MissingStudentSnafu { id }
        );
        ensure!(
            !inner.email_taken(&student.email, Some(id)),
            DuplicateEmailSnafu {
                email: student.email
            }
        );

        inner.students.insert(id, student);
        Ok(id)
    }

    async fn delete(&self, student: &Student) -> CollegeResult<bool> {
        self.record_call();
        Ok(self
            .inner
            .write()
            .await
            .students
            .remove(&student.id)
            .is_some())
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollegeError;

    fn ada() -> NewStudent {
        NewStudent {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            address: None,
            date_of_birth: date!(2001 - 12 - 10),
        }
    }

    #[tokio::test]
    async fn created_ids_are_fresh_and_never_reused() {
        let repository = MemoryStudentRepository::seeded();

        let id = repository.create(ada()).await.unwrap();
        assert_eq!(id, 3);

        let created = repository.get_by_id(id, ReadMode::Tracked).await.unwrap().unwrap();
        assert!(repository.delete(&created).await.unwrap());

        let again = repository.create(ada()).await.unwrap();
        assert_eq!(again, 4);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repository = MemoryStudentRepository::seeded();
        let clash = NewStudent {
            email: "janedoe@example.com".into(),
            ..ada()
        };

        assert!(matches!(
            repository.create(clash).await,
            Err(CollegeError::DuplicateEmail { .. })
        ));
        assert_eq!(repository.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn update_can_keep_its_own_email_but_not_take_another() {
        let repository = MemoryStudentRepository::seeded();
        let mut john = repository.get_by_id(1, ReadMode::Detached).await.unwrap().unwrap();

        john.name = "Johnny Doe".into();
        assert_eq!(repository.update(john.clone()).await.unwrap(), 1);

        john.email = "janedoe@example.com".into();
        assert!(matches!(
            repository.update(john).await,
            Err(CollegeError::DuplicateEmail { .. })
        ));
    }

    #[tokio::test]
    async fn update_of_missing_student_fails() {
        let repository = MemoryStudentRepository::seeded();
        let ghost = ada().with_id(42);

        assert!(matches!(
            repository.update(ghost).await,
            Err(CollegeError::MissingStudent { id: 42 })
        ));
    }

    #[tokio::test]
    async fn missing_student_wins_over_a_taken_email() {
        let repository = MemoryStudentRepository::seeded();
        let ghost = NewStudent {
            email: "janedoe@example.com".into(),
            ..ada()
        }
        .with_id(42);

        assert!(matches!(
            repository.update(ghost).await,
            Err(CollegeError::MissingStudent { id: 42 })
        ));
        assert_eq!(repository.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn name_lookup_honours_match_mode() {
        let repository = MemoryStudentRepository::seeded();

        let found = repository.get_by_name("Doe", NameMatch::Substring).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(1));

        let exact = repository.get_by_name("Doe", NameMatch::Exact).await.unwrap();
        assert!(exact.is_none());

        let jane = repository.get_by_name("Jane Doe", NameMatch::Exact).await.unwrap();
        assert_eq!(jane.map(|s| s.id), Some(2));
    }
}
