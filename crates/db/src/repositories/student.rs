//! Student repository.
//!
//! Students are owned by the wider hostel system; the ledger only needs to
//! know that an id exists.

use chrono::Utc;
use hostel_shared::types::StudentId;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use crate::entities::students;

/// Student repository for registration and lookup.
#[derive(Debug, Clone)]
pub struct StudentRepository {
    db: DatabaseConnection,
}

impl StudentRepository {
    /// Creates a new student repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a student.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, full_name: &str) -> Result<students::Model, DbErr> {
        self.register(StudentId::new(), full_name).await
    }

    /// Registers a student under an id issued elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including when the id
    /// is already registered.
    pub async fn register(&self, id: StudentId, full_name: &str) -> Result<students::Model, DbErr> {
        students::ActiveModel {
            id: Set(id.into_inner()),
            full_name: Set(full_name.trim().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
    }

    /// Finds a student by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: StudentId) -> Result<Option<students::Model>, DbErr> {
        students::Entity::find_by_id(id.into_inner()).one(&self.db).await
    }
}
