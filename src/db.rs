//! Guest registry and room assignments on top of an `SqlitePool`.
//!
//! Tables are created on first use of a [`Registry`] handle. Every operation
//! is a single statement; nothing here is composed into a transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::{SqlitePool, types::Json};
use thiserror::Error;
use time::{Date, PrimitiveDateTime};
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
#[error("storage failure: {0}")]
pub struct StorageError(#[from] pub sqlx::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Association {
    Bride,
    Groom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGuest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub association: Association,
    pub connection: String,
    pub photo_url: Option<String>,
    pub date_of_birth: Option<Date>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub voice_note_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredGuest {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub association: Association,
    pub connection: String,
    pub photo_url: Option<String>,
    pub date_of_birth: Option<Date>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub voice_note_url: Option<String>,
    pub created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRoomAssignment {
    pub name: String,
    pub date_of_birth: Date,
    pub room_number: String,
    pub hotel_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredRoomAssignment {
    pub id: i64,
    pub name: String,
    pub date_of_birth: Date,
    pub room_number: String,
    pub hotel_name: String,
    pub created_at: PrimitiveDateTime,
}

/// Reference text the assistant may quote, keyed by its embedding vector.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct KnowledgeDocument {
    pub id: i64,
    pub contents: String,
    #[serde(skip)]
    pub embedding: Json<Vec<f32>>,
    pub created_at: PrimitiveDateTime,
}

const SCHEMA: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS guests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        association TEXT NOT NULL CHECK (association IN ('bride', 'groom')),
        connection TEXT NOT NULL,
        photo_url TEXT,
        date_of_birth DATE,
        location TEXT,
        bio TEXT,
        voice_note_url TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS room_assignments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        date_of_birth DATE NOT NULL,
        room_number TEXT NOT NULL,
        hotel_name TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS knowledge_documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        contents TEXT NOT NULL,
        embedding TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
];

#[derive(Clone)]
pub struct Registry {
    db_pool: SqlitePool,
    schema: Arc<OnceCell<()>>,
}

impl Registry {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            schema: Arc::new(OnceCell::new()),
        }
    }

    /// Waits for in-flight queries and closes every pooled connection.
    pub async fn close(&self) {
        self.db_pool.close().await;
    }

    /// Creates missing tables. Runs once per handle; a failed attempt is retried on the next call.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.schema
            .get_or_try_init(|| async {
                for ddl in SCHEMA {
                    sqlx::query(ddl).execute(&self.db_pool).await?;
                }
                tracing::debug!("registry schema ready");
                Ok::<(), StorageError>(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_guest(&self, guest: &NewGuest) -> Result<StoredGuest, StorageError> {
        self.ensure_schema().await?;

        let stored = sqlx::query_as::<_, StoredGuest>(
            "INSERT INTO guests (name,email,phone,association,connection,photo_url,date_of_birth,location,bio,voice_note_url)
             VALUES (?,?,?,?,?,?,?,?,?,?)
             RETURNING *",
        )
        .bind(&guest.name)
        .bind(&guest.email)
        .bind(&guest.phone)
        .bind(guest.association)
        .bind(&guest.connection)
        .bind(&guest.photo_url)
        .bind(guest.date_of_birth)
        .bind(&guest.location)
        .bind(&guest.bio)
        .bind(&guest.voice_note_url)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(stored)
    }

    /// Newest first. Rows sharing a timestamp second fall back to insertion order.
    pub async fn list_guests(&self) -> Result<Vec<StoredGuest>, StorageError> {
        self.ensure_schema().await?;

        let guests = sqlx::query_as::<_, StoredGuest>("SELECT * FROM guests ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.db_pool)
            .await?;
        Ok(guests)
    }

    pub async fn insert_room_assignment(
        &self,
        assignment: &NewRoomAssignment,
    ) -> Result<StoredRoomAssignment, StorageError> {
        self.ensure_schema().await?;

        let stored = sqlx::query_as::<_, StoredRoomAssignment>(
            "INSERT INTO room_assignments (name,date_of_birth,room_number,hotel_name)
             VALUES (?,?,?,?)
             RETURNING *",
        )
        .bind(&assignment.name)
        .bind(assignment.date_of_birth)
        .bind(&assignment.room_number)
        .bind(&assignment.hotel_name)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(stored)
    }

    pub async fn list_room_assignments(&self) -> Result<Vec<StoredRoomAssignment>, StorageError> {
        self.ensure_schema().await?;

        let assignments =
            sqlx::query_as::<_, StoredRoomAssignment>("SELECT * FROM room_assignments ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.db_pool)
                .await?;
        Ok(assignments)
    }

    /// Oldest matching row wins when several assignments share a date of birth.
    pub async fn find_room_assignment_by_date_of_birth(
        &self,
        date_of_birth: Date,
    ) -> Result<Option<StoredRoomAssignment>, StorageError> {
        self.ensure_schema().await?;

        let assignment = sqlx::query_as::<_, StoredRoomAssignment>(
            "SELECT * FROM room_assignments WHERE date_of_birth=? ORDER BY id LIMIT 1",
        )
        .bind(date_of_birth)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(assignment)
    }

    pub async fn insert_document(
        &self,
        contents: &str,
        embedding: &[f32],
    ) -> Result<KnowledgeDocument, StorageError> {
        self.ensure_schema().await?;

        let stored = sqlx::query_as::<_, KnowledgeDocument>(
            "INSERT INTO knowledge_documents (contents,embedding) VALUES (?,?) RETURNING *",
        )
        .bind(contents)
        .bind(Json(embedding))
        .fetch_one(&self.db_pool)
        .await?;
        Ok(stored)
    }

    pub async fn list_documents(&self) -> Result<Vec<KnowledgeDocument>, StorageError> {
        self.ensure_schema().await?;

        let documents = sqlx::query_as::<_, KnowledgeDocument>("SELECT * FROM knowledge_documents ORDER BY id")
            .fetch_all(&self.db_pool)
            .await?;
        Ok(documents)
    }
}
