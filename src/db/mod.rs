//! Record store for practitioners, patients and prescriptions.
//!
//! One `Database` handle over two backing variants: SQLite for local
//! development, PostgreSQL in production. The variant is picked from the
//! connection URL scheme, mirroring the deployment split the service has
//! always run with. List operations return most-recent-first; ties on
//! `created_at` (epoch seconds) fall back to id descending so the order is
//! deterministic within one second.

use std::str::FromStr;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, Row, SqlitePool};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{Diagnosis, MedicineEntry, Patient, PrescriptionRecord, User};

/// How many recent prescriptions a plain listing returns.
pub const RECENT_PRESCRIPTIONS_LIMIT: i64 = 50;

#[derive(Clone)]
pub enum DatabaseBackend {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

#[derive(Clone)]
pub struct Database {
    backend: DatabaseBackend,
}

/// Flat prescription row; JSON columns are expanded by `into_record`.
#[derive(sqlx::FromRow)]
struct PrescriptionRow {
    id: i64,
    user_id: i64,
    patient_id: i64,
    symptoms: String,
    health_conditions: String,
    diagnosis_primary: String,
    diagnosis_secondary: String,
    diagnosis_ayurvedic: String,
    medicines: String,
    notes: Option<String>,
    created_at: i64,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    name: String,
    phone: Option<String>,
    registration_number: Option<String>,
    created_at: i64,
}

#[derive(sqlx::FromRow)]
struct PatientRow {
    id: i64,
    user_id: i64,
    name: String,
    age: i64,
    gender: String,
    phone: Option<String>,
    created_at: i64,
}

impl PrescriptionRow {
    fn into_record(self) -> Result<PrescriptionRecord, AppError> {
        Ok(PrescriptionRecord {
            id: self.id,
            user_id: self.user_id,
            patient_id: self.patient_id,
            symptoms: parse_json(&self.symptoms)?,
            health_conditions: parse_json(&self.health_conditions)?,
            diagnosis: Diagnosis {
                primary_condition: self.diagnosis_primary,
                secondary_conditions: parse_json(&self.diagnosis_secondary)?,
                ayurvedic_analysis: self.diagnosis_ayurvedic,
            },
            medicines: parse_json(&self.medicines)?,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            phone: self.phone,
            registration_number: self.registration_number,
            created_at: self.created_at,
        }
    }
}

impl PatientRow {
    fn into_patient(self) -> Patient {
        Patient {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            phone: self.phone,
            created_at: self.created_at,
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::Store(sqlx::Error::Decode(Box::new(e))))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Store(sqlx::Error::Decode(Box::new(e))))
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            // 23505 is Postgres unique_violation; SQLite reports the
            // constraint in the message.
            db.code().map(|c| c == "23505").unwrap_or(false)
                || db.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

impl Database {
    /// Connect to the store named by `url` and ensure the schema exists.
    ///
    /// `postgres://` URLs select the production backend; anything else is
    /// treated as a SQLite path.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let backend = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            info!("connected to postgres store");
            DatabaseBackend::Postgres(pool)
        } else {
            let options = SqliteConnectOptions::from_str(url)
                .map_err(sqlx::Error::from)?
                .create_if_missing(true);
            // In-memory databases exist per connection; keep one.
            let max = if url.contains(":memory:") { 1 } else { 5 };
            let pool = SqlitePoolOptions::new()
                .max_connections(max)
                .connect_with(options)
                .await?;
            info!("connected to sqlite store");
            DatabaseBackend::Sqlite(pool)
        };

        let db = Self { backend };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), AppError> {
        match &self.backend {
            DatabaseBackend::Sqlite(pool) => {
                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS users (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        email TEXT UNIQUE NOT NULL,
                        password_hash TEXT NOT NULL,
                        name TEXT NOT NULL,
                        phone TEXT,
                        registration_number TEXT,
                        created_at INTEGER NOT NULL
                    )",
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS patients (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        user_id INTEGER NOT NULL,
                        name TEXT NOT NULL,
                        age INTEGER NOT NULL,
                        gender TEXT NOT NULL,
                        phone TEXT,
                        created_at INTEGER NOT NULL,
                        FOREIGN KEY (user_id) REFERENCES users(id)
                    )",
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS prescriptions (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        user_id INTEGER NOT NULL,
                        patient_id INTEGER NOT NULL,
                        symptoms TEXT NOT NULL,
                        health_conditions TEXT NOT NULL,
                        diagnosis_primary TEXT NOT NULL,
                        diagnosis_secondary TEXT NOT NULL,
                        diagnosis_ayurvedic TEXT NOT NULL,
                        medicines TEXT NOT NULL,
                        notes TEXT,
                        created_at INTEGER NOT NULL,
                        FOREIGN KEY (user_id) REFERENCES users(id),
                        FOREIGN KEY (patient_id) REFERENCES patients(id)
                    )",
                )
                .execute(pool)
                .await?;
            }
            DatabaseBackend::Postgres(pool) => {
                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS users (
                        id BIGSERIAL PRIMARY KEY,
                        email VARCHAR(255) UNIQUE NOT NULL,
                        password_hash VARCHAR(255) NOT NULL,
                        name VARCHAR(255) NOT NULL,
                        phone VARCHAR(50),
                        registration_number VARCHAR(100),
                        created_at BIGINT NOT NULL
                    )",
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS patients (
                        id BIGSERIAL PRIMARY KEY,
                        user_id BIGINT NOT NULL REFERENCES users(id),
                        name VARCHAR(255) NOT NULL,
                        age BIGINT NOT NULL,
                        gender VARCHAR(50) NOT NULL,
                        phone VARCHAR(50),
                        created_at BIGINT NOT NULL
                    )",
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS prescriptions (
                        id BIGSERIAL PRIMARY KEY,
                        user_id BIGINT NOT NULL REFERENCES users(id),
                        patient_id BIGINT NOT NULL REFERENCES patients(id),
                        symptoms TEXT NOT NULL,
                        health_conditions TEXT NOT NULL,
                        diagnosis_primary TEXT NOT NULL,
                        diagnosis_secondary TEXT NOT NULL,
                        diagnosis_ayurvedic TEXT NOT NULL,
                        medicines TEXT NOT NULL,
                        notes TEXT,
                        created_at BIGINT NOT NULL
                    )",
                )
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    // ===== Users =====

    #[instrument(skip(self, password_hash))]
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        phone: Option<&str>,
        registration_number: Option<&str>,
    ) -> Result<i64, AppError> {
        let now = now_epoch();
        let result = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query(
                "INSERT INTO users (email, password_hash, name, phone, registration_number, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(email)
            .bind(password_hash)
            .bind(name)
            .bind(phone)
            .bind(registration_number)
            .bind(now)
            .execute(pool)
            .await
            .map(|r| r.last_insert_rowid()),
            DatabaseBackend::Postgres(pool) => sqlx::query(
                "INSERT INTO users (email, password_hash, name, phone, registration_number, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(email)
            .bind(password_hash)
            .bind(name)
            .bind(phone)
            .bind(registration_number)
            .bind(now)
            .fetch_one(pool)
            .await
            .and_then(|row| row.try_get("id")),
        };

        result.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::EmailTaken
            } else {
                AppError::Store(e)
            }
        })
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = match &self.backend {
            DatabaseBackend::Sqlite(pool) => {
                sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
                    .bind(email)
                    .fetch_optional(pool)
                    .await?
            }
            DatabaseBackend::Postgres(pool) => {
                sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
                    .bind(email)
                    .fetch_optional(pool)
                    .await?
            }
        };
        Ok(row.map(UserRow::into_user))
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let row = match &self.backend {
            DatabaseBackend::Sqlite(pool) => {
                sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?
            }
            DatabaseBackend::Postgres(pool) => {
                sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?
            }
        };
        Ok(row.map(UserRow::into_user))
    }

    // ===== Patients =====

    #[instrument(skip(self))]
    pub async fn create_patient(
        &self,
        user_id: i64,
        name: &str,
        age: i64,
        gender: &str,
        phone: Option<&str>,
    ) -> Result<i64, AppError> {
        let now = now_epoch();
        let id = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query(
                "INSERT INTO patients (user_id, name, age, gender, phone, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(name)
            .bind(age)
            .bind(gender)
            .bind(phone)
            .bind(now)
            .execute(pool)
            .await?
            .last_insert_rowid(),
            DatabaseBackend::Postgres(pool) => sqlx::query(
                "INSERT INTO patients (user_id, name, age, gender, phone, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(user_id)
            .bind(name)
            .bind(age)
            .bind(gender)
            .bind(phone)
            .bind(now)
            .fetch_one(pool)
            .await?
            .try_get("id")?,
        };
        Ok(id)
    }

    pub async fn get_patient(
        &self,
        patient_id: i64,
        user_id: i64,
    ) -> Result<Option<Patient>, AppError> {
        let row = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query_as::<_, PatientRow>(
                "SELECT * FROM patients WHERE id = ? AND user_id = ?",
            )
            .bind(patient_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
            DatabaseBackend::Postgres(pool) => sqlx::query_as::<_, PatientRow>(
                "SELECT * FROM patients WHERE id = $1 AND user_id = $2",
            )
            .bind(patient_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
        };
        Ok(row.map(PatientRow::into_patient))
    }

    /// All of one practitioner's patients, most-recent-first.
    pub async fn list_patients(&self, user_id: i64) -> Result<Vec<Patient>, AppError> {
        let rows = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query_as::<_, PatientRow>(
                "SELECT * FROM patients WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?,
            DatabaseBackend::Postgres(pool) => sqlx::query_as::<_, PatientRow>(
                "SELECT * FROM patients WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?,
        };
        Ok(rows.into_iter().map(PatientRow::into_patient).collect())
    }

    pub async fn search_patients(
        &self,
        user_id: i64,
        query: &str,
    ) -> Result<Vec<Patient>, AppError> {
        let pattern = format!("%{}%", query);
        let rows = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query_as::<_, PatientRow>(
                "SELECT * FROM patients WHERE user_id = ? AND name LIKE ?
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .bind(&pattern)
            .fetch_all(pool)
            .await?,
            DatabaseBackend::Postgres(pool) => sqlx::query_as::<_, PatientRow>(
                "SELECT * FROM patients WHERE user_id = $1 AND name ILIKE $2
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .bind(&pattern)
            .fetch_all(pool)
            .await?,
        };
        Ok(rows.into_iter().map(PatientRow::into_patient).collect())
    }

    // ===== Prescriptions =====

    #[instrument(skip(self, symptoms, health_conditions, diagnosis, medicines, notes))]
    pub async fn create_prescription(
        &self,
        user_id: i64,
        patient_id: i64,
        symptoms: &[String],
        health_conditions: &[String],
        diagnosis: &Diagnosis,
        medicines: &[MedicineEntry],
        notes: Option<&str>,
    ) -> Result<i64, AppError> {
        let now = now_epoch();
        let symptoms_json = to_json(&symptoms)?;
        let conditions_json = to_json(&health_conditions)?;
        let secondary_json = to_json(&diagnosis.secondary_conditions)?;
        let medicines_json = to_json(&medicines)?;

        let id = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query(
                "INSERT INTO prescriptions (
                    user_id, patient_id, symptoms, health_conditions,
                    diagnosis_primary, diagnosis_secondary, diagnosis_ayurvedic,
                    medicines, notes, created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(patient_id)
            .bind(&symptoms_json)
            .bind(&conditions_json)
            .bind(&diagnosis.primary_condition)
            .bind(&secondary_json)
            .bind(&diagnosis.ayurvedic_analysis)
            .bind(&medicines_json)
            .bind(notes)
            .bind(now)
            .execute(pool)
            .await?
            .last_insert_rowid(),
            DatabaseBackend::Postgres(pool) => sqlx::query(
                "INSERT INTO prescriptions (
                    user_id, patient_id, symptoms, health_conditions,
                    diagnosis_primary, diagnosis_secondary, diagnosis_ayurvedic,
                    medicines, notes, created_at
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
            )
            .bind(user_id)
            .bind(patient_id)
            .bind(&symptoms_json)
            .bind(&conditions_json)
            .bind(&diagnosis.primary_condition)
            .bind(&secondary_json)
            .bind(&diagnosis.ayurvedic_analysis)
            .bind(&medicines_json)
            .bind(notes)
            .bind(now)
            .fetch_one(pool)
            .await?
            .try_get("id")?,
        };
        Ok(id)
    }

    pub async fn get_prescription(
        &self,
        prescription_id: i64,
        user_id: i64,
    ) -> Result<Option<PrescriptionRecord>, AppError> {
        let row = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE id = ? AND user_id = ?",
            )
            .bind(prescription_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
            DatabaseBackend::Postgres(pool) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE id = $1 AND user_id = $2",
            )
            .bind(prescription_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
        };
        row.map(PrescriptionRow::into_record).transpose()
    }

    /// Every prescription visible to the query, most-recent-first: the
    /// candidate feed for the similarity scorer. `user_id = None` searches
    /// system-wide.
    #[instrument(skip(self))]
    pub async fn list_prescriptions(
        &self,
        user_id: Option<i64>,
    ) -> Result<Vec<PrescriptionRecord>, AppError> {
        let rows = match (&self.backend, user_id) {
            (DatabaseBackend::Sqlite(pool), Some(uid)) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE user_id = ?
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(uid)
            .fetch_all(pool)
            .await?,
            (DatabaseBackend::Sqlite(pool), None) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(pool)
            .await?,
            (DatabaseBackend::Postgres(pool), Some(uid)) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(uid)
            .fetch_all(pool)
            .await?,
            (DatabaseBackend::Postgres(pool), None) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(pool)
            .await?,
        };
        rows.into_iter().map(PrescriptionRow::into_record).collect()
    }

    /// A practitioner's latest prescriptions, capped for the history screen.
    pub async fn list_recent_prescriptions(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<PrescriptionRecord>, AppError> {
        let rows = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE user_id = ?
                 ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await?,
            DatabaseBackend::Postgres(pool) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC LIMIT $2",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await?,
        };
        rows.into_iter().map(PrescriptionRow::into_record).collect()
    }

    pub async fn list_patient_prescriptions(
        &self,
        patient_id: i64,
        user_id: i64,
    ) -> Result<Vec<PrescriptionRecord>, AppError> {
        let rows = match &self.backend {
            DatabaseBackend::Sqlite(pool) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE patient_id = ? AND user_id = ?
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(patient_id)
            .bind(user_id)
            .fetch_all(pool)
            .await?,
            DatabaseBackend::Postgres(pool) => sqlx::query_as::<_, PrescriptionRow>(
                "SELECT * FROM prescriptions WHERE patient_id = $1 AND user_id = $2
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(patient_id)
            .bind(user_id)
            .fetch_all(pool)
            .await?,
        };
        rows.into_iter().map(PrescriptionRow::into_record).collect()
    }
}
