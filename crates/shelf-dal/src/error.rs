pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("User password error: {0}")]
    UserPasswordError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("{0} already exists")]
    DuplicateRecord(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),
}

impl Error {
    /// Maps sqlx errors to more specific variants where record identity matters
    pub(crate) fn from_sqlx(error: sqlx::Error, entity: &str) -> Self {
        match error {
            sqlx::Error::RowNotFound => Error::RecordNotFound(entity.to_string()),
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
                Error::DuplicateRecord(entity.to_string())
            }
            other => Error::DatabaseError(other),
        }
    }
}
