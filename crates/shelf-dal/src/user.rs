use argon2::{
    password_hash::{rand_core::OsRng, Result as HashResult, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use garde::Validate;
use serde::{Deserialize, Serialize};
use shelf_types::general::Username;
use sqlx::Pool;
use tracing::debug;

use crate::{error::Result, Error};

fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(dive)]
    pub username: Username,
    #[garde(length(min = 1, max = 255))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created: time::PrimitiveDateTime,
}

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let password = hash_password(&payload.password)?;
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(payload.username.as_ref())
            .bind(password)
            .execute(&self.executor)
            .await
            .map_err(|e| Error::from_sqlx(e, "Username"))?;

        let id = result.last_insert_rowid();
        debug!(user_id = id, "User created");
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT id, username, created FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.executor)
            .await
            .map_err(|e| Error::from_sqlx(e, "User"))
    }

    pub async fn check_password(&self, username: &str, password: &str) -> Result<User> {
        let (id, hashed_password): (i64, String) =
            sqlx::query_as("SELECT id, password FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(&self.executor)
                .await
                .map_err(|e| {
                    debug!("User check error: {e}");
                    Error::InvalidCredentials
                })?;
        if verify_password(password, &hashed_password).unwrap_or(false) {
            return self.get(id).await;
        }
        Err(Error::InvalidCredentials)
    }
}
