use sqlx::Pool;
use tracing::debug;

use crate::{
    book::{Book, SELECT_BOOK},
    error::Result,
    Error,
};

pub type FavoriteRepository = FavoriteRepositoryImpl<Pool<crate::ChosenDB>>;

/// User to book favorites relation
pub struct FavoriteRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> FavoriteRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Adding already present favorite is no-op
    pub async fn add(&self, user_id: i64, book_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO user_favorite (user_id, book_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.executor)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    Error::RecordNotFound("Book".to_string())
                }
                other => Error::DatabaseError(other),
            })?;
        debug!(user_id, book_id, "Favorite added");
        Ok(())
    }

    /// Returns false if book was not in favorites
    pub async fn remove(&self, user_id: i64, book_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM user_favorite WHERE user_id = ? AND book_id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn list_books(&self, user_id: i64) -> Result<Vec<Book>> {
        let sql = format!(
            "{SELECT_BOOK} JOIN user_favorite uf ON uf.book_id = b.id WHERE uf.user_id = ? ORDER BY b.id"
        );
        let books = sqlx::query_as::<_, Book>(&sql)
            .bind(user_id)
            .fetch_all(&self.executor)
            .await?;
        Ok(books)
    }
}
