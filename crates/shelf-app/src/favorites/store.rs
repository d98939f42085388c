#![allow(async_fn_in_trait)]

use shelf_dal::{
    Pool,
    book::{Book, BookRepository},
    error::Result,
    favorite::FavoriteRepository,
};

use crate::repository_from_request;

/// Persistence needed by [`super::FavoritesEngine`]
pub trait FavoritesStore {
    async fn find_book(&self, book_id: i64) -> Result<Option<Book>>;
    async fn favorites(&self, user_id: i64) -> Result<Vec<Book>>;
    /// Adding present favorite is no-op
    async fn add_favorite(&self, user_id: i64, book_id: i64) -> Result<()>;
    async fn remove_favorite(&self, user_id: i64, book_id: i64) -> Result<()>;
    /// Random sample of up to `limit` books outside of user's favorites,
    /// restricted to books whose genres contain `genre` case insensitive
    async fn sample_books(
        &self,
        user_id: i64,
        genre: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Book>>;
}

pub struct SqlFavoritesStore {
    books: BookRepository,
    favorites: FavoriteRepository,
}

impl SqlFavoritesStore {
    pub fn new(pool: Pool) -> Self {
        SqlFavoritesStore {
            books: BookRepository::new(pool.clone()),
            favorites: FavoriteRepository::new(pool),
        }
    }
}

repository_from_request!(SqlFavoritesStore);

impl FavoritesStore for SqlFavoritesStore {
    async fn find_book(&self, book_id: i64) -> Result<Option<Book>> {
        match self.books.get(book_id).await {
            Ok(book) => Ok(Some(book)),
            Err(shelf_dal::Error::RecordNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn favorites(&self, user_id: i64) -> Result<Vec<Book>> {
        self.favorites.list_books(user_id).await
    }

    async fn add_favorite(&self, user_id: i64, book_id: i64) -> Result<()> {
        self.favorites.add(user_id, book_id).await
    }

    async fn remove_favorite(&self, user_id: i64, book_id: i64) -> Result<()> {
        self.favorites.remove(user_id, book_id).await.map(|_| ())
    }

    async fn sample_books(
        &self,
        user_id: i64,
        genre: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Book>> {
        self.books.sample_for_user(user_id, genre, limit).await
    }
}
