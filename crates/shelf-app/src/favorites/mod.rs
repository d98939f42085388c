//! Favorite books of a user and genre based recommendations
//!
//! [`FavoritesEngine`] keeps the favorites set of a user bounded by
//! [`FavoritesPolicy::max_favorites`]. When a book is added it suggests up to
//! [`FavoritesPolicy::max_recommendations`] other books sharing a genre picked
//! at random from the user's favorites.
use std::collections::BTreeSet;

use rand::seq::IteratorRandom as _;
use serde::{Deserialize, Serialize};
use shelf_dal::book::Book;
use tracing::debug;

pub mod api;
pub mod store;

pub use store::{FavoritesStore, SqlFavoritesStore};

pub const DEFAULT_MAX_FAVORITES: usize = 20;
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesPolicy {
    pub max_favorites: usize,
    pub max_recommendations: usize,
}

impl Default for FavoritesPolicy {
    fn default() -> Self {
        FavoritesPolicy {
            max_favorites: DEFAULT_MAX_FAVORITES,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    #[error("Favorites limit of {limit} reached")]
    CapacityExceeded { limit: usize },

    #[error("Record not found: Book {0}")]
    BookNotFound(i64),

    #[error("Favorites store error: {0}")]
    Store(#[from] shelf_dal::Error),
}

pub type Result<T, E = FavoritesError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum ToggleOutcome {
    Removed,
    Added { recommendations: Vec<Book> },
}

pub struct FavoritesEngine<S> {
    store: S,
    policy: FavoritesPolicy,
}

impl<S: FavoritesStore> FavoritesEngine<S> {
    pub fn new(store: S, policy: FavoritesPolicy) -> Self {
        FavoritesEngine { store, policy }
    }

    pub fn policy(&self) -> &FavoritesPolicy {
        &self.policy
    }

    /// Removes book from favorites if present, otherwise adds it and returns recommendations.
    ///
    /// Check and update are not atomic, concurrent toggles for the same user can overshoot the limit.
    pub async fn toggle(&self, user_id: i64, book: &Book) -> Result<ToggleOutcome> {
        let favorites = self.store.favorites(user_id).await?;
        if favorites.iter().any(|b| b.id == book.id) {
            self.store.remove_favorite(user_id, book.id).await?;
            debug!(user_id, book_id = book.id, "Removed from favorites");
            return Ok(ToggleOutcome::Removed);
        }

        if favorites.len() >= self.policy.max_favorites {
            debug!(user_id, book_id = book.id, "Favorites limit reached");
            return Err(FavoritesError::CapacityExceeded {
                limit: self.policy.max_favorites,
            });
        }

        self.store.add_favorite(user_id, book.id).await?;
        debug!(user_id, book_id = book.id, "Added to favorites");
        let recommendations = self.recommend(user_id).await?;
        Ok(ToggleOutcome::Added { recommendations })
    }

    pub async fn toggle_by_id(&self, user_id: i64, book_id: i64) -> Result<ToggleOutcome> {
        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or(FavoritesError::BookNotFound(book_id))?;
        self.toggle(user_id, &book).await
    }

    pub async fn favorites(&self, user_id: i64) -> Result<Vec<Book>> {
        Ok(self.store.favorites(user_id).await?)
    }

    /// Random sample of books sharing one random genre with favorites, excluding favorites.
    /// With no genres in favorites all books are candidates.
    pub async fn recommend(&self, user_id: i64) -> Result<Vec<Book>> {
        let favorites = self.store.favorites(user_id).await?;
        let genre = pick_genre(&favorites);
        debug!(user_id, genre = ?genre, "Recommending");
        let books = self
            .store
            .sample_books(user_id, genre.as_deref(), self.policy.max_recommendations)
            .await?;
        Ok(books)
    }
}

fn pick_genre(favorites: &[Book]) -> Option<String> {
    let genres: BTreeSet<&str> = favorites.iter().flat_map(|b| b.genre_tags()).collect();
    genres
        .into_iter()
        .choose(&mut rand::rng())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use rand::seq::IteratorRandom as _;
    use shelf_dal::{author::AuthorShort, book::genre_matches};
    use tracing_test::traced_test;

    use super::*;

    pub(crate) fn book(id: i64, genres: Option<&str>) -> Book {
        let now = time::PrimitiveDateTime::MIN;
        Book {
            id,
            title: format!("Book {id}"),
            author: AuthorShort {
                id: 1,
                name: "Author".to_string(),
                goodreads_id: "gr-1".to_string(),
            },
            book_id: format!("b-{id}"),
            work_id: format!("w-{id}"),
            publication_year: None,
            average_rating: None,
            ratings_count: 0,
            text_reviews_count: 0,
            isbn: None,
            genres: genres.map(str::to_string),
            language: None,
            description: None,
            favorite_by: vec![],
            created: now,
            modified: now,
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        books: Vec<Book>,
        favorites: Mutex<BTreeSet<(i64, i64)>>,
    }

    impl MemoryStore {
        fn with_books(books: Vec<Book>) -> Self {
            MemoryStore {
                books,
                ..Default::default()
            }
        }

        fn favorite_ids(&self, user_id: i64) -> Vec<i64> {
            self.favorites
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, b)| *b)
                .collect()
        }
    }

    impl FavoritesStore for MemoryStore {
        async fn find_book(&self, book_id: i64) -> shelf_dal::error::Result<Option<Book>> {
            Ok(self.books.iter().find(|b| b.id == book_id).cloned())
        }

        async fn favorites(&self, user_id: i64) -> shelf_dal::error::Result<Vec<Book>> {
            let ids = self.favorite_ids(user_id);
            Ok(self
                .books
                .iter()
                .filter(|b| ids.contains(&b.id))
                .cloned()
                .collect())
        }

        async fn add_favorite(&self, user_id: i64, book_id: i64) -> shelf_dal::error::Result<()> {
            self.favorites.lock().unwrap().insert((user_id, book_id));
            Ok(())
        }

        async fn remove_favorite(
            &self,
            user_id: i64,
            book_id: i64,
        ) -> shelf_dal::error::Result<()> {
            self.favorites.lock().unwrap().remove(&(user_id, book_id));
            Ok(())
        }

        async fn sample_books(
            &self,
            user_id: i64,
            genre: Option<&str>,
            limit: usize,
        ) -> shelf_dal::error::Result<Vec<Book>> {
            let favorites = self.favorite_ids(user_id);
            Ok(self
                .books
                .iter()
                .filter(|b| !favorites.contains(&b.id))
                .filter(|b| match (genre, &b.genres) {
                    (None, _) => true,
                    (Some(g), Some(genres)) => genre_matches(genres, g),
                    (Some(_), None) => false,
                })
                .cloned()
                .choose_multiple(&mut rand::rng(), limit))
        }
    }

    fn engine(books: Vec<Book>) -> FavoritesEngine<MemoryStore> {
        FavoritesEngine::new(MemoryStore::with_books(books), FavoritesPolicy::default())
    }

    fn library(count: i64, genres: &str) -> Vec<Book> {
        (1..=count).map(|id| book(id, Some(genres))).collect()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_first_favorite() {
        let engine = engine(library(10, "Fantasy"));
        let outcome = engine.toggle_by_id(1, 1).await.unwrap();
        match outcome {
            ToggleOutcome::Added { recommendations } => {
                assert_eq!(recommendations.len(), 5);
                assert!(recommendations.iter().all(|b| b.id != 1));
            }
            ToggleOutcome::Removed => panic!("Expected book to be added"),
        }
        assert_eq!(engine.store.favorite_ids(1), vec![1]);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores() {
        let engine = engine(library(3, "Fantasy"));
        engine.toggle_by_id(1, 2).await.unwrap();
        engine.toggle_by_id(1, 3).await.unwrap();
        let before = engine.store.favorite_ids(1);

        let added = engine.toggle_by_id(1, 1).await.unwrap();
        assert!(matches!(added, ToggleOutcome::Added { .. }));
        let removed = engine.toggle_by_id(1, 1).await.unwrap();
        assert!(matches!(removed, ToggleOutcome::Removed));
        assert_eq!(engine.store.favorite_ids(1), before);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_capacity_exceeded() {
        let engine = engine(library(25, "Fantasy"));
        for id in 1..=20 {
            engine.toggle_by_id(7, id).await.unwrap();
        }
        assert_eq!(engine.store.favorite_ids(7).len(), 20);

        let res = engine.toggle_by_id(7, 21).await;
        assert!(matches!(
            res,
            Err(FavoritesError::CapacityExceeded { limit: 20 })
        ));
        assert_eq!(engine.store.favorite_ids(7).len(), 20);
        assert!(logs_contain("Favorites limit reached"));

        // removal still works at capacity
        let res = engine.toggle_by_id(7, 20).await.unwrap();
        assert!(matches!(res, ToggleOutcome::Removed));
        assert_eq!(engine.store.favorite_ids(7).len(), 19);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let engine = FavoritesEngine::new(
            MemoryStore::with_books(library(12, "Horror")),
            FavoritesPolicy {
                max_favorites: 4,
                max_recommendations: 2,
            },
        );
        for round in 0..3 {
            for id in 1..=12 {
                let _ = engine.toggle_by_id(1, (id * 5 + round) % 12 + 1).await;
                assert!(engine.store.favorite_ids(1).len() <= 4);
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_book() {
        let engine = engine(library(2, "Fantasy"));
        let res = engine.toggle_by_id(1, 99).await;
        assert!(matches!(res, Err(FavoritesError::BookNotFound(99))));
        assert!(engine.store.favorite_ids(1).is_empty());
    }

    #[tokio::test]
    async fn test_recommendations_exclude_favorites() {
        let engine = engine(library(8, "Fantasy,Horror"));
        for id in 1..=5 {
            engine.toggle_by_id(1, id).await.unwrap();
        }
        for _ in 0..10 {
            let recommendations = engine.recommend(1).await.unwrap();
            let ids: BTreeSet<i64> = recommendations.iter().map(|b| b.id).collect();
            assert_eq!(ids, BTreeSet::from([6, 7, 8]));
        }
    }

    #[tokio::test]
    async fn test_no_candidates_left() {
        let engine = engine(library(2, "Fantasy"));
        engine.toggle_by_id(1, 1).await.unwrap();
        let outcome = engine.toggle_by_id(1, 2).await.unwrap();
        match outcome {
            ToggleOutcome::Added { recommendations } => assert!(recommendations.is_empty()),
            ToggleOutcome::Removed => panic!("Expected book to be added"),
        }
    }

    #[tokio::test]
    async fn test_recommendations_follow_genre() {
        let mut books = vec![book(1, Some("War"))];
        books.extend((2..=4).map(|id| book(id, Some("Warfare,History"))));
        books.extend((5..=9).map(|id| book(id, Some("Romance"))));
        books.push(book(10, None));
        let engine = engine(books);

        let outcome = engine.toggle_by_id(1, 1).await.unwrap();
        let ToggleOutcome::Added { recommendations } = outcome else {
            panic!("Expected book to be added")
        };
        let ids: BTreeSet<i64> = recommendations.iter().map(|b| b.id).collect();
        assert_eq!(ids, BTreeSet::from([2, 3, 4]));
    }

    #[tokio::test]
    async fn test_no_genres_recommends_any() {
        let mut books: Vec<Book> = (1..=3).map(|id| book(id, None)).collect();
        books.push(book(4, Some("")));
        books.extend((5..=9).map(|id| book(id, Some("Poetry"))));
        let engine = engine(books);
        engine.toggle_by_id(1, 1).await.unwrap();
        engine.toggle_by_id(1, 4).await.unwrap();

        let recommendations = engine.recommend(1).await.unwrap();
        assert_eq!(recommendations.len(), 5);
        assert!(recommendations.iter().all(|b| b.id != 1 && b.id != 4));
    }

    #[test]
    fn test_pick_genre_untrimmed() {
        let favorites = vec![book(1, Some("Fantasy, Horror")), book(2, None)];
        for _ in 0..20 {
            let genre = pick_genre(&favorites).unwrap();
            assert!(genre == "Fantasy" || genre == " Horror");
        }
        assert_eq!(pick_genre(&[book(3, None)]), None);
    }

    #[tokio::test]
    async fn test_recommendations_ignore_case() {
        let mut books = vec![book(1, Some("НАУЧНАЯ ФАНТАСТИКА"))];
        books.extend((2..=3).map(|id| book(id, Some("научная фантастика,Классика"))));
        books.push(book(4, Some("Романтика")));
        let engine = engine(books);

        engine.toggle_by_id(1, 1).await.unwrap();
        let recommendations = engine.recommend(1).await.unwrap();
        let ids: BTreeSet<i64> = recommendations.iter().map(|b| b.id).collect();
        assert_eq!(ids, BTreeSet::from([2, 3]));
    }
}
