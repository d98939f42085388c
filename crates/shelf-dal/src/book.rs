use garde::Validate;
use rand::seq::{IteratorRandom as _, SliceRandom as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{Pool, Row};
use tracing::debug;

use crate::{
    author::{patch_field, AuthorShort},
    error::Result,
    like_pattern, ChosenRow, Error, ListingParams,
};

const VALID_ORDER_FIELDS: &[&str] = &[
    "id",
    "title",
    "publication_year",
    "average_rating",
    "ratings_count",
    "created",
    "modified",
];

/// Genre tags of stored comma separated list, no trimming or case folding.
/// Empty or missing value has no tags.
pub fn genre_tags(genres: Option<&str>) -> Vec<&str> {
    match genres {
        Some(genres) if !genres.is_empty() => genres.split(',').collect(),
        _ => Vec::new(),
    }
}

/// Case insensitive substring match of `genre` in stored genres
pub fn genre_matches(genres: &str, genre: &str) -> bool {
    genres.to_lowercase().contains(&genre.to_lowercase())
}

fn sample_matching(candidates: Vec<(i64, String)>, genre: &str, limit: usize) -> Vec<i64> {
    let mut rng = rand::rng();
    let mut ids = candidates
        .into_iter()
        .filter(|(_, genres)| genre_matches(genres, genre))
        .map(|(id, _)| id)
        .choose_multiple(&mut rng, limit);
    ids.shuffle(&mut rng);
    ids
}

fn serialize_genres<S: Serializer>(genres: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(genre_tags(genres.as_deref()))
}

fn deserialize_genres<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let tags = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(tags.filter(|t| !t.is_empty()).map(|t| t.join(",")))
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateBook {
    #[garde(length(min = 1, max = 500))]
    pub title: String,
    #[garde(range(min = 1))]
    pub author_id: i64,
    #[garde(length(min = 1, max = 50))]
    pub book_id: String,
    #[garde(length(min = 1, max = 50))]
    pub work_id: String,
    #[garde(skip)]
    pub publication_year: Option<i64>,
    #[garde(range(min = 0.0, max = 5.0))]
    pub average_rating: Option<f64>,
    #[garde(range(min = 0))]
    pub ratings_count: Option<i64>,
    #[garde(range(min = 0))]
    pub text_reviews_count: Option<i64>,
    #[garde(length(min = 1, max = 20))]
    pub isbn: Option<String>,
    #[garde(length(max = 5000))]
    pub genres: Option<String>,
    #[garde(length(min = 1, max = 10))]
    pub language: Option<String>,
    #[garde(length(max = 50000))]
    pub description: Option<String>,
}

/// Partial update, absent fields are kept, explicit null clears nullable fields
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateBook {
    #[garde(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[garde(range(min = 1))]
    pub author_id: Option<i64>,
    #[garde(length(min = 1, max = 50))]
    pub book_id: Option<String>,
    #[garde(length(min = 1, max = 50))]
    pub work_id: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(skip)]
    pub publication_year: Option<Option<i64>>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(range(min = 0.0, max = 5.0)))]
    pub average_rating: Option<Option<f64>>,
    #[garde(range(min = 0))]
    pub ratings_count: Option<i64>,
    #[garde(range(min = 0))]
    pub text_reviews_count: Option<i64>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(min = 1, max = 20)))]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(max = 5000)))]
    pub genres: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(min = 1, max = 10)))]
    pub language: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(max = 50000)))]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: AuthorShort,
    pub book_id: String,
    pub work_id: String,
    pub publication_year: Option<i64>,
    pub average_rating: Option<f64>,
    pub ratings_count: i64,
    pub text_reviews_count: i64,
    pub isbn: Option<String>,
    #[serde(
        serialize_with = "serialize_genres",
        deserialize_with = "deserialize_genres",
        default
    )]
    pub genres: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    /// Ids of users having this book in favorites
    pub favorite_by: Vec<i64>,
    pub created: time::PrimitiveDateTime,
    pub modified: time::PrimitiveDateTime,
}

impl Book {
    pub fn genre_tags(&self) -> Vec<&str> {
        genre_tags(self.genres.as_deref())
    }
}

impl sqlx::FromRow<'_, ChosenRow> for Book {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let author = AuthorShort {
            id: row.try_get("author_id")?,
            name: row.try_get("author_name")?,
            goodreads_id: row.try_get("author_goodreads_id")?,
        };
        let favorite_by: String = row.try_get("favorite_by")?;
        let favorite_by =
            serde_json::from_str(&favorite_by).map_err(|e| sqlx::Error::ColumnDecode {
                index: "favorite_by".to_string(),
                source: Box::new(e),
            })?;
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author,
            book_id: row.try_get("book_id")?,
            work_id: row.try_get("work_id")?,
            publication_year: row.try_get("publication_year")?,
            average_rating: row.try_get("average_rating")?,
            ratings_count: row.try_get("ratings_count")?,
            text_reviews_count: row.try_get("text_reviews_count")?,
            isbn: row.try_get("isbn")?,
            genres: row.try_get("genres")?,
            language: row.try_get("language")?,
            description: row.try_get("description")?,
            favorite_by,
            created: row.try_get("created")?,
            modified: row.try_get("modified")?,
        })
    }
}

/// Unknown author is reported as missing record, not as database failure
fn book_error(error: sqlx::Error) -> Error {
    match error {
        sqlx::Error::Database(ref db_error) if db_error.is_foreign_key_violation() => {
            Error::RecordNotFound("Author".to_string())
        }
        other => Error::from_sqlx(other, "Book"),
    }
}

const FAVORITE_IDS: &str = "(SELECT book_id FROM user_favorite WHERE user_id = ?)";

pub(crate) const SELECT_BOOK: &str = r#"
SELECT b.id, b.title, b.book_id, b.work_id, b.publication_year, b.average_rating,
b.ratings_count, b.text_reviews_count, b.isbn, b.genres, b.language, b.description,
b.created, b.modified,
a.id AS author_id, a.name AS author_name, a.goodreads_id AS author_goodreads_id,
(SELECT json_group_array(f.user_id) FROM user_favorite f WHERE f.book_id = b.id) AS favorite_by
FROM book b
JOIN author a ON b.author_id = a.id
"#;

pub type BookRepository = BookRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateBook) -> Result<Book> {
        let result = sqlx::query(
            "INSERT INTO book (title, author_id, book_id, work_id, publication_year, average_rating,
            ratings_count, text_reviews_count, isbn, genres, language, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.title)
        .bind(payload.author_id)
        .bind(&payload.book_id)
        .bind(&payload.work_id)
        .bind(payload.publication_year)
        .bind(payload.average_rating)
        .bind(payload.ratings_count.unwrap_or(0))
        .bind(payload.text_reviews_count.unwrap_or(0))
        .bind(&payload.isbn)
        .bind(&payload.genres)
        .bind(&payload.language)
        .bind(&payload.description)
        .execute(&self.executor)
        .await
        .map_err(book_error)?;

        let id = result.last_insert_rowid();
        debug!(book_id = id, "Book created");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: UpdateBook) -> Result<Book> {
        let current = self.get(id).await?;
        let result = sqlx::query(
            "UPDATE book SET title = ?, author_id = ?, book_id = ?, work_id = ?, publication_year = ?,
            average_rating = ?, ratings_count = ?, text_reviews_count = ?, isbn = ?, genres = ?,
            language = ?, description = ?, modified = datetime('now') WHERE id = ?",
        )
        .bind(payload.title.unwrap_or(current.title))
        .bind(payload.author_id.unwrap_or(current.author.id))
        .bind(payload.book_id.unwrap_or(current.book_id))
        .bind(payload.work_id.unwrap_or(current.work_id))
        .bind(payload.publication_year.unwrap_or(current.publication_year))
        .bind(payload.average_rating.unwrap_or(current.average_rating))
        .bind(payload.ratings_count.unwrap_or(current.ratings_count))
        .bind(payload.text_reviews_count.unwrap_or(current.text_reviews_count))
        .bind(payload.isbn.unwrap_or(current.isbn))
        .bind(payload.genres.unwrap_or(current.genres))
        .bind(payload.language.unwrap_or(current.language))
        .bind(payload.description.unwrap_or(current.description))
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(book_error)?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Book".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Book".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        let sql = format!("{SELECT_BOOK} WHERE b.id = ?");
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_one(&self.executor)
            .await
            .map_err(|e| Error::from_sqlx(e, "Book"))
    }

    /// Lists books, optionally those with title or author name containing `search`
    pub async fn list(&self, params: ListingParams, search: Option<&str>) -> Result<Vec<Book>> {
        let order = params.order_clause(VALID_ORDER_FIELDS, "b", "id")?;
        let records = match search {
            Some(search) => {
                let sql = format!(
                    r#"{SELECT_BOOK} WHERE b.title LIKE ?1 ESCAPE '\' OR a.name LIKE ?1 ESCAPE '\'
                    {order} LIMIT ?2 OFFSET ?3"#
                );
                sqlx::query_as::<_, Book>(&sql)
                    .bind(like_pattern(search))
                    .bind(params.limit)
                    .bind(params.offset)
                    .fetch_all(&self.executor)
                    .await?
            }
            None => {
                let sql = format!("{SELECT_BOOK} {order} LIMIT ? OFFSET ?");
                sqlx::query_as::<_, Book>(&sql)
                    .bind(params.limit)
                    .bind(params.offset)
                    .fetch_all(&self.executor)
                    .await?
            }
        };
        Ok(records)
    }

    /// Random sample of up to `limit` books, which are not in favorites of `user_id`.
    /// With `genre` only books whose genres contain it (case insensitive) are considered.
    pub async fn sample_for_user(
        &self,
        user_id: i64,
        genre: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Book>> {
        let Some(genre) = genre else {
            let sql = format!("{SELECT_BOOK} WHERE b.id NOT IN {FAVORITE_IDS} ORDER BY random() LIMIT ?");
            let records = sqlx::query_as::<_, Book>(&sql)
                .bind(user_id)
                .bind(limit as i64)
                .fetch_all(&self.executor)
                .await?;
            return Ok(records);
        };

        // SQLite LIKE folds only ASCII, so genres are matched here
        let sql = format!("SELECT b.id, b.genres FROM book b WHERE b.genres IS NOT NULL AND b.id NOT IN {FAVORITE_IDS}");
        let candidates: Vec<(i64, String)> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.executor)
            .await?;
        let ids = sample_matching(candidates, genre, limit);
        debug!(user_id, genre, sampled = ids.len(), "Sampled books by genre");
        self.get_many(&ids).await
    }

    /// Books with given ids, in the same order
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!("{SELECT_BOOK} WHERE b.id IN (SELECT value FROM json_each(?))");
        let mut records = sqlx::query_as::<_, Book>(&sql)
            .bind(format!("[{id_list}]"))
            .fetch_all(&self.executor)
            .await?;
        records.sort_by_key(|b| ids.iter().position(|id| *id == b.id));
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM book")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }
}
