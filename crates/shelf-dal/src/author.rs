use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Pool, Row};
use tracing::debug;

use crate::{error::Result, ChosenRow, Error, ListingParams};

const VALID_ORDER_FIELDS: &[&str] = &[
    "id",
    "name",
    "fans_count",
    "works_count",
    "created",
    "modified",
];

/// Distinguishes absent field (outer `None`) from explicit null in patches
pub(crate) fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateAuthor {
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(length(min = 1, max = 10))]
    pub gender: Option<String>,
    #[garde(length(min = 1, max = 1023))]
    pub image_url: Option<String>,
    #[garde(length(max = 10000))]
    pub about: Option<String>,
    #[garde(range(min = 0))]
    pub fans_count: Option<i64>,
    #[garde(range(min = 0))]
    pub works_count: Option<i64>,
    #[garde(length(min = 1, max = 50))]
    pub goodreads_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateAuthor {
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(min = 1, max = 10)))]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(min = 1, max = 1023)))]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    #[garde(inner(length(max = 10000)))]
    pub about: Option<Option<String>>,
    #[garde(range(min = 0))]
    pub fans_count: Option<i64>,
    #[garde(range(min = 0))]
    pub works_count: Option<i64>,
    #[garde(length(min = 1, max = 50))]
    pub goodreads_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub gender: Option<String>,
    pub image_url: Option<String>,
    pub about: Option<String>,
    pub fans_count: i64,
    pub works_count: i64,
    pub goodreads_id: String,
    /// External ids (`book_id`) of author's books
    pub books: Vec<String>,
    pub created: time::PrimitiveDateTime,
    pub modified: time::PrimitiveDateTime,
}

impl sqlx::FromRow<'_, ChosenRow> for Author {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let books: String = row.try_get("books")?;
        let books = serde_json::from_str(&books).map_err(|e| sqlx::Error::ColumnDecode {
            index: "books".to_string(),
            source: Box::new(e),
        })?;
        Ok(Author {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            gender: row.try_get("gender")?,
            image_url: row.try_get("image_url")?,
            about: row.try_get("about")?,
            fans_count: row.try_get("fans_count")?,
            works_count: row.try_get("works_count")?,
            goodreads_id: row.try_get("goodreads_id")?,
            books,
            created: row.try_get("created")?,
            modified: row.try_get("modified")?,
        })
    }
}

/// Author as nested in other records
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuthorShort {
    pub id: i64,
    pub name: String,
    pub goodreads_id: String,
}

const SELECT_AUTHOR: &str = r#"
SELECT a.id, a.name, a.gender, a.image_url, a.about, a.fans_count, a.works_count,
a.goodreads_id, a.created, a.modified,
(SELECT json_group_array(b.book_id) FROM book b WHERE b.author_id = a.id) AS books
FROM author a
"#;

pub type AuthorRepository = AuthorRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct AuthorRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> AuthorRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateAuthor) -> Result<Author> {
        let result = sqlx::query(
            "INSERT INTO author (name, gender, image_url, about, fans_count, works_count, goodreads_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(&payload.gender)
        .bind(&payload.image_url)
        .bind(&payload.about)
        .bind(payload.fans_count.unwrap_or(0))
        .bind(payload.works_count.unwrap_or(0))
        .bind(&payload.goodreads_id)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::from_sqlx(e, "Author"))?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: UpdateAuthor) -> Result<Author> {
        let current = self.get(id).await?;
        let result = sqlx::query(
            "UPDATE author SET name = ?, gender = ?, image_url = ?, about = ?, fans_count = ?,
            works_count = ?, goodreads_id = ?, modified = datetime('now') WHERE id = ?",
        )
        .bind(payload.name.unwrap_or(current.name))
        .bind(payload.gender.unwrap_or(current.gender))
        .bind(payload.image_url.unwrap_or(current.image_url))
        .bind(payload.about.unwrap_or(current.about))
        .bind(payload.fans_count.unwrap_or(current.fans_count))
        .bind(payload.works_count.unwrap_or(current.works_count))
        .bind(payload.goodreads_id.unwrap_or(current.goodreads_id))
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::from_sqlx(e, "Author"))?;

        if result.rows_affected() == 0 {
            debug!(author_id = id, "Author disappeared during update");
            Err(Error::RecordNotFound("Author".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn list(&self, params: ListingParams) -> Result<Vec<Author>> {
        let order = params.order_clause(VALID_ORDER_FIELDS, "a", "id")?;
        let sql = format!("{SELECT_AUTHOR} {order} LIMIT ? OFFSET ?");
        let records = sqlx::query_as::<_, Author>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.executor)
            .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM author")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Author".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Author> {
        let sql = format!("{SELECT_AUTHOR} WHERE a.id = ?");
        sqlx::query_as::<_, Author>(&sql)
            .bind(id)
            .fetch_one(&self.executor)
            .await
            .map_err(|e| Error::from_sqlx(e, "Author"))
    }
}
