pub mod author;
pub mod book;
pub mod error;
pub mod favorite;
pub mod user;

use std::{fmt::Display, str::FromStr as _};

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

/// SQLite treats negative LIMIT as no limit
pub const NO_LIMIT: i64 = -1;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Brings database schema up to date, safe to call on every start
pub async fn migrate(pool: &Pool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{}", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub offset: i64,
    pub limit: i64,
    pub order: Option<Vec<Order>>,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: NO_LIMIT,
            order: None,
        }
    }
}

impl ListingParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset,
            limit,
            order: None,
        }
    }
    pub fn with_order(mut self, order: Vec<Order>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn ordering(&self, valid_fields: &[&str]) -> Result<String> {
        let ordering = self
            .order
            .as_ref()
            .map(|o| {
                o.iter()
                    .map(|o| {
                        if valid_fields.contains(&o.as_ref()) {
                            Ok(o.to_string())
                        } else {
                            Err(Error::InvalidOrderByField(o.as_ref().to_string()))
                        }
                    })
                    .collect::<Result<Vec<String>>>()
                    .map(|o| o.join(", "))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(ordering)
    }

    /// ORDER BY clause with fields qualified by table `alias`,
    /// falls back to `default` when no ordering requested
    pub(crate) fn order_clause(
        &self,
        valid_fields: &[&str],
        alias: &str,
        default: &str,
    ) -> Result<String> {
        self.ordering(valid_fields)?;
        let ordering = match self.order.as_deref() {
            Some(order) if !order.is_empty() => order
                .iter()
                .map(|o| format!("{alias}.{o}"))
                .collect::<Vec<_>>()
                .join(", "),
            _ => format!("{alias}.{default}"),
        };
        Ok(format!("ORDER BY {ordering}"))
    }
}

/// Pattern for case insensitive substring match with `LIKE ? ESCAPE '\'`
pub(crate) fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let params = ListingParams::default().with_order(vec![
            Order::Asc("title".into()),
            Order::Desc("average_rating".into()),
        ]);
        let ordering = params.ordering(&["title", "average_rating"]).unwrap();
        assert_eq!(ordering, "title, average_rating DESC");

        let res = params.ordering(&["title"]);
        assert!(matches!(res, Err(Error::InvalidOrderByField(f)) if f == "average_rating"));

        let clause = ListingParams::default()
            .order_clause(&["title"], "b", "id")
            .unwrap();
        assert_eq!(clause, "ORDER BY b.id");

        let clause = params
            .order_clause(&["title", "average_rating"], "b", "id")
            .unwrap();
        assert_eq!(clause, "ORDER BY b.title, b.average_rating DESC");
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("War"), "%War%");
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }
}
