use anyhow::{Result, anyhow};
use reqwest::{StatusCode, Url};
use serde_json::json;
use shelf_dal::{author::Author, book::Book};
use tracing::info;

pub async fn create_author(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    goodreads_id: &str,
) -> Result<Author> {
    let payload = json!({"name": name, "goodreads_id": goodreads_id});
    let api_url = base_url.join("authors")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Author Response: {:#?}", response);
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!("Author not created: {}", response.status()));
    }

    let mut body: serde_json::Value = response.json().await?;
    let author = serde_json::from_value(body["author"].take())?;
    Ok(author)
}

pub async fn create_book(
    client: &reqwest::Client,
    base_url: &Url,
    author_id: i64,
    title: &str,
    genres: Option<&str>,
) -> Result<Book> {
    let book_id = title.to_lowercase().replace(' ', "-");
    let payload = json!({
        "title": title,
        "author_id": author_id,
        "book_id": book_id,
        "work_id": format!("w-{book_id}"),
        "genres": genres,
        "language": "eng",
    });
    let api_url = base_url.join("books")?;

    let response = client.post(api_url).json(&payload).send().await?;
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!("Book not created: {}", response.status()));
    }

    let mut body: serde_json::Value = response.json().await?;
    let book = serde_json::from_value(body["book"].take())?;
    Ok(book)
}
