//! Rendering entities with collapsible relations

use std::future::Future;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Expand;
use crate::error::Result;
use crate::pagination::{Page, PageMeta};

/// An entity that can render itself against an expansion directive.
///
/// `C` is whatever the renderer needs to resolve links and load related
/// entities (stores, the id codec, the public base URL).
#[async_trait]
pub trait Expandable<C: ?Sized + Sync>: Send + Sync {
    async fn render(&self, ctx: &C, expand: &Expand) -> Result<Value>;
}

/// JSON object under construction.
///
/// Scalar fields always render. Relations render as a link unless the
/// directive names them:
///
/// | relation | collapsed | expanded | absent |
/// |---|---|---|---|
/// | to-one | target URL | nested object | `null` |
/// | to-many | collection URL | array of nested objects | n/a |
#[derive(Debug, Clone, Default)]
pub struct Representation {
    fields: Map<String, Value>,
}

impl Representation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always-present field
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// To-one relation.
    ///
    /// `link` is `None` when the relation is empty; `load` runs only when the
    /// relation is expanded.
    pub async fn to_one<C, R, F, Fut>(
        mut self,
        ctx: &C,
        expand: &Expand,
        name: &str,
        link: Option<String>,
        load: F,
    ) -> Result<Self>
    where
        C: ?Sized + Sync,
        R: Expandable<C>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<R>>> + Send,
    {
        let value = match link {
            None => Value::Null,
            Some(link) if !expand.contains(name) => Value::String(link),
            Some(_) => match load().await? {
                Some(related) => related.render(ctx, &expand.nested(name)).await?,
                None => Value::Null,
            },
        };
        self.fields.insert(name.to_string(), value);
        Ok(self)
    }

    /// To-many relation.
    ///
    /// Collapsed, this is the URL of the filtered collection endpoint and
    /// never a partial listing.
    pub async fn to_many<C, R, F, Fut>(
        mut self,
        ctx: &C,
        expand: &Expand,
        name: &str,
        collection_link: String,
        load: F,
    ) -> Result<Self>
    where
        C: ?Sized + Sync,
        R: Expandable<C>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<R>>> + Send,
    {
        let value = if expand.contains(name) {
            let related = load().await?;
            Value::Array(render_all(ctx, &related, &expand.nested(name)).await?)
        } else {
            Value::String(collection_link)
        };
        self.fields.insert(name.to_string(), value);
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Render a homogeneous collection with the same directive
pub async fn render_all<C, R>(ctx: &C, items: &[R], expand: &Expand) -> Result<Vec<Value>>
where
    C: ?Sized + Sync,
    R: Expandable<C>,
{
    futures::future::try_join_all(items.iter().map(|item| item.render(ctx, expand))).await
}

/// Collection response body: page metadata next to the rendered items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEnvelope {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub items: Vec<Value>,
}

impl IntoResponse for PageEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Render every item of `page` and wrap it with the page metadata
pub async fn render_page<C, R>(ctx: &C, page: &Page<R>, expand: &Expand) -> Result<PageEnvelope>
where
    C: ?Sized + Sync,
    R: Expandable<C>,
{
    Ok(PageEnvelope {
        meta: page.pager().meta(),
        items: render_all(ctx, page.items(), expand).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{CollectionUrl, PageRequest, Pager};
    use crate::query::QueryParams;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct Author {
        id: u64,
        name: &'static str,
    }

    #[derive(Clone)]
    struct Book {
        id: u64,
        title: &'static str,
        author_id: Option<u64>,
    }

    struct Library {
        authors: HashMap<u64, Author>,
        books: Vec<Book>,
    }

    #[async_trait]
    impl Expandable<Library> for Book {
        async fn render(&self, lib: &Library, expand: &Expand) -> Result<Value> {
            Ok(Representation::new()
                .field("id", self.id)
                .field("title", self.title)
                .to_one(
                    lib,
                    expand,
                    "author",
                    self.author_id.map(|id| format!("/authors/{id}")),
                    || async { Ok(self.author_id.and_then(|id| lib.authors.get(&id).cloned())) },
                )
                .await?
                .build())
        }
    }

    #[async_trait]
    impl Expandable<Library> for Author {
        async fn render(&self, lib: &Library, expand: &Expand) -> Result<Value> {
            Ok(Representation::new()
                .field("id", self.id)
                .field("name", self.name)
                .to_many(
                    lib,
                    expand,
                    "books",
                    format!("/books?author_id={}", self.id),
                    || async {
                        Ok(lib
                            .books
                            .iter()
                            .filter(|b| b.author_id == Some(self.id))
                            .cloned()
                            .collect::<Vec<_>>())
                    },
                )
                .await?
                .build())
        }
    }

    fn library() -> Library {
        let authors = HashMap::from([(1, Author { id: 1, name: "Ada" })]);
        let books = vec![
            Book { id: 10, title: "Notes", author_id: Some(1) },
            Book { id: 11, title: "Sketches", author_id: Some(1) },
            Book { id: 12, title: "Anonymous", author_id: None },
        ];
        Library { authors, books }
    }

    #[tokio::test]
    async fn test_collapsed_relations_are_links() {
        let lib = library();
        let book = lib.books[0].render(&lib, &Expand::none()).await.unwrap();
        assert_eq!(book, json!({"id": 10, "title": "Notes", "author": "/authors/1"}));

        let author = lib.authors[&1].render(&lib, &Expand::none()).await.unwrap();
        assert_eq!(author["books"], json!("/books?author_id=1"));
    }

    #[tokio::test]
    async fn test_expanded_to_one_inlines_target() {
        let lib = library();
        let book = lib.books[0]
            .render(&lib, &Expand::parse(["author"]))
            .await
            .unwrap();
        assert_eq!(
            book["author"],
            json!({"id": 1, "name": "Ada", "books": "/books?author_id=1"})
        );
    }

    #[tokio::test]
    async fn test_dotted_path_expands_two_levels() {
        let lib = library();
        let book = lib.books[0]
            .render(&lib, &Expand::parse(["author.books"]))
            .await
            .unwrap();
        let books = book["author"]["books"].as_array().unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[1]["author"], json!("/authors/1"));
    }

    #[tokio::test]
    async fn test_absent_to_one_is_null_even_when_expanded() {
        let lib = library();
        for expand in [Expand::none(), Expand::parse(["author"])] {
            let book = lib.books[2].render(&lib, &expand).await.unwrap();
            assert_eq!(book["author"], Value::Null);
        }
    }

    #[tokio::test]
    async fn test_unknown_names_are_ignored() {
        let lib = library();
        let plain = lib.books[0].render(&lib, &Expand::none()).await.unwrap();
        let noisy = lib.books[0]
            .render(&lib, &Expand::parse(["publisher", "title"]))
            .await
            .unwrap();
        assert_eq!(plain, noisy);
    }

    #[tokio::test]
    async fn test_render_page_envelope() {
        let lib = library();
        let url = CollectionUrl::new("http://localhost:8080", "/books", &QueryParams::default());
        let page = Pager::new(&PageRequest::new(1, 2), 3, url)
            .unwrap()
            .with_items(lib.books[..2].to_vec());

        let envelope = render_page(&lib, &page, &Expand::none()).await.unwrap();
        let body = serde_json::to_value(&envelope).unwrap();
        assert_eq!(body["page"], 1);
        assert_eq!(body["pages"], 2);
        assert_eq!(body["total"], 3);
        assert_eq!(body["prev"], Value::Null);
        assert_eq!(body["next"], "http://localhost:8080/books?page=2&per_page=2");
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        // page fields sit beside `items`, not under a nested object
        assert!(body.get("meta").is_none());
        assert_eq!(body["first"], "http://localhost:8080/books?page=1&per_page=2");
    }
}
