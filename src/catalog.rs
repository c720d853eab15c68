use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::models::{Book, ProductId};

/// Books the cart resource can sell, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Arc<RwLock<HashMap<ProductId, Book>>>,
}

impl Catalog {
    pub fn from_books(books: impl IntoIterator<Item = Book>) -> Self {
        let books = books.into_iter().map(|book| (book.id, book)).collect();
        Self {
            books: Arc::new(RwLock::new(books)),
        }
    }

    /// Small demo shelf used when the server starts without a catalog of its own.
    pub fn seeded() -> Self {
        Self::from_books([
            demo_book(1, "The Pragmatic Programmer", 3_999, 25),
            demo_book(2, "Clean Architecture", 2_750, 10),
            demo_book(3, "Designing Data-Intensive Applications", 4_500, 8),
            demo_book(42, "The Hitchhiker's Guide to the Galaxy", 1_250, 42),
            demo_book(7, "Programming Rust", 5_200, 3),
            Book {
                id: 99,
                title: "Out of Print Almanac".to_string(),
                price: 1_500,
                stock: 0,
                active: false,
            },
        ])
    }

    pub async fn get(&self, id: ProductId) -> Option<Book> {
        self.books.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }
}

fn demo_book(id: ProductId, title: &str, price: i64, stock: i32) -> Book {
    Book {
        id,
        title: title.to_string(),
        price,
        stock,
        active: true,
    }
}
