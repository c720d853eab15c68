use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{catalog::Catalog, models::Cart};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub carts: Arc<RwLock<HashMap<Uuid, Cart>>>,
    pub jwt_secret: Arc<str>,
    next_line_id: Arc<AtomicI64>,
}

impl AppState {
    pub fn new(catalog: Catalog, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            catalog,
            carts: Arc::new(RwLock::new(HashMap::new())),
            jwt_secret: jwt_secret.into(),
            next_line_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn next_line_id(&self) -> i64 {
        self.next_line_id.fetch_add(1, Ordering::Relaxed)
    }
}
