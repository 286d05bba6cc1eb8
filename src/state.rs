use std::sync::Arc;

use crate::db::{DbPool, OrmConn, orm_from_pool};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(pool: DbPool, jwt_secret: &str) -> Self {
        let orm = orm_from_pool(pool.clone());
        Self {
            pool,
            orm,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
