//! Users REST service.
//!
//! # Routes
//! ```text
//! GET    /users       → 200 {"users": [...]}
//! GET    /users/:id   → 200 user | 404
//! POST   /users       → 201 user | 400 (name and email required)
//! PUT    /users/:id   → 200 user | 400 | 404
//! PATCH  /users/:id   → 200 user | 400 (no fields) | 404
//! DELETE /users/:id   → 200 {"message", "user"} | 404
//! ```
//! Repository failures answer 500 `{"error": "Internal Server Error"}`.

pub mod handlers;
pub mod repository;

use std::sync::Arc;

use crate::http::App;

pub use repository::{
    MemoryUserRepository, RepositoryError, RepositoryResult, User, UserPatch, UserRepository,
};

/// Mount the users routes on `app`.
pub fn register(app: &mut App, repo: Arc<dyn UserRepository>) {
    let r = Arc::clone(&repo);
    app.get("/users", move |req, res| handlers::list_users(Arc::clone(&r), req, res));

    let r = Arc::clone(&repo);
    app.get("/users/:id", move |req, res| handlers::get_user(Arc::clone(&r), req, res));

    let r = Arc::clone(&repo);
    app.post("/users", move |req, res| handlers::create_user(Arc::clone(&r), req, res));

    let r = Arc::clone(&repo);
    app.put("/users/:id", move |req, res| handlers::replace_user(Arc::clone(&r), req, res));

    let r = Arc::clone(&repo);
    app.patch("/users/:id", move |req, res| handlers::patch_user(Arc::clone(&r), req, res));

    app.delete("/users/:id", move |req, res| handlers::delete_user(Arc::clone(&repo), req, res));
}
