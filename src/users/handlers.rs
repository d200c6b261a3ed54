//! Route handlers for the `/users` resource.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::http::{Request, Response, Sent};
use crate::users::repository::{RepositoryError, UserPatch, UserRepository};

type Repo = Arc<dyn UserRepository>;

/// Non-empty string field from a JSON body.
fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The `:id` parameter as a user id. Unparseable ids are treated as unknown.
fn user_id(req: &Request) -> Option<u64> {
    req.param("id").and_then(|id| id.parse().ok())
}

fn not_found(res: Response) -> Sent {
    res.set_status(StatusCode::NOT_FOUND)
        .send_json(json!({ "error": "User not found" }))
}

fn bad_request(res: Response, message: &str) -> Sent {
    res.set_status(StatusCode::BAD_REQUEST)
        .send_json(json!({ "error": message }))
}

fn internal_error(res: Response, req: &Request, error: &RepositoryError, context: &str) -> Sent {
    tracing::error!(
        request_id = req.request_id().unwrap_or("unknown"),
        error = %error,
        "{context}"
    );
    res.set_status(StatusCode::INTERNAL_SERVER_ERROR)
        .send_json(json!({ "error": "Internal Server Error" }))
}

/// GET /users
pub async fn list_users(repo: Repo, req: Request, res: Response) -> Sent {
    match repo.list().await {
        Ok(users) => res.send_json(json!({ "users": users })),
        Err(e) => internal_error(res, &req, &e, "Error fetching users"),
    }
}

/// GET /users/:id
pub async fn get_user(repo: Repo, req: Request, res: Response) -> Sent {
    let Some(id) = user_id(&req) else {
        return not_found(res);
    };

    match repo.get(id).await {
        Ok(Some(user)) => res.send_json(user),
        Ok(None) => not_found(res),
        Err(e) => internal_error(res, &req, &e, "Error fetching user"),
    }
}

/// POST /users
pub async fn create_user(repo: Repo, req: Request, res: Response) -> Sent {
    let (Some(name), Some(email)) = (string_field(req.body(), "name"), string_field(req.body(), "email")) else {
        return bad_request(res, "Name and email are required");
    };

    match repo.create(name, email).await {
        Ok(user) => res.set_status(StatusCode::CREATED).send_json(user),
        Err(e) => internal_error(res, &req, &e, "Error creating user"),
    }
}

/// PUT /users/:id
pub async fn replace_user(repo: Repo, req: Request, res: Response) -> Sent {
    let (Some(name), Some(email)) = (string_field(req.body(), "name"), string_field(req.body(), "email")) else {
        return bad_request(res, "Name and email are required");
    };
    let Some(id) = user_id(&req) else {
        return not_found(res);
    };

    let patch = UserPatch {
        name: Some(name),
        email: Some(email),
    };
    match repo.update(id, patch).await {
        Ok(Some(user)) => res.send_json(user),
        Ok(None) => not_found(res),
        Err(e) => internal_error(res, &req, &e, "Error updating user"),
    }
}

/// PATCH /users/:id
pub async fn patch_user(repo: Repo, req: Request, res: Response) -> Sent {
    let patch = UserPatch {
        name: string_field(req.body(), "name"),
        email: string_field(req.body(), "email"),
    };
    if patch.is_empty() {
        return bad_request(res, "No fields to update");
    }
    let Some(id) = user_id(&req) else {
        return not_found(res);
    };

    match repo.update(id, patch).await {
        Ok(Some(user)) => res.send_json(user),
        Ok(None) => not_found(res),
        Err(e) => internal_error(res, &req, &e, "Error updating user"),
    }
}

/// DELETE /users/:id
pub async fn delete_user(repo: Repo, req: Request, res: Response) -> Sent {
    let Some(id) = user_id(&req) else {
        return not_found(res);
    };

    match repo.delete(id).await {
        Ok(Some(user)) => res.send_json(json!({
            "message": "User deleted successfully",
            "user": user,
        })),
        Ok(None) => not_found(res),
        Err(e) => internal_error(res, &req, &e, "Error deleting user"),
    }
}
