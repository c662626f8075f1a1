use crate::error::Result;
use crate::middleware::Authenticated;
use crate::security::{require, Decision, Requirement};
use actix_web::{web, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CallerResponse {
    pub user_id: i32,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct CartAccessResponse {
    pub user_id: i32,
    /// `"self"` for the owner, `"admin"` for a privileged caller
    pub access: &'static str,
}

fn access_label(decision: Decision) -> &'static str {
    match decision {
        Decision::AllowSelf => "self",
        _ => "admin",
    }
}

/// GET /api/v1/auth/me/
pub async fn me(caller: Authenticated) -> Result<HttpResponse> {
    require(&caller, Requirement::AnyAuthenticated)?;
    Ok(HttpResponse::Ok().json(CallerResponse {
        user_id: caller.subject_id(),
        email: caller.contact().to_string(),
        is_admin: caller.privileged(),
    }))
}

/// GET /api/v1/cart/{user_id}/
pub async fn retrieve(caller: Authenticated, path: web::Path<i32>) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let decision = require(&caller, Requirement::SelfOrAdmin(user_id))?;
    Ok(HttpResponse::Ok().json(CartAccessResponse {
        user_id,
        access: access_label(decision),
    }))
}

/// DELETE /api/v1/cart/{user_id}/
pub async fn clear(caller: Authenticated, path: web::Path<i32>) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let decision = require(&caller, Requirement::SelfOrAdmin(user_id))?;
    tracing::info!(
        caller = caller.subject_id(),
        user_id,
        access = access_label(decision),
        "cart cleared"
    );
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/admin/carts/
pub async fn list_all(caller: Authenticated) -> Result<HttpResponse> {
    require(&caller, Requirement::AdminOnly)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "access": "admin" })))
}
