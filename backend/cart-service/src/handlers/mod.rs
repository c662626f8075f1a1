/// HTTP handlers for cart-service
///
/// Cart storage lives behind these routes in the deployment; the handlers
/// here resolve who the caller is and what they may touch.
pub mod cart;

use crate::error::ApiError;
use actix_web::{web, HttpResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .route("/api/v1/auth/me/", web::get().to(cart::me))
    .route("/api/v1/cart/{user_id}/", web::get().to(cart::retrieve))
    .route("/api/v1/cart/{user_id}/", web::delete().to(cart::clear))
    .route("/api/v1/admin/carts/", web::get().to(cart::list_all));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "cart-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
