use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

/// Liveness probe with the running crate version.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(actix_web::App::new().service(health)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "taskdeck");
        assert!(json["timestamp"].is_string());
    }
}
