use salvo::{Router, handler};

#[handler]
async fn healthcheck() -> &'static str {
    "OK"
}

pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck)
}
