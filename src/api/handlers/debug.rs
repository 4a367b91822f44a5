use axum::Json;
use serde::Serialize;

use crate::api::routes::{API_ROUTES, API_PREFIXES, TOP_LEVEL_ROUTES};

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub path: String,
    pub methods: Vec<&'static str>,
}

/// GET /debug/routes
pub async fn list_routes() -> Json<Vec<RouteInfo>> {
    let mut routes: Vec<RouteInfo> = TOP_LEVEL_ROUTES
        .iter()
        .map(|(path, methods)| RouteInfo {
            path: path.to_string(),
            methods: methods.to_vec(),
        })
        .collect();

    for prefix in API_PREFIXES {
        routes.extend(API_ROUTES.iter().map(|(path, methods)| RouteInfo {
            path: format!("{prefix}{path}"),
            methods: methods.to_vec(),
        }));
    }
    Json(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn api_routes_listed_under_both_prefixes() {
        let Json(routes) = list_routes().await;
        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"/api/leave/{id}/approve"));
        assert!(paths.contains(&"/leave/{id}/approve"));
        assert!(paths.contains(&"/health"));
        let approve = routes
            .iter()
            .find(|r| r.path == "/api/leave/{id}/approve")
            .unwrap();
        assert_eq!(approve.methods, vec!["GET", "POST"]);
    }
}
