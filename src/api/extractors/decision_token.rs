/*
 * Responsibility
 * - 承認トークンを query (?token=) または form body (urlencoded / multipart) から取り出す
 * - AMP form は multipart/form-data で送ってくる
 */
use axum::extract::{FromRequest, Multipart, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;

use crate::api::dto::leave::TokenQuery;
use crate::error::AppError;

pub struct DecisionToken(pub String);

fn missing() -> AppError {
    AppError::bad_request("TOKEN_REQUIRED", "approval token is required")
}

fn malformed() -> AppError {
    AppError::bad_request("INVALID_FORM", "could not read form body")
}

impl<S> FromRequest<S> for DecisionToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let from_query = Query::<TokenQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.token);
        if let Some(token) = non_empty(from_query) {
            return Ok(Self(token));
        }

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let from_body = if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|_| malformed())?;
            let mut found = None;
            while let Some(field) = multipart.next_field().await.map_err(|_| malformed())? {
                if field.name() == Some("token") {
                    found = Some(field.text().await.map_err(|_| malformed())?);
                    break;
                }
            }
            found
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<TokenQuery>::from_request(req, state)
                .await
                .map_err(|_| malformed())?;
            form.token
        } else {
            None
        };

        non_empty(from_body).map(Self).ok_or_else(missing)
    }
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    async fn extract(req: Request) -> Result<String, AppError> {
        DecisionToken::from_request(req, &()).await.map(|t| t.0)
    }

    #[tokio::test]
    async fn token_from_query() {
        let req = http::Request::post("/leave/1/approve?token=abc&__amp_source_origin=x")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract(req).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn token_from_urlencoded_body() {
        let req = http::Request::post("/leave/1/approve")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("token=from-form"))
            .unwrap();
        assert_eq!(extract(req).await.unwrap(), "from-form");
    }

    #[tokio::test]
    async fn token_from_multipart_body() {
        let body = "--XYZ\r\n\
                    Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
                    ok\r\n\
                    --XYZ\r\n\
                    Content-Disposition: form-data; name=\"token\"\r\n\r\n\
                    from-amp\r\n\
                    --XYZ--\r\n";
        let req = http::Request::post("/leave/1/approve")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap();
        assert_eq!(extract(req).await.unwrap(), "from-amp");
    }

    #[tokio::test]
    async fn missing_token_is_bad_request() {
        let req = http::Request::post("/leave/1/approve?token=")
            .body(Body::empty())
            .unwrap();
        let err = extract(req).await.unwrap_err();
        assert_eq!(err.parts().0, "TOKEN_REQUIRED");
    }
}
