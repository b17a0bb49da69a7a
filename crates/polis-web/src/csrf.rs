use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_login::tower_sessions::Session;
use http::{request::Parts, Method, StatusCode};
use rand::{distr::Alphanumeric, Rng};

pub const TOKEN_FIELD: &str = "csrf_token";
const SESSION_KEY: &str = "csrf.token";
const MAX_FORM_BYTES: usize = 1 << 20;

/// The per-session anti-forgery token, created on first use. Handlers that
/// render a form take this extractor and embed the token in a hidden input.
pub struct CsrfToken(pub String);

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        issue(&session)
            .await
            .map(CsrfToken)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

async fn issue(session: &Session) -> Result<String, axum_login::tower_sessions::session::Error> {
    if let Some(token) = session.get::<String>(SESSION_KEY).await? {
        return Ok(token);
    }
    let token: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    session.insert(SESSION_KEY, token.clone()).await?;
    Ok(token)
}

/// Rejects any POST whose `csrf_token` form field does not match the token
/// held by the caller's session. The body is buffered, inspected and handed
/// back to the route untouched.
pub async fn verify(session: Session, request: Request, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let expected: Option<String> = match session.get(SESSION_KEY).await {
        Ok(value) => value,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    match (expected, form_field(&bytes, TOKEN_FIELD)) {
        (Some(expected), Some(submitted)) if expected == submitted => {
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        _ => (
            StatusCode::FORBIDDEN,
            "the anti-forgery token is missing or does not match",
        )
            .into_response(),
    }
}

// Tokens are plain alphanumerics, so the raw value needs no decoding.
fn form_field(bytes: &[u8], field: &str) -> Option<String> {
    let body = std::str::from_utf8(bytes).ok()?;
    body.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == field).then(|| value.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_token_field_is_found_anywhere_in_the_body() {
        let body = b"first_name=Jan&csrf_token=Abc123&last_name=Novak";
        assert_eq!(form_field(body, TOKEN_FIELD).as_deref(), Some("Abc123"));
    }

    #[test]
    fn a_missing_token_field_yields_none() {
        assert_eq!(form_field(b"first_name=Jan", TOKEN_FIELD), None);
        assert_eq!(form_field(b"", TOKEN_FIELD), None);
        assert_eq!(form_field(b"csrf_token", TOKEN_FIELD), None);
    }
}
