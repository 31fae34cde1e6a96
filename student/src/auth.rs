use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use codeloom_common::rbac::extract_credential;

use crate::app::App;

const HEADER_NAME: &str = "X-API-KEY";
const QUERY_NAME: &str = "X-API-KEY";

/// The authenticated student id, recovered by verifying the token
/// codec over the presented `X-API-KEY`.
pub struct Principal(pub String);

impl FromRequestParts<App> for Principal {
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_credential(parts, HEADER_NAME, QUERY_NAME) else {
            return Err(codeloom_common::response::unauthorized(anyhow::anyhow!(
                "please set the 'X-API-KEY' in headers, cookies, or query parameters"
            )));
        };
        match state.tokens.verify(&token) {
            Some(sid) => Ok(Principal(sid)),
            None => Err(codeloom_common::response::unauthorized(anyhow::anyhow!("invalid or expired API key"))),
        }
    }
}
