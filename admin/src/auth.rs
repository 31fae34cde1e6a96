use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use codeloom_common::rbac::extract_credential;

use crate::app::App;

const HEADER_NAME: &str = "ADM-API-KEY";
const QUERY_NAME: &str = "ADM-API-KEY";

/// Proof that the request carried the configured admin key, in
/// header, cookie, or query form.
pub struct AdminKey;

impl FromRequestParts<App> for AdminKey {
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        match extract_credential(parts, HEADER_NAME, QUERY_NAME) {
            Some(key) if key == state.admin_api_key => Ok(AdminKey),
            Some(_) => Err(codeloom_common::response::forbidden(anyhow::anyhow!(
                "invalid ADM-API-KEY"
            ))),
            None => Err(codeloom_common::response::unauthorized(anyhow::anyhow!(
                "please set the 'ADM-API-KEY' in headers, cookies, or query parameters"
            ))),
        }
    }
}
