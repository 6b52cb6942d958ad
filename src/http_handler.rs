use log::{debug, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::errors::RagError;

/// Decodes a provider response, surfacing non-2xx statuses with their body.
///
/// `method` names the remote operation and only appears in error messages.
pub async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    method: &'static str,
) -> Result<T, RagError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(status_error(method, status, &body));
    }
    serde_json::from_str::<T>(&body).map_err(|e| {
        debug!("undecodable {} body: {}", method, body);
        RagError::MalformedResponse(format!("{}: {}", method, e))
    })
}

fn status_error(method: &str, status: StatusCode, body: &str) -> RagError {
    let errmsg = format!(
        "call to '{}' failed with status {}: {}",
        method, status, body
    );
    warn!("{}", errmsg);
    RagError::InternalError(anyhow::anyhow!(errmsg))
}
