//! # Health Check

use serde::Deserialize;
use storefront_core::ServerStatus;
use tracing::debug;

use crate::client::ApiClient;

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: String,
}

impl ApiClient {
    /// Reports whether the API is up.
    ///
    /// Never fails: a transport error, a non-2xx status or an unreadable
    /// body all read as [`ServerStatus::Offline`].
    pub async fn status(&self) -> ServerStatus {
        let request = match self.get("/api/status") {
            Ok(request) => request,
            Err(_) => return ServerStatus::Offline,
        };
        match self.send_json::<StatusBody>(request).await {
            Ok(body) => ServerStatus::from_report(&body.status),
            Err(err) => {
                debug!(error = %err, "Status check failed");
                ServerStatus::Offline
            }
        }
    }
}
