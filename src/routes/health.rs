use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::users::repo::format_timestamp;

const SERVICE_NAME: &str = "Form Validation App";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    let now = OffsetDateTime::now_utc();
    let timestamp = format_timestamp(now).unwrap_or_else(|e| {
        warn!(error = %e, "health timestamp formatting failed");
        now.unix_timestamp().to_string()
    });
    Json(HealthResponse {
        status: "OK",
        timestamp,
        service: SERVICE_NAME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_ok_with_millisecond_timestamp() {
        let Json(res) = health().await;
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["service"], "Form Validation App");

        // YYYY-MM-DDTHH:MM:SS.mmmZ
        let ts = json["timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), 24);
        assert_eq!(&ts[19..20], ".");
        assert!(ts.ends_with('Z'));
        assert!(OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339).is_ok());
    }
}
