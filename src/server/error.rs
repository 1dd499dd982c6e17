use crate::errors::PricingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

impl PricingError {
    /// HTTP status for the error's class: 4xx means fix the input,
    /// 502/503 means try again later, 500 is an internal fault.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::CapacityExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamData(_) => StatusCode::BAD_GATEWAY,
            Self::NumericalInstability(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "class": self.class(),
            "message": self.to_string(),
        });
        let fields = self.fields();
        if !fields.is_empty() {
            body["fields"] = serde_json::json!(fields);
        }
        if let Self::CapacityExceeded { requested, cap } = &self {
            body["requested"] = serde_json::json!(requested);
            body["cap"] = serde_json::json!(cap);
        }
        (self.status(), Json(serde_json::json!({ "error": body }))).into_response()
    }
}
