use axum::{
    http,
    response::{IntoResponse, Response},
    Json,
};
use larder_client::{generation::PipelineError, history::StorageError};
pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        // Every failure is logged in full here, once
        tracing::error!("{}", self);
        // In development, we want to return the error message
        // In production, we want to return a generic error message
        let display = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        };
        let (status, message) = match self {
            WebError::Storage(_) => (http::StatusCode::INTERNAL_SERVER_ERROR, display),
            // Users only ever see the generic message for a failed generation
            WebError::Pipeline(err) => (http::StatusCode::BAD_GATEWAY, err.user_message().into()),
            // Bad requests are always explained
            WebError::BadRequest(reason) => (http::StatusCode::BAD_REQUEST, reason),
            WebError::NotFound => (http::StatusCode::NOT_FOUND, "Not Found".into()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_client::generation::GatewayError;

    #[test]
    fn pipeline_failures_are_bad_gateway() {
        let err = WebError::from(PipelineError::Generation(GatewayError::EmptyResponse));
        let response = err.into_response();
        assert_eq!(response.status(), http::StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(
            WebError::BadRequest("no".into()).into_response().status(),
            http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebError::NotFound.into_response().status(),
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::from(StorageError::Write(anyhow::anyhow!("disk on fire")))
                .into_response()
                .status(),
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
