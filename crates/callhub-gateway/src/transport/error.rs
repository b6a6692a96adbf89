//! HTTP mapping for hub errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use callhub_core::error::{ClientCode, HubError};
use callhub_core::record::ErrorBody;

/// Response wrapper so `HubError` can be returned from axum handlers.
#[derive(Debug)]
pub struct ErrorResponse(pub HubError);

impl From<HubError> for ErrorResponse {
    fn from(e: HubError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ClientCode::Forbidden => StatusCode::FORBIDDEN,
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::Unimplemented => StatusCode::NOT_FOUND,
        ClientCode::TransportFailure => StatusCode::BAD_GATEWAY,
        ClientCode::ConfigInvalid | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = status_for(self.0.client_code());
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}
