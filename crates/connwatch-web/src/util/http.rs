use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use connwatch_types::ApiError;
use facet::Facet;

pub fn json_ok<T>(value: &T) -> Response
where
    T: for<'facet> Facet<'facet>,
{
    json_with_status(StatusCode::OK, value)
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    json_with_status(
        status,
        &ApiError {
            error: message.into(),
        },
    )
}

pub fn json_with_status<T>(status: StatusCode, value: &T) -> Response
where
    T: for<'facet> Facet<'facet>,
{
    match facet_json::to_string(value) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("json encode error: {e}"),
        )
            .into_response(),
    }
}

/// Parses a facet-json request body, mapping failures to a 400 response.
pub fn parse_json_body<T>(body: &[u8]) -> Result<T, Response>
where
    T: for<'facet> Facet<'facet>,
{
    facet_json::from_slice(body).map_err(|e| {
        json_error(
            StatusCode::BAD_REQUEST,
            format!("invalid request json: {e}"),
        )
    })
}
