use crate::events::encode_frame;
use crate::relay::Subscription;
use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use futures_util::StreamExt;
use std::convert::Infallible;

/// Proxies in front of a hop must not buffer the stream.
pub const NO_BUFFERING_HEADER: &str = "x-accel-buffering";

/// Serve a subscription as `text/event-stream`.
///
/// When the client goes away the body, and with it the subscription, is
/// dropped, which stops that subscriber's forwarder.
pub fn build_sse_response(subscription: Subscription, retry_ms: u64) -> Response<Body> {
    let stream =
        subscription.map(move |event| Ok::<_, Infallible>(encode_frame(&event, retry_ms)));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    response.headers_mut().insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    response.headers_mut().insert(
        NO_BUFFERING_HEADER,
        header::HeaderValue::from_static("no"),
    );
    response
}
