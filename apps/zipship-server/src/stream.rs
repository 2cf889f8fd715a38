//! Streaming response plumbing
//!
//! The pipeline writes into one end of a bounded in-memory pipe while hyper
//! pulls the other end as the response body. Once `STREAM_BUFFER_BYTES` are
//! waiting for the client, writers wait too, so a slow reader slows the
//! pipeline down instead of growing the buffer.

use std::io;

use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::Response,
};
use bytes::{Bytes, BytesMut};
use futures_util::stream;
use tokio::io::{AsyncReadExt, DuplexStream};
use zipship_domain::StreamEmitter;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Bytes buffered between the pipeline and the client
pub const STREAM_BUFFER_BYTES: usize = 64 * 1024;

/// Largest chunk handed to hyper at once
const CHUNK_BYTES: usize = 8 * 1024;

/// Open a chunked plain-text response and the emitter feeding it
///
/// The response is ready to be returned right away: headers go out before
/// the first line is emitted. The body ends once every emitter clone has
/// been dropped. When the client disconnects, further lines are dropped.
pub fn open_stream() -> (StreamEmitter<DuplexStream>, Response) {
    open_stream_with_capacity(STREAM_BUFFER_BYTES)
}

fn open_stream_with_capacity(capacity: usize) -> (StreamEmitter<DuplexStream>, Response) {
    let (writer, reader) = tokio::io::duplex(capacity);

    let body = Body::from_stream(stream::unfold(Some(reader), next_chunk));
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
        .headers_mut()
        .insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    (StreamEmitter::open(writer), response)
}

async fn next_chunk(
    reader: Option<DuplexStream>,
) -> Option<(io::Result<Bytes>, Option<DuplexStream>)> {
    let mut reader = reader?;
    let mut chunk = BytesMut::with_capacity(CHUNK_BYTES);

    match reader.read_buf(&mut chunk).await {
        Ok(0) => None,
        Ok(_) => Some((Ok(chunk.freeze()), Some(reader))),
        // Report the error once, then end the body
        Err(err) => Some((Err(err), None)),
    }
}
