//! Opaque cursor codec and the connection shape shared by all list queries.
//!
//! A cursor is the base64 of a zero-based decimal offset. Every list query
//! fetches `limit + 1` rows so `has_next_page` never needs a second count.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use civicsignal_common::CivicError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

pub fn encode_cursor(offset: u64) -> String {
    BASE64.encode(offset.to_string())
}

pub fn decode_cursor(cursor: &str) -> Result<u64, CivicError> {
    let bytes = BASE64
        .decode(cursor)
        .map_err(|_| CivicError::Validation(format!("malformed cursor: {cursor}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| CivicError::Validation(format!("malformed cursor: {cursor}")))?;
    text.parse::<u64>()
        .map_err(|_| CivicError::Validation(format!("malformed cursor: {cursor}")))
}

#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub node: T,
    pub cursor: String,
}

#[derive(Debug, Clone)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub total_count: u64,
}

#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

/// Requested window, decoded from GraphQL-style `first`/`after` arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: usize,
}

impl PageRequest {
    pub fn from_args(first: Option<i32>, after: Option<&str>) -> Result<Self, CivicError> {
        let limit = match first {
            None => DEFAULT_PAGE_SIZE,
            Some(n) if n <= 0 => {
                return Err(CivicError::Validation(format!("first must be positive, got {n}")))
            }
            Some(n) => (n as usize).min(MAX_PAGE_SIZE),
        };
        let offset = match after {
            None => 0,
            Some(cursor) => decode_cursor(cursor)?,
        };
        Ok(Self { offset, limit })
    }

    /// How many rows to fetch: one extra row signals another page exists.
    pub fn fetch_limit(&self) -> usize {
        self.limit + 1
    }
}

impl<T> Connection<T> {
    /// Build a connection from a window fetched with `fetch_limit()` rows and
    /// the total count over the same filter predicate.
    pub fn from_window(mut nodes: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        let has_next_page = nodes.len() > request.limit;
        if has_next_page {
            nodes.truncate(request.limit);
        }

        let edges: Vec<Edge<T>> = nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: encode_cursor(request.offset + i as u64 + 1),
                node,
            })
            .collect();

        Connection {
            page_info: PageInfo {
                has_next_page,
                has_previous_page: request.offset > 0,
                start_cursor: edges.first().map(|e| e.cursor.clone()),
                end_cursor: edges.last().map(|e| e.cursor.clone()),
                total_count,
            },
            edges,
        }
    }

    pub fn map<U>(self, f: impl Fn(T) -> U) -> Connection<U> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge { node: f(edge.node), cursor: edge.cursor })
                .collect(),
            page_info: self.page_info,
        }
    }
}
