//! REST route table and request dispatch.
//!
//! Every `(method, path)` pair the API serves is listed in [`Route::ALL`].
//! [`Route::resolve`] maps a raw request line onto a [`Route`], then
//! [`ApiRequest::parse`] turns the captured path parameters and JSON body
//! into typed arguments, and [`dispatch`] runs the matching engine operation.
//!
//! The transport is left to the embedding server; this module deals only in
//! methods, paths, and byte bodies.

use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};
use enc_core::{NewRecord, RecordId, RecordUpdate, StoreId};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every API path.
pub const API_PREFIX: &str = "/api";

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(ServerError::InvalidRequest(format!(
                "unsupported method: {other}"
            ))),
        }
    }
}

/// One API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Engine and server status.
    Status,
    /// Effective configuration.
    Config,
    /// Event history.
    ListEvents,
    /// Drop event history.
    ClearEvents,
    /// All stores.
    ListStores,
    /// New store.
    CreateStore,
    /// One store with its records.
    GetStore,
    /// Rename a store.
    UpdateStore,
    /// Remove a store.
    DeleteStore,
    /// Records of a store.
    ListRecords,
    /// New record.
    CreateRecord,
    /// One record.
    GetRecord,
    /// Change a record.
    UpdateRecord,
    /// Remove a record.
    DeleteRecord,
    /// Binary attachment of a record.
    RecordBuffer,
}

impl Route {
    /// Every served endpoint. `:name` segments capture a parameter.
    pub const ALL: [(Method, &'static str, Route); 15] = [
        (Method::Get, "/api/status", Route::Status),
        (Method::Get, "/api/config", Route::Config),
        (Method::Get, "/api/events", Route::ListEvents),
        (Method::Get, "/api/events/clear", Route::ClearEvents),
        (Method::Get, "/api/stores", Route::ListStores),
        (Method::Post, "/api/stores", Route::CreateStore),
        (Method::Get, "/api/store/:id", Route::GetStore),
        (Method::Put, "/api/store/:id", Route::UpdateStore),
        (Method::Delete, "/api/store/:id", Route::DeleteStore),
        (Method::Get, "/api/store/:id/records", Route::ListRecords),
        (Method::Post, "/api/store/:id/records", Route::CreateRecord),
        (Method::Get, "/api/store/:id/record/:r_id", Route::GetRecord),
        (Method::Put, "/api/store/:id/record/:r_id", Route::UpdateRecord),
        (Method::Delete, "/api/store/:id/record/:r_id", Route::DeleteRecord),
        (Method::Get, "/api/store/:id/record/:r_id/buffer", Route::RecordBuffer),
    ];

    /// Finds the route for a request.
    ///
    /// A query string and a trailing slash are ignored. Returns the captured
    /// path parameters in pattern order.
    pub fn resolve(method: Method, path: &str) -> Option<(Route, Vec<String>)> {
        let path = path.split('?').next().unwrap_or_default();
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        Self::ALL
            .iter()
            .filter(|(m, _, _)| *m == method)
            .find_map(|(_, pattern, route)| match_pattern(pattern, path).map(|p| (*route, p)))
    }

    /// Method and pattern of this route.
    pub fn endpoint(self) -> (Method, &'static str) {
        Self::ALL
            .iter()
            .find(|(_, _, r)| *r == self)
            .map(|(m, p, _)| (*m, *p))
            .unwrap_or((Method::Get, API_PREFIX))
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<Vec<String>> {
    let mut want = pattern.split('/');
    let mut have = path.split('/');
    let mut params = Vec::new();

    loop {
        match (want.next(), have.next()) {
            (None, None) => return Some(params),
            (Some(w), Some(h)) if w.starts_with(':') => {
                if h.is_empty() {
                    return None;
                }
                params.push(h.to_string());
            }
            (Some(w), Some(h)) if w == h => {}
            _ => return None,
        }
    }
}

/// A request with typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    /// See [`Route::Status`].
    Status,
    /// See [`Route::Config`].
    Config,
    /// See [`Route::ListEvents`].
    ListEvents,
    /// See [`Route::ClearEvents`].
    ClearEvents,
    /// See [`Route::ListStores`].
    ListStores,
    /// See [`Route::CreateStore`].
    CreateStore {
        /// Store title.
        title: String,
    },
    /// See [`Route::GetStore`].
    GetStore {
        /// Store id.
        store: StoreId,
    },
    /// See [`Route::UpdateStore`].
    UpdateStore {
        /// Store id.
        store: StoreId,
        /// New title.
        title: String,
    },
    /// See [`Route::DeleteStore`].
    DeleteStore {
        /// Store id.
        store: StoreId,
    },
    /// See [`Route::ListRecords`].
    ListRecords {
        /// Store id.
        store: StoreId,
    },
    /// See [`Route::CreateRecord`].
    CreateRecord {
        /// Store id.
        store: StoreId,
        /// Record contents.
        record: NewRecord,
    },
    /// See [`Route::GetRecord`].
    GetRecord {
        /// Store id.
        store: StoreId,
        /// Record id.
        record: RecordId,
    },
    /// See [`Route::UpdateRecord`].
    UpdateRecord {
        /// Store id.
        store: StoreId,
        /// Record id.
        record: RecordId,
        /// Fields to change.
        update: RecordUpdate,
    },
    /// See [`Route::DeleteRecord`].
    DeleteRecord {
        /// Store id.
        store: StoreId,
        /// Record id.
        record: RecordId,
    },
    /// See [`Route::RecordBuffer`].
    RecordBuffer {
        /// Store id.
        store: StoreId,
        /// Record id.
        record: RecordId,
    },
}

#[derive(Deserialize)]
struct StoreBody {
    title: String,
}

impl ApiRequest {
    /// Builds a typed request from a resolved route.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed ids or bodies.
    pub fn parse(route: Route, params: &[String], body: &[u8]) -> ServerResult<Self> {
        let request = match route {
            Route::Status => ApiRequest::Status,
            Route::Config => ApiRequest::Config,
            Route::ListEvents => ApiRequest::ListEvents,
            Route::ClearEvents => ApiRequest::ClearEvents,
            Route::ListStores => ApiRequest::ListStores,
            Route::CreateStore => ApiRequest::CreateStore {
                title: json_body::<StoreBody>(body)?.title,
            },
            Route::GetStore => ApiRequest::GetStore {
                store: param(params, 0)?,
            },
            Route::UpdateStore => ApiRequest::UpdateStore {
                store: param(params, 0)?,
                title: json_body::<StoreBody>(body)?.title,
            },
            Route::DeleteStore => ApiRequest::DeleteStore {
                store: param(params, 0)?,
            },
            Route::ListRecords => ApiRequest::ListRecords {
                store: param(params, 0)?,
            },
            Route::CreateRecord => ApiRequest::CreateRecord {
                store: param(params, 0)?,
                record: json_body(body)?,
            },
            Route::GetRecord => ApiRequest::GetRecord {
                store: param(params, 0)?,
                record: param(params, 1)?,
            },
            Route::UpdateRecord => ApiRequest::UpdateRecord {
                store: param(params, 0)?,
                record: param(params, 1)?,
                update: json_body(body)?,
            },
            Route::DeleteRecord => ApiRequest::DeleteRecord {
                store: param(params, 0)?,
                record: param(params, 1)?,
            },
            Route::RecordBuffer => ApiRequest::RecordBuffer {
                store: param(params, 0)?,
                record: param(params, 1)?,
            },
        };
        Ok(request)
    }
}

fn param<T>(params: &[String], index: usize) -> ServerResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = params
        .get(index)
        .ok_or_else(|| ServerError::InvalidRequest(format!("missing path parameter {index}")))?;
    raw.parse()
        .map_err(|e| ServerError::InvalidRequest(format!("invalid id '{raw}': {e}")))
}

fn json_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> ServerResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid body: {e}")))
}

/// Result of a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// JSON document.
    Json(Value),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl ApiResponse {
    fn json<T: serde::Serialize>(value: &T) -> ServerResult<Self> {
        serde_json::to_value(value)
            .map(ApiResponse::Json)
            .map_err(|e| ServerError::InvalidRequest(format!("cannot encode response: {e}")))
    }

    /// Returns the JSON document, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(v) => Some(v),
            ApiResponse::Bytes(_) => None,
        }
    }
}

/// Runs one request against the engine.
///
/// Engine calls are synchronous; call this from a blocking context.
pub fn dispatch(ctx: &ServerContext, request: ApiRequest) -> ServerResult<ApiResponse> {
    let engine = &ctx.engine;
    match request {
        ApiRequest::Status => {
            let status = engine.status()?;
            Ok(ApiResponse::Json(json!({
                "version": env!("CARGO_PKG_VERSION"),
                "engine": status,
                "events": ctx.events.len(),
                "fingerprint": ctx.fingerprint,
            })))
        }
        ApiRequest::Config => ApiResponse::json(ctx.config.as_ref()),
        ApiRequest::ListEvents => ApiResponse::json(&ctx.events.list()),
        ApiRequest::ClearEvents => {
            let removed = ctx.events.clear();
            Ok(ApiResponse::Json(json!({ "removed": removed })))
        }
        ApiRequest::ListStores => ApiResponse::json(&engine.list_stores()?),
        ApiRequest::CreateStore { title } => ApiResponse::json(&engine.create_store(title)?.meta()),
        ApiRequest::GetStore { store } => ApiResponse::json(&engine.get_store(store)?),
        ApiRequest::UpdateStore { store, title } => {
            ApiResponse::json(&engine.update_store(store, title)?)
        }
        ApiRequest::DeleteStore { store } => ApiResponse::json(&engine.delete_store(store)?),
        ApiRequest::ListRecords { store } => ApiResponse::json(&engine.list_records(store)?),
        ApiRequest::CreateRecord { store, record } => {
            ApiResponse::json(&engine.create_record(store, record)?)
        }
        ApiRequest::GetRecord { store, record } => {
            ApiResponse::json(&engine.get_record(store, record)?)
        }
        ApiRequest::UpdateRecord {
            store,
            record,
            update,
        } => ApiResponse::json(&engine.update_record(store, record, update)?),
        ApiRequest::DeleteRecord { store, record } => {
            ApiResponse::json(&engine.delete_record(store, record)?)
        }
        ApiRequest::RecordBuffer { store, record } => engine
            .record_buffer(store, record)?
            .map(ApiResponse::Bytes)
            .ok_or_else(|| ServerError::NotFound(format!("record {record} has no buffer"))),
    }
}

/// Resolves, parses and dispatches a raw request.
///
/// # Errors
///
/// `NotFound` when no route matches, `InvalidRequest` for a bad method,
/// id or body, and engine errors otherwise.
pub fn handle(
    ctx: &ServerContext,
    method: &str,
    path: &str,
    body: &[u8],
) -> ServerResult<ApiResponse> {
    let method: Method = method.parse()?;
    let (route, params) = Route::resolve(method, path)
        .ok_or_else(|| ServerError::NotFound(format!("{method} {path}")))?;
    let request = ApiRequest::parse(route, &params, body)?;
    dispatch(ctx, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_unique_endpoints_and_routes() {
        let endpoints: HashSet<_> = Route::ALL.iter().map(|(m, p, _)| (*m, *p)).collect();
        assert_eq!(endpoints.len(), Route::ALL.len());

        let routes: HashSet<_> = Route::ALL.iter().map(|(_, _, r)| *r).collect();
        assert_eq!(routes.len(), Route::ALL.len());

        for (_, pattern, _) in Route::ALL {
            assert!(pattern.starts_with(API_PREFIX));
        }
    }

    #[test]
    fn every_route_resolves_from_its_own_pattern() {
        let id = StoreId::new().to_string();
        let rid = RecordId::new().to_string();
        for (method, pattern, route) in Route::ALL {
            let path = pattern.replace(":r_id", &rid).replace(":id", &id);
            let (resolved, _) = Route::resolve(method, &path).unwrap();
            assert_eq!(resolved, route, "{method} {path}");
            assert_eq!(route.endpoint(), (method, pattern));
        }
    }

    #[test]
    fn resolve_captures_parameters() {
        let (route, params) =
            Route::resolve(Method::Get, "/api/store/abc/record/def/buffer").unwrap();
        assert_eq!(route, Route::RecordBuffer);
        assert_eq!(params, vec!["abc", "def"]);
    }

    #[test]
    fn resolve_ignores_query_and_trailing_slash() {
        assert_eq!(
            Route::resolve(Method::Get, "/api/stores/?page=2").map(|(r, _)| r),
            Some(Route::ListStores)
        );
    }

    #[test]
    fn resolve_rejects_unknown_paths_and_methods() {
        assert!(Route::resolve(Method::Get, "/api/nope").is_none());
        assert!(Route::resolve(Method::Delete, "/api/stores").is_none());
        assert!(Route::resolve(Method::Get, "/api/store//records").is_none());
        assert!(Route::resolve(Method::Get, "/api/store/a/records/extra").is_none());
    }

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!(
            "PATCH".parse::<Method>(),
            Err(ServerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn parse_rejects_bad_ids_and_bodies() {
        assert!(matches!(
            ApiRequest::parse(Route::GetStore, &["not-a-uuid".into()], b""),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            ApiRequest::parse(Route::CreateStore, &[], b"{}"),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            ApiRequest::parse(Route::GetRecord, &[StoreId::new().to_string()], b""),
            Err(ServerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn parse_builds_typed_requests() {
        let store = StoreId::new();
        let request = ApiRequest::parse(
            Route::CreateRecord,
            &[store.to_string()],
            br#"{"kind": "password", "title": "bank", "value": [1, 2, 3]}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            ApiRequest::CreateRecord {
                store,
                record: NewRecord::new("password", "bank", vec![1, 2, 3]),
            }
        );
    }
}
