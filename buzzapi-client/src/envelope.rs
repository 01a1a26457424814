//! Recognising the shapes of server replies.
//!
//! Every reply is a JSON object. Errors are announced by `api_error_info`,
//! either at the top level or one level down inside `api_result_data`; both
//! placements mean the same thing. Results, message ids, and paging fields
//! follow the same two-level pattern.

use buzzapi_core::RequestMode;
use buzzapi_core::error::{Error, ParseError, Result};
use serde_json::Value;

pub(crate) const RESULT_DATA: &str = "api_result_data";
pub(crate) const ERROR_INFO: &str = "api_error_info";
pub(crate) const MESSAGE_ID: &str = "api_request_messageid";
pub(crate) const TICKET: &str = "api_app_ticket";
pub(crate) const NEXT_CURSOR: &str = "api_paging_next_cursor";
pub(crate) const LAST_PAGE: &str = "api_result_is_last_page";
pub(crate) const LEGACY_LAST_PAGE: &str = "api_paging_last_page";

/// One page of a result, or a whole result for unpaged operations.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Page {
    pub(crate) data: Value,
    pub(crate) next_cursor: Option<String>,
    pub(crate) last_page: Option<bool>,
}

impl Page {
    /// Reads result data and paging fields from one level of a reply.
    fn from_level(level: &Value) -> Self {
        let last_page = level
            .get(LAST_PAGE)
            .or_else(|| level.get(LEGACY_LAST_PAGE))
            .and_then(Value::as_bool);
        Self {
            data: level.get(RESULT_DATA).cloned().unwrap_or(Value::Null),
            next_cursor: level
                .get(NEXT_CURSOR)
                .and_then(Value::as_str)
                .map(str::to_string),
            last_page,
        }
    }

    /// A continuation exists only when a cursor is present and the server
    /// explicitly said this is not the last page.
    pub(crate) fn has_more(&self) -> bool {
        self.next_cursor.is_some() && self.last_page == Some(false)
    }
}

/// Reply to a submission.
#[derive(Debug, PartialEq)]
pub(crate) enum SubmitReply {
    /// The server reported an error for this submission.
    Error {
        message_id: Option<String>,
        error_info: Value,
    },
    /// Sync mode: the result itself.
    Result(Page),
    /// Async mode: the result will be available under `message_id`.
    Accepted {
        message_id: String,
        ticket: Option<String>,
    },
}

/// Reply to a poll.
#[derive(Debug, PartialEq)]
pub(crate) enum PollReply {
    /// Nothing finished yet.
    NotReady,
    /// One outstanding request finished.
    Success { message_id: String, page: Page },
    /// The server reported an error, attributed to a message id or not.
    Error {
        message_id: Option<String>,
        error_info: Value,
    },
    /// A non-empty result that names no message id.
    Anomaly(&'static str),
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Mirrors "empty" for result payloads: null, `{}`, `[]`, `""` and any
/// scalar other than a non-empty string.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn message_id_in(value: &Value) -> Option<String> {
    value
        .get(MESSAGE_ID)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Finds an error indicator at either level.
fn find_error(body: &Value) -> Option<(Option<String>, Value)> {
    if let Some(info) = present(body.get(ERROR_INFO)) {
        let message_id = message_id_in(info).or_else(|| message_id_in(body));
        return Some((message_id, info.clone()));
    }
    let inner = body.get(RESULT_DATA)?;
    let info = present(inner.get(ERROR_INFO))?;
    Some((message_id_in(inner), info.clone()))
}

/// Classifies the reply to a submission made in `mode`.
///
/// # Errors
///
/// Returns a parse error when an async submission is accepted without a
/// usable message id.
pub(crate) fn classify_submit(body: &Value, mode: RequestMode) -> Result<SubmitReply> {
    if let Some((message_id, error_info)) = find_error(body) {
        return Ok(SubmitReply::Error {
            message_id,
            error_info,
        });
    }

    match mode {
        RequestMode::Sync => Ok(SubmitReply::Result(Page::from_level(body))),
        RequestMode::Async => {
            let message_id = match body.get(RESULT_DATA) {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                Some(other) => {
                    return Err(Error::from(ParseError::invalid_value(
                        RESULT_DATA,
                        format!("expected a message id, got {other}"),
                    )));
                }
                None => return Err(Error::from(ParseError::missing_field(RESULT_DATA))),
            };
            Ok(SubmitReply::Accepted {
                message_id,
                ticket: ticket_in(body),
            })
        }
    }
}

/// Classifies the reply to a poll.
pub(crate) fn classify_poll(body: &Value) -> PollReply {
    if let Some((message_id, error_info)) = find_error(body) {
        return PollReply::Error {
            message_id,
            error_info,
        };
    }

    let Some(inner) = body.get(RESULT_DATA).filter(|v| !is_empty(v)) else {
        return PollReply::NotReady;
    };

    match message_id_in(inner) {
        Some(message_id) => PollReply::Success {
            message_id,
            page: Page::from_level(inner),
        },
        None => PollReply::Anomaly("result without api_request_messageid"),
    }
}

/// The session ticket carried by a reply, if any.
pub(crate) fn ticket_in(body: &Value) -> Option<String> {
    body.get(TICKET)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
