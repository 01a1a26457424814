//! Caller-driven pagination.
//!
//! A paged call is a chain of ordinary submissions: the first carries the
//! start cursor, each following one carries the cursor returned by the page
//! before it. Every page goes through the dispatcher and, in async mode, the
//! poll loop, exactly like an unpaged call.

use crate::engine::Engine;
use crate::options::PostOptions;
use buzzapi_core::error::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Cursor sent with the first page of a paged call.
pub(crate) const START_CURSOR: &str = "START";

/// Concatenates page data in arrival order.
#[derive(Debug, Default)]
struct PageAccumulator {
    items: Vec<Value>,
}

impl PageAccumulator {
    fn push(&mut self, data: Value) {
        match data {
            Value::Array(items) => self.items.extend(items),
            Value::Null => {}
            other => self.items.push(other),
        }
    }

    fn finish(self) -> Value {
        Value::Array(self.items)
    }
}

impl Engine {
    /// Runs one call, following paging cursors when `options.paged` is set.
    pub(crate) async fn post(
        self: &Arc<Self>,
        resource: &str,
        operation: &str,
        payload: &Value,
        options: PostOptions,
    ) -> Result<Value> {
        if !options.paged {
            return Ok(self.submit(resource, operation, payload, None).await?.data);
        }

        let mut pages = PageAccumulator::default();
        let mut cursor = START_CURSOR.to_string();
        let mut count = 0usize;
        loop {
            let page = self
                .submit(resource, operation, payload, Some(&cursor))
                .await?;
            count += 1;
            let more = page.has_more();
            let next = page.next_cursor.clone();
            pages.push(page.data);

            match next {
                Some(next) if more => cursor = next,
                _ => break,
            }
        }
        debug!(resource, operation, pages = count, "Paged call complete");
        Ok(pages.finish())
    }
}
