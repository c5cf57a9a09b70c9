use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Largest page any list operation returns.
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Opaque keyset cursor for pages ordered by `(at DESC, id DESC)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct PageCursor {
    pub(super) at: DateTime<Utc>,
    pub(super) id: i64,
}

impl PageCursor {
    pub(super) fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("unable to encode cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub(super) fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor(input.to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor(input.to_string()))
    }
}

pub(super) fn clamp_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_PAGE_LIMIT)
}

/// Cuts a `limit + 1` fetch down to `limit` rows and returns the cursor of the
/// last kept row when more rows exist.
pub(super) fn finish_page<T>(
    mut rows: Vec<T>,
    limit: u64,
    key: impl Fn(&T) -> PageCursor,
) -> ResultEngine<(Vec<T>, Option<String>)> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next = if has_more {
        rows.last().map(|row| key(row).encode()).transpose()?
    } else {
        None
    };
    Ok((rows, next))
}
