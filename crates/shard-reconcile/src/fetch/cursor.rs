//! Keyset pagination cursor.

use crate::core::{ComparableRecord, RecordKey};
use crate::error::{ReconcileError, Result};

/// Resumable position within one partition's source scan.
///
/// Owned by a single verifier invocation; never shared between tasks.
#[derive(Debug, Clone)]
pub struct BatchCursor {
    last_key: Option<RecordKey>,
    page_size: usize,
}

impl BatchCursor {
    /// Cursor positioned before the first key.
    pub fn new(page_size: usize) -> Self {
        Self {
            last_key: None,
            page_size: page_size.max(1),
        }
    }

    pub fn last_key(&self) -> Option<&RecordKey> {
        self.last_key.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Move past `batch`. The batch must be non-empty and end on a key other
    /// than the current one, otherwise the store ignored the keyset bound and
    /// the scan would never terminate.
    pub fn advance(&mut self, table: &str, batch: &[ComparableRecord]) -> Result<()> {
        let last = batch
            .last()
            .ok_or_else(|| ReconcileError::query(table, "cannot advance cursor past an empty batch"))?;

        if self.last_key.as_ref() == Some(&last.key) {
            return Err(ReconcileError::query(
                table,
                format!("keyset scan did not advance past {}", last.key),
            ));
        }

        self.last_key = Some(last.key.clone());
        Ok(())
    }
}
