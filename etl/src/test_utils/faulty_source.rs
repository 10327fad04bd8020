use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::source::Source;
use crate::types::{IdBounds, KeyRange, Record, TimeWindow};

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    fail_range_query: bool,
    /// Key and page number: the range containing the key fails on that page (1-based).
    fail_page: Option<(i64, u64)>,
    page_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    faults: Faults,
    pages_per_range: Mutex<HashMap<KeyRange, u64>>,
    page_queries: AtomicU64,
}

/// Wraps a [`Source`] and injects failures or delays into its queries.
#[derive(Debug, Clone)]
pub struct FaultInjectingSource<S> {
    wrapped: S,
    inner: Arc<Inner>,
}

impl<S> FaultInjectingSource<S> {
    pub fn wrap(wrapped: S) -> Self {
        Self {
            wrapped,
            inner: Arc::new(Inner::default()),
        }
    }

    fn with_faults(self, update: impl FnOnce(&mut Faults)) -> Self {
        let mut faults = self.inner.faults;
        update(&mut faults);

        Self {
            wrapped: self.wrapped,
            inner: Arc::new(Inner {
                faults,
                ..Inner::default()
            }),
        }
    }

    /// Makes every range query fail.
    pub fn fail_range_query(self) -> Self {
        self.with_faults(|faults| faults.fail_range_query = true)
    }

    /// Makes the range containing `key` fail on its `page`-th query.
    pub fn fail_page(self, key: i64, page: u64) -> Self {
        self.with_faults(|faults| faults.fail_page = Some((key, page)))
    }

    /// Delays every page query.
    pub fn delay_pages(self, delay: Duration) -> Self {
        self.with_faults(|faults| faults.page_delay = Some(delay))
    }

    /// Number of page queries issued so far, failed ones included.
    pub fn page_queries(&self) -> u64 {
        self.inner.page_queries.load(Ordering::SeqCst)
    }

    /// Number of page queries issued for `range`.
    pub fn page_queries_for(&self, range: &KeyRange) -> u64 {
        self.inner
            .pages_per_range
            .lock()
            .unwrap()
            .get(range)
            .copied()
            .unwrap_or_default()
    }
}

impl<S> Source for FaultInjectingSource<S>
where
    S: Source + Send + Sync,
{
    fn name() -> &'static str {
        "fault_injecting"
    }

    async fn query_range(&self, window: &TimeWindow) -> EtlResult<IdBounds> {
        if self.inner.faults.fail_range_query {
            bail!(
                ErrorKind::SourceQueryFailed,
                "Injected range query failure",
                format!("window {window}")
            );
        }

        self.wrapped.query_range(window).await
    }

    async fn query_page(
        &self,
        range: &KeyRange,
        window: &TimeWindow,
        cursor: i64,
        page_size: u32,
    ) -> EtlResult<Vec<Record>> {
        self.inner.page_queries.fetch_add(1, Ordering::SeqCst);
        let page = {
            let mut pages = self.inner.pages_per_range.lock().unwrap();
            let page = pages.entry(*range).or_default();
            *page += 1;
            *page
        };

        if let Some(delay) = self.inner.faults.page_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((key, failing_page)) = self.inner.faults.fail_page {
            if range.contains(key) && page == failing_page {
                bail!(
                    ErrorKind::SourceQueryFailed,
                    "Injected page query failure",
                    format!("range {range}, page {page}, cursor {cursor}")
                );
            }
        }

        self.wrapped
            .query_page(range, window, cursor, page_size)
            .await
    }
}
