//! In-memory document store keyed by filename.
//!
//! Each filename owns a slot holding a [`OnceCell`]. Ingestion goes through
//! [`DocumentStore::get_or_ingest`], so for any filename at most one OCR run
//! can be in flight: concurrent callers for the same name wait on the same
//! cell and observe the winner's document. A failed run leaves the cell
//! empty, so a partially recognised document is never visible and a later
//! call may try again. An empty slot nobody else is waiting on is dropped
//! from the map when the run fails or is cancelled.
//!
//! The slot map is guarded by a `std::sync::Mutex` that is only held to look
//! up or create a slot, never across an `.await`.

use crate::error::AnalyzerError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// A successfully ingested PDF: one cleaned text per page, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub pages: Vec<String>,
}

impl Document {
    pub fn new(filename: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            filename: filename.into(),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of 1-indexed `page`, if it exists.
    pub fn page(&self, page: usize) -> Option<&str> {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .map(String::as_str)
    }
}

type Slot = Arc<OnceCell<Arc<Document>>>;

/// Holds a slot for one `get_or_ingest` call and drops it from the map on
/// exit if it is still empty.
struct SlotGuard<'a> {
    store: &'a DocumentStore,
    filename: &'a str,
    slot: Slot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.store.release(self.filename, &self.slot);
    }
}

/// Filename → document map shared by every request.
///
/// Entries are never evicted or replaced.
#[derive(Debug, Default)]
pub struct DocumentStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, filename: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(filename.to_string()).or_default())
    }

    /// Remove an uninitialised slot held only by the map and the caller.
    fn release(&self, filename: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = !slot.initialized()
            && Arc::strong_count(slot) == 2
            && slots.get(filename).is_some_and(|s| Arc::ptr_eq(s, slot));
        if unused {
            slots.remove(filename);
        }
    }

    fn existing_slot(&self, filename: &str) -> Option<Slot> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(filename).cloned()
    }

    /// Whether a complete document is stored under `filename`.
    pub fn exists(&self, filename: &str) -> bool {
        self.get(filename).is_some()
    }

    pub fn get(&self, filename: &str) -> Option<Arc<Document>> {
        self.existing_slot(filename)
            .and_then(|slot| slot.get().cloned())
    }

    /// Like [`get`](Self::get) but fails with `NotIngested`.
    pub fn document(&self, filename: &str) -> Result<Arc<Document>, AnalyzerError> {
        self.get(filename).ok_or_else(|| AnalyzerError::NotIngested {
            filename: filename.to_string(),
        })
    }

    /// Page texts of `filename`, in page order.
    pub fn get_texts(&self, filename: &str) -> Result<Vec<String>, AnalyzerError> {
        Ok(self.document(filename)?.pages.clone())
    }

    /// Store `pages` under `filename` unless something is already there.
    ///
    /// Returns `true` if this call stored the document.
    pub fn put(&self, filename: &str, pages: Vec<String>) -> bool {
        let doc = Arc::new(Document::new(filename, pages));
        self.slot(filename).set(doc).is_ok()
    }

    /// Return the stored document, running `init` to produce the page texts
    /// if there is none yet.
    ///
    /// The boolean is `true` when this call's `init` produced the document.
    /// `init` runs at most once at a time per filename; if it fails the error
    /// is returned and nothing is stored. Dropping the returned future
    /// cancels `init` the same way.
    pub async fn get_or_ingest<F, Fut>(
        &self,
        filename: &str,
        init: F,
    ) -> Result<(Arc<Document>, bool), AnalyzerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, AnalyzerError>>,
    {
        let guard = SlotGuard {
            store: self,
            filename,
            slot: self.slot(filename),
        };
        let mut ran = false;
        let doc = guard
            .slot
            .get_or_try_init(|| {
                ran = true;
                async move {
                    let pages = init().await?;
                    Ok::<_, AnalyzerError>(Arc::new(Document::new(filename, pages)))
                }
            })
            .await
            .map(Arc::clone)?;
        Ok((doc, ran))
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of stored documents, sorted.
    pub fn filenames(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pages(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("page {i}")).collect()
    }

    #[test]
    fn document_pages_are_one_indexed() {
        let doc = Document::new("a.pdf", pages(2));
        assert_eq!(doc.page(1), Some("page 1"));
        assert_eq!(doc.page(2), Some("page 2"));
        assert_eq!(doc.page(0), None);
        assert_eq!(doc.page(3), None);
    }

    #[test]
    fn put_is_insert_if_absent() {
        let store = DocumentStore::new();
        assert!(store.put("a.pdf", pages(2)));
        assert!(!store.put("a.pdf", pages(5)));
        assert_eq!(store.get_texts("a.pdf").unwrap(), pages(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_document_is_not_ingested() {
        let store = DocumentStore::new();
        assert!(!store.exists("nope.pdf"));
        let err = store.get_texts("nope.pdf").unwrap_err();
        assert!(matches!(err, AnalyzerError::NotIngested { .. }));
    }

    #[test]
    fn failed_init_stores_nothing_and_allows_retry() {
        let store = DocumentStore::new();
        let err = tokio_test::block_on(store.get_or_ingest("b.pdf", || async {
            Err(AnalyzerError::OcrFailed {
                page: 2,
                detail: "boom".into(),
            })
        }))
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::OcrFailed { page: 2, .. }));
        assert!(!store.exists("b.pdf"));
        assert!(store.is_empty());
        assert!(store.filenames().is_empty());
        assert_eq!(store.slots.lock().unwrap().len(), 0);

        let (doc, ran) =
            tokio_test::block_on(store.get_or_ingest("b.pdf", || async { Ok(pages(3)) })).unwrap();
        assert!(ran);
        assert_eq!(doc.page_count(), 3);
        assert_eq!(store.filenames(), vec!["b.pdf".to_string()]);
    }

    #[tokio::test]
    async fn second_ingest_does_not_run_init() {
        let store = DocumentStore::new();
        let calls = AtomicUsize::new(0);

        let (_, first) = store
            .get_or_ingest("c.pdf", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(pages(1))
            })
            .await
            .unwrap();
        let (doc, second) = store
            .get_or_ingest("c.pdf", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(pages(9))
            })
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_ingests_of_one_name_run_once() {
        let store = Arc::new(DocumentStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                store
                    .get_or_ingest("same.pdf", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(pages(4))
                    })
                    .await
                    .map(|(doc, ran)| (doc.page_count(), ran))
            }));
        }

        let mut ran_count = 0;
        for handle in handles {
            let (count, ran) = handle.await.unwrap().unwrap();
            assert_eq!(count, 4);
            ran_count += ran as usize;
        }
        assert_eq!(ran_count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_ingest_leaves_no_slot() {
        let store = DocumentStore::new();
        let run = store.get_or_ingest("stuck.pdf", || {
            std::future::pending::<Result<Vec<String>, AnalyzerError>>()
        });
        let cancelled = tokio::time::timeout(std::time::Duration::from_millis(20), run).await;
        assert!(cancelled.is_err());
        assert!(!store.exists("stuck.pdf"));
        assert_eq!(store.slots.lock().unwrap().len(), 0);

        let (doc, ran) = store
            .get_or_ingest("stuck.pdf", || async { Ok(pages(2)) })
            .await
            .unwrap();
        assert!(ran);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn failed_names_do_not_accumulate() {
        let store = DocumentStore::new();
        for i in 0..5 {
            let name = format!("bad-{i}.pdf");
            let _ = tokio_test::block_on(store.get_or_ingest(&name, || async {
                Err(AnalyzerError::CorruptPdf {
                    detail: "xref".into(),
                })
            }));
        }
        assert_eq!(store.slots.lock().unwrap().len(), 0);
    }

    #[test]
    fn filenames_are_sorted() {
        let store = DocumentStore::new();
        store.put("z.pdf", pages(1));
        store.put("a.pdf", pages(1));
        assert_eq!(store.filenames(), vec!["a.pdf", "z.pdf"]);
    }
}
