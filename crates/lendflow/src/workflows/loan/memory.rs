//! Mutex-backed in-memory adapters for the workflow ports. The API service
//! runs on these until a persistent store lands; the test suites share them
//! as doubles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::audit::{AuditEvent, NewAuditEvent};
use super::domain::{
    ApplicationId, BorrowerId, Document, DocumentId, DocumentKind, DocumentVerificationRecord,
    LoanApplication,
};
use super::repository::{
    ApplicationRepository, AuditStoreError, AuditTrail, DocumentLock, DocumentVault,
    RepositoryError, VaultError,
};

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, LoanApplication>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: LoanApplication) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

type RecordKey = (ApplicationId, DocumentKind, DocumentId);

#[derive(Default)]
struct VaultState {
    documents: Vec<Document>,
    records: HashMap<RecordKey, DocumentVerificationRecord>,
}

/// Document store backed by a single mutex so the record upsert and the
/// document lock land together.
#[derive(Default, Clone)]
pub struct InMemoryDocumentVault {
    state: Arc<Mutex<VaultState>>,
}

impl InMemoryDocumentVault {
    pub fn seed_document(&self, document: Document) {
        let mut guard = self.state.lock().expect("vault mutex poisoned");
        guard.documents.push(document);
    }

    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        let guard = self.state.lock().expect("vault mutex poisoned");
        guard.documents.iter().find(|doc| &doc.id == id).cloned()
    }

    pub fn record_count(&self, application_id: &ApplicationId) -> usize {
        let guard = self.state.lock().expect("vault mutex poisoned");
        guard
            .records
            .keys()
            .filter(|(app, _, _)| app == application_id)
            .count()
    }
}

impl DocumentVault for InMemoryDocumentVault {
    fn documents_for(&self, borrower: &BorrowerId) -> Result<Vec<Document>, VaultError> {
        let guard = self.state.lock().expect("vault mutex poisoned");
        Ok(guard
            .documents
            .iter()
            .filter(|doc| &doc.borrower == borrower)
            .cloned()
            .collect())
    }

    fn find_document(
        &self,
        borrower: &BorrowerId,
        kind: DocumentKind,
        id: &DocumentId,
    ) -> Result<Option<Document>, VaultError> {
        let guard = self.state.lock().expect("vault mutex poisoned");
        Ok(guard
            .documents
            .iter()
            .find(|doc| &doc.borrower == borrower && doc.kind == kind && &doc.id == id)
            .cloned())
    }

    fn record(
        &self,
        application_id: &ApplicationId,
        kind: DocumentKind,
        document_id: &DocumentId,
    ) -> Result<Option<DocumentVerificationRecord>, VaultError> {
        let guard = self.state.lock().expect("vault mutex poisoned");
        let key = (application_id.clone(), kind, document_id.clone());
        Ok(guard.records.get(&key).cloned())
    }

    fn records_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentVerificationRecord>, VaultError> {
        let guard = self.state.lock().expect("vault mutex poisoned");
        Ok(guard
            .records
            .values()
            .filter(|record| &record.application_id == application_id)
            .cloned()
            .collect())
    }

    fn insert_pending(&self, record: DocumentVerificationRecord) -> Result<bool, VaultError> {
        let mut guard = self.state.lock().expect("vault mutex poisoned");
        let key = (
            record.application_id.clone(),
            record.document_kind,
            record.document_id.clone(),
        );
        if guard.records.contains_key(&key) {
            return Ok(false);
        }
        guard.records.insert(key, record);
        Ok(true)
    }

    fn commit_verification(
        &self,
        record: DocumentVerificationRecord,
        lock: DocumentLock,
    ) -> Result<(), VaultError> {
        let mut guard = self.state.lock().expect("vault mutex poisoned");
        // Resolve the document before touching the records map so a missing
        // document leaves no stranded record behind.
        let position = guard
            .documents
            .iter()
            .position(|doc| {
                doc.borrower == lock.borrower
                    && doc.kind == lock.document_kind
                    && doc.id == lock.document_id
            })
            .ok_or(VaultError::NotFound)?;
        let key = (
            record.application_id.clone(),
            record.document_kind,
            record.document_id.clone(),
        );
        guard.records.insert(key, record);
        let document = &mut guard.documents[position];
        document.is_verified = true;
        document.verified_for_application = Some(lock.application_id);
        document.locked_at = Some(lock.locked_at);
        Ok(())
    }
}

/// Append-only trail with store-assigned sequential ids.
#[derive(Default, Clone)]
pub struct InMemoryAuditTrail {
    sequence: Arc<AtomicU64>,
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditTrail {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("trail mutex poisoned").clone()
    }
}

impl AuditTrail for InMemoryAuditTrail {
    fn append(&self, event: NewAuditEvent) -> Result<AuditEvent, AuditStoreError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = AuditEvent {
            id,
            application_id: event.application_id,
            event_type: event.event_type,
            title: event.title,
            description: event.description,
            previous_status: event.previous_status,
            new_status: event.new_status,
            actor: event.actor,
            details: event.details,
            created_at: event.created_at,
        };
        self.events
            .lock()
            .expect("trail mutex poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    fn for_application(&self, id: &ApplicationId) -> Result<Vec<AuditEvent>, AuditStoreError> {
        let guard = self.events.lock().expect("trail mutex poisoned");
        Ok(guard
            .iter()
            .filter(|event| &event.application_id == id)
            .cloned()
            .collect())
    }
}
