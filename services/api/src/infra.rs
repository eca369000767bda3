use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use lendflow::workflows::loan::{Actor, ActorDirectory, ActorId, ActorRole, ActorToken, DirectoryError};

pub(crate) use lendflow::workflows::loan::{
    InMemoryApplicationRepository, InMemoryAuditTrail, InMemoryDocumentVault,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Directory standing in until the identity provider integration lands:
/// accepts any non-empty token and echoes it back as a reviewer.
#[derive(Default, Clone)]
pub(crate) struct PassthroughDirectory;

impl ActorDirectory for PassthroughDirectory {
    fn resolve(&self, token: &ActorToken) -> Result<Actor, DirectoryError> {
        let id = token.0.trim();
        if id.is_empty() {
            return Err(DirectoryError::UnknownActor);
        }
        Ok(Actor {
            id: ActorId(id.to_string()),
            name: id.to_string(),
            role: ActorRole::Reviewer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_rejects_blank_tokens() {
        let directory = PassthroughDirectory;
        assert!(directory.resolve(&ActorToken("  ".to_string())).is_err());

        let actor = directory
            .resolve(&ActorToken("reviewer-9".to_string()))
            .expect("non-empty token resolves");
        assert_eq!(actor.id.0, "reviewer-9");
        assert_eq!(actor.role, ActorRole::Reviewer);
    }
}
