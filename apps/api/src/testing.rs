//! In-memory collaborators for tests. Generator replies are scripted per call
//! and can be held back with a oneshot gate to reproduce interleavings.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::generation::generator::{
    ArtifactFetch, ArtifactHandle, FieldRegenerationRequest, GenerateCvRequest, GeneratedCv,
    GenerationError, ProfileGenerator, TailorRequest,
};
use crate::identity::{IdentityError, IdentityProvider, SessionCredential};
use crate::models::source::ImportedProfile;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

type Outcome<T> = Result<T, GenerationError>;

enum Reply<T> {
    Ready(Outcome<T>),
    Gated(oneshot::Receiver<Outcome<T>>),
    Never,
}

struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Script<T> {
    fn push(&self, reply: Reply<T>) {
        self.replies.lock().push_back(reply);
    }

    fn gate(&self) -> oneshot::Sender<Outcome<T>> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Gated(rx));
        tx
    }

    async fn next(&self) -> Outcome<T> {
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Ready(outcome)) => outcome,
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(GenerationError::Transport("gate dropped".into()))),
            Some(Reply::Never) => std::future::pending().await,
            None => Err(GenerationError::Remote("no scripted reply".into())),
        }
    }
}

#[derive(Default)]
pub struct ScriptedGenerator {
    regenerations: Script<Value>,
    tailorings: Script<Value>,
    generations: Script<GeneratedCv>,
    artifacts: Mutex<HashMap<String, Bytes>>,
    regeneration_requests: Mutex<Vec<FieldRegenerationRequest>>,
    tailor_requests: Mutex<Vec<TailorRequest>>,
    generate_requests: Mutex<Vec<GenerateCvRequest>>,
}

impl ScriptedGenerator {
    pub fn reply_regeneration(&self, outcome: Outcome<Value>) {
        self.regenerations.push(Reply::Ready(outcome));
    }

    pub fn gate_regeneration(&self) -> oneshot::Sender<Outcome<Value>> {
        self.regenerations.gate()
    }

    pub fn hang_regeneration(&self) {
        self.regenerations.push(Reply::Never);
    }

    pub fn regeneration_requests(&self) -> Vec<FieldRegenerationRequest> {
        self.regeneration_requests.lock().clone()
    }

    pub fn reply_tailor(&self, outcome: Outcome<Value>) {
        self.tailorings.push(Reply::Ready(outcome));
    }

    pub fn gate_tailor(&self) -> oneshot::Sender<Outcome<Value>> {
        self.tailorings.gate()
    }

    pub fn hang_tailor(&self) {
        self.tailorings.push(Reply::Never);
    }

    pub fn tailor_requests(&self) -> Vec<TailorRequest> {
        self.tailor_requests.lock().clone()
    }

    pub fn reply_generate(&self, outcome: Outcome<GeneratedCv>) {
        self.generations.push(Reply::Ready(outcome));
    }

    pub fn generate_requests(&self) -> Vec<GenerateCvRequest> {
        self.generate_requests.lock().clone()
    }

    pub fn publish_artifact(&self, handle: &ArtifactHandle, body: &'static [u8]) {
        self.artifacts
            .lock()
            .insert(handle.0.clone(), Bytes::from_static(body));
    }
}

#[async_trait]
impl ProfileGenerator for ScriptedGenerator {
    fn backend(&self) -> &'static str {
        "scripted"
    }

    async fn regenerate_field(
        &self,
        request: &FieldRegenerationRequest,
    ) -> Result<Value, GenerationError> {
        self.regeneration_requests.lock().push(request.clone());
        self.regenerations.next().await
    }

    async fn tailor(&self, request: &TailorRequest) -> Result<Value, GenerationError> {
        self.tailor_requests.lock().push(request.clone());
        self.tailorings.next().await
    }

    async fn generate_cv(
        &self,
        request: &GenerateCvRequest,
    ) -> Result<GeneratedCv, GenerationError> {
        self.generate_requests.lock().push(request.clone());
        self.generations.next().await
    }

    async fn fetch_artifact(
        &self,
        handle: Option<&ArtifactHandle>,
    ) -> Result<ArtifactFetch, GenerationError> {
        let stored = handle.and_then(|h| self.artifacts.lock().get(&h.0).cloned());
        Ok(stored.map_or(ArtifactFetch::NotGenerated, ArtifactFetch::Ready))
    }
}

/// Identity service that knows exactly one logged-in credential.
#[derive(Default)]
pub struct StaticIdentity {
    credential: String,
    profile: Option<ImportedProfile>,
    logouts: AtomicUsize,
}

impl StaticIdentity {
    pub fn logged_in(credential: &str, profile: ImportedProfile) -> Self {
        Self {
            credential: credential.to_string(),
            profile: Some(profile),
            logouts: AtomicUsize::new(0),
        }
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn fetch_profile(
        &self,
        credential: &SessionCredential,
    ) -> Result<Option<ImportedProfile>, IdentityError> {
        if credential.as_str() == self.credential {
            Ok(self.profile.clone())
        } else {
            Ok(None)
        }
    }

    async fn logout(&self, _credential: &SessionCredential) -> Result<(), IdentityError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
