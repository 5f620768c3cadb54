//! Template fetching with a single re-authenticate-and-retry.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tmplsync_core::{Config, DateWindow, ExternalId, RawTemplate};

use crate::api::UpstreamApi;
use crate::credentials::{Credential, CredentialManager};
use crate::error::SourceError;
use crate::http::HttpUpstream;
use crate::mock::MockGenerator;

/// Result of one template fetch.
///
/// A degraded fetch yields no templates; it keeps the error that started the
/// failed attempt so the caller can log it.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Vec<RawTemplate>),
    Degraded(SourceError),
}

impl FetchOutcome {
    pub fn templates(&self) -> &[RawTemplate] {
        match self {
            FetchOutcome::Fetched(templates) => templates,
            FetchOutcome::Degraded(_) => &[],
        }
    }

    pub fn into_templates(self) -> Vec<RawTemplate> {
        match self {
            FetchOutcome::Fetched(templates) => templates,
            FetchOutcome::Degraded(_) => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FetchOutcome::Degraded(_))
    }
}

/// What the scheduler needs from upstream.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Templates in `window`. Never fails; see [`FetchOutcome`].
    async fn fetch_templates(&self, credential: &mut Credential, window: &DateWindow) -> FetchOutcome;

    /// The baseline of ids the downstream consumer already has. Errors
    /// propagate: an epoch cannot start without a baseline.
    async fn fetch_existing_ids(
        &self,
        credential: &mut Credential,
        window: &DateWindow,
    ) -> Result<HashSet<ExternalId>, SourceError>;
}

enum Mode {
    Live {
        api: Arc<dyn UpstreamApi>,
        credentials: Option<CredentialManager>,
    },
    Mock(MockGenerator),
}

/// The upstream client the scheduler polls.
pub struct SourceClient {
    mode: Mode,
}

impl SourceClient {
    pub fn live(api: Arc<dyn UpstreamApi>, credentials: Option<CredentialManager>) -> Self {
        Self {
            mode: Mode::Live { api, credentials },
        }
    }

    /// Synthetic records, no network, no authentication.
    pub fn mock() -> Self {
        Self {
            mode: Mode::Mock(MockGenerator::new()),
        }
    }

    /// Live HTTP client in production mode, mock generator otherwise.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        if !config.production {
            info!("local mode: serving synthetic templates");
            return Ok(Self::mock());
        }
        let api = HttpUpstream::from_config(&config.upstream)?;
        Ok(Self::live(
            Arc::new(api),
            CredentialManager::from_config(&config.upstream),
        ))
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock(_))
    }
}

/// One attempt, then on any failure one login and one retry.
async fn fetch_with_retry(
    api: &dyn UpstreamApi,
    credentials: Option<&CredentialManager>,
    credential: &mut Credential,
    window: &DateWindow,
) -> FetchOutcome {
    let first_error = match api.templates(credential.token(), window).await {
        Ok(templates) => return FetchOutcome::Fetched(templates),
        Err(e) => e,
    };
    warn!(error = %first_error, window = %window, "template fetch failed, re-authenticating");

    let Some(manager) = credentials else {
        warn!("no upstream credentials configured, skipping retry");
        return FetchOutcome::Degraded(SourceError::MissingCredentials);
    };
    if let Err(login_error) = manager.reauthenticate(api, credential).await {
        warn!(error = %login_error, "re-authentication failed, no templates this cycle");
        return FetchOutcome::Degraded(first_error);
    }

    match api.templates(credential.token(), window).await {
        Ok(templates) => {
            debug!(count = templates.len(), "template fetch succeeded after re-authentication");
            FetchOutcome::Fetched(templates)
        }
        Err(retry_error) => {
            warn!(error = %retry_error, "template fetch retry failed, no templates this cycle");
            FetchOutcome::Degraded(first_error)
        }
    }
}

#[async_trait]
impl TemplateSource for SourceClient {
    async fn fetch_templates(&self, credential: &mut Credential, window: &DateWindow) -> FetchOutcome {
        match &self.mode {
            Mode::Mock(generator) => {
                let template = generator.next_template();
                debug!(id = %template.id, minted = generator.minted(), "minted mock template");
                FetchOutcome::Fetched(vec![template])
            }
            Mode::Live { api, credentials } => {
                fetch_with_retry(api.as_ref(), credentials.as_ref(), credential, window).await
            }
        }
    }

    async fn fetch_existing_ids(
        &self,
        credential: &mut Credential,
        window: &DateWindow,
    ) -> Result<HashSet<ExternalId>, SourceError> {
        match &self.mode {
            Mode::Mock(_) => Ok(HashSet::new()),
            Mode::Live { api, .. } => {
                let ids = api.existing_ids(credential.token(), window).await?;
                Ok(ids.into_iter().collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::NaiveDate;

    fn unauthorized() -> SourceError {
        SourceError::Status {
            url: "http://upstream/templates".into(),
            status: 401,
            body: "expired".into(),
        }
    }

    fn record(id: &str) -> RawTemplate {
        serde_json::from_value(serde_json::json!({ "id": id })).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::starting(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    }

    /// Upstream whose responses are scripted per call.
    struct ScriptedApi {
        templates: Mutex<VecDeque<Result<Vec<RawTemplate>, SourceError>>>,
        login: Mutex<Option<Result<String, SourceError>>>,
        existing: Mutex<Option<Result<Vec<ExternalId>, SourceError>>>,
        tokens_seen: Mutex<Vec<Option<String>>>,
        template_calls: AtomicUsize,
        login_calls: AtomicUsize,
        existing_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(templates: Vec<Result<Vec<RawTemplate>, SourceError>>) -> Self {
            Self {
                templates: Mutex::new(templates.into()),
                login: Mutex::new(Some(Ok("fresh-token".into()))),
                existing: Mutex::new(None),
                tokens_seen: Mutex::new(Vec::new()),
                template_calls: AtomicUsize::new(0),
                login_calls: AtomicUsize::new(0),
                existing_calls: AtomicUsize::new(0),
            }
        }

        fn failing_login(self) -> Self {
            *self.login.lock().unwrap() = Some(Err(SourceError::Login("503".into())));
            self
        }

        fn existing(self, result: Result<Vec<ExternalId>, SourceError>) -> Self {
            *self.existing.lock().unwrap() = Some(result);
            self
        }
    }

    #[async_trait]
    impl UpstreamApi for ScriptedApi {
        async fn login(&self, _username: &str, _password: &str) -> Result<String, SourceError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            self.login.lock().unwrap().take().expect("login called more than once")
        }

        async fn templates(
            &self,
            token: Option<&str>,
            _window: &DateWindow,
        ) -> Result<Vec<RawTemplate>, SourceError> {
            self.template_calls.fetch_add(1, Ordering::SeqCst);
            self.tokens_seen.lock().unwrap().push(token.map(str::to_string));
            self.templates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected template call")
        }

        async fn existing_ids(
            &self,
            _token: Option<&str>,
            _window: &DateWindow,
        ) -> Result<Vec<ExternalId>, SourceError> {
            self.existing_calls.fetch_add(1, Ordering::SeqCst);
            self.existing.lock().unwrap().take().expect("unexpected existing-ids call")
        }
    }

    fn live(api: &Arc<ScriptedApi>) -> SourceClient {
        SourceClient::live(api.clone(), Some(CredentialManager::new("svc", "pw")))
    }

    #[tokio::test]
    async fn first_attempt_without_token_succeeds() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(vec![record("A")])]));
        let client = live(&api);
        let mut credential = Credential::default();

        let outcome = client.fetch_templates(&mut credential, &window()).await;

        assert_eq!(outcome.templates().len(), 1);
        assert_eq!(api.template_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
        assert_eq!(*api.tokens_seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn auth_failure_triggers_exactly_one_retry() {
        let api = Arc::new(ScriptedApi::new(vec![
            Err(unauthorized()),
            Ok(vec![record("A"), record("B")]),
        ]));
        let client = live(&api);
        let mut credential = Credential::with_token("stale-token");

        let outcome = client.fetch_templates(&mut credential, &window()).await;

        assert!(!outcome.is_degraded());
        let ids: Vec<_> = outcome.into_templates().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(api.template_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *api.tokens_seen.lock().unwrap(),
            vec![Some("stale-token".to_string()), Some("fresh-token".to_string())]
        );
        assert_eq!(credential.token(), Some("fresh-token"));
    }

    #[tokio::test]
    async fn failed_login_degrades_to_empty() {
        let api = Arc::new(ScriptedApi::new(vec![Err(unauthorized())]).failing_login());
        let client = live(&api);
        let mut credential = Credential::default();

        let outcome = client.fetch_templates(&mut credential, &window()).await;

        assert!(outcome.templates().is_empty());
        match outcome {
            FetchOutcome::Degraded(e) => assert!(e.is_auth(), "first failure is reported: {e}"),
            FetchOutcome::Fetched(_) => panic!("expected degraded outcome"),
        }
        assert_eq!(api.template_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_retry_degrades_with_first_error() {
        let api = Arc::new(ScriptedApi::new(vec![
            Err(unauthorized()),
            Err(SourceError::Decode("garbage".into())),
        ]));
        let client = live(&api);
        let mut credential = Credential::default();

        let outcome = client.fetch_templates(&mut credential, &window()).await;

        match outcome {
            FetchOutcome::Degraded(e) => assert!(e.is_auth()),
            FetchOutcome::Fetched(_) => panic!("expected degraded outcome"),
        }
        assert_eq!(api.template_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credentials_skip_retry() {
        let api = Arc::new(ScriptedApi::new(vec![Err(unauthorized())]));
        let client = SourceClient::live(api.clone(), None);
        let mut credential = Credential::default();

        let outcome = client.fetch_templates(&mut credential, &window()).await;
        assert!(matches!(outcome, FetchOutcome::Degraded(SourceError::MissingCredentials)));
        assert_eq!(api.template_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn existing_ids_are_deduplicated() {
        let api = Arc::new(
            ScriptedApi::new(vec![]).existing(Ok(vec!["A".into(), "B".into(), "A".into()])),
        );
        let client = live(&api);

        let ids = client
            .fetch_existing_ids(&mut Credential::default(), &window())
            .await
            .unwrap();

        assert_eq!(ids, HashSet::from(["A".to_string(), "B".to_string()]));
    }

    #[tokio::test]
    async fn existing_ids_failure_propagates_without_retry() {
        let api = Arc::new(ScriptedApi::new(vec![]).existing(Err(unauthorized())));
        let client = live(&api);

        let err = client
            .fetch_existing_ids(&mut Credential::default(), &window())
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(api.existing_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mock_mode_mints_one_record_per_call() {
        let client = SourceClient::mock();
        assert!(client.is_mock());
        let mut credential = Credential::default();

        let first = client.fetch_templates(&mut credential, &window()).await.into_templates();
        let second = client.fetch_templates(&mut credential, &window()).await.into_templates();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id, second[0].id);
        assert!(credential.is_empty(), "mock mode never authenticates");
        assert!(client
            .fetch_existing_ids(&mut credential, &window())
            .await
            .unwrap()
            .is_empty());
    }
}
