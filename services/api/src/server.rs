use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use talentgate::config::{
    AppConfig, ClassifierConfig, ConfigError, ScoringServiceConfig, SignatureConfig,
};
use talentgate::telemetry::{self, TelemetryError};
use talentgate::workflows::letters::{HttpSignatureProvider, LetterService, SignatureProvider};
use talentgate::workflows::promo::{BillingService, PromoService};
use talentgate::workflows::reconcile::{
    ExternalScoringClient, HttpScoringClient, ReconcileService,
};
use talentgate::workflows::scoring::{
    DocumentClassifier, EvidenceService, HttpClassifier, ScoringEngine, TieredClassifier,
};

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryActivityLog, InMemoryCandidateRepository, InMemoryEvidenceRepository,
    InMemoryLetterRepository, InMemoryNotifier, InMemoryPromoRepository,
    InMemorySessionRepository, InMemorySubscriptionRepository, KeywordClassifier,
    SimulatedPaymentProvider, SimulatedScoringClient, SimulatedSignatureProvider,
};
use crate::routes::{with_app_routes, Services};

/// Failures raised while bringing the process up or running a CLI command,
/// distinct from the request-level error taxonomy.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Workflow(talentgate::error::AppError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(err) => write!(f, "configuration error: {}", err),
            StartupError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            StartupError::Io(err) => write!(f, "io error: {}", err),
            StartupError::Workflow(err) => write!(f, "workflow error: {}", err),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Config(err) => Some(err),
            StartupError::Telemetry(err) => Some(err),
            StartupError::Io(err) => Some(err),
            StartupError::Workflow(err) => Some(err),
        }
    }
}

impl From<talentgate::error::AppError> for StartupError {
    fn from(value: talentgate::error::AppError) -> Self {
        Self::Workflow(value)
    }
}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for StartupError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for StartupError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Pick the configured classification stack: primary + fallback provider
/// when endpoints are present, the offline keyword classifier otherwise.
fn classifier(config: &ClassifierConfig) -> Arc<dyn DocumentClassifier> {
    match (&config.endpoint, &config.api_key) {
        (Some(endpoint), Some(api_key)) => match &config.fallback_endpoint {
            Some(fallback) => Arc::new(TieredClassifier::new(
                HttpClassifier::new(endpoint, api_key),
                HttpClassifier::new(fallback, api_key),
            )),
            None => Arc::new(HttpClassifier::new(endpoint, api_key)),
        },
        _ => Arc::new(KeywordClassifier),
    }
}

fn signature_provider(config: &SignatureConfig) -> Arc<dyn SignatureProvider> {
    match (&config.endpoint, &config.api_key) {
        (Some(endpoint), Some(api_key)) => {
            Arc::new(HttpSignatureProvider::new(endpoint, api_key))
        }
        _ => Arc::new(SimulatedSignatureProvider),
    }
}

fn scoring_client(config: &ScoringServiceConfig) -> Arc<dyn ExternalScoringClient> {
    match (&config.endpoint, &config.api_key) {
        (Some(endpoint), Some(api_key)) => Arc::new(HttpScoringClient::new(endpoint, api_key)),
        _ => Arc::new(SimulatedScoringClient),
    }
}

pub(crate) fn build_services(
    classifier_config: &ClassifierConfig,
    signature_config: &SignatureConfig,
    scoring_config: &ScoringServiceConfig,
) -> Services {
    let candidates = Arc::new(InMemoryCandidateRepository::default());
    let evidence_store = Arc::new(InMemoryEvidenceRepository::default());
    let letters_store = Arc::new(InMemoryLetterRepository::default());
    let sessions = Arc::new(InMemorySessionRepository::default());
    let promos_store = Arc::new(InMemoryPromoRepository::default());
    let subscriptions = Arc::new(InMemorySubscriptionRepository::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    let activity = Arc::new(InMemoryActivityLog::default());

    let evidence = Arc::new(EvidenceService::new(
        candidates.clone(),
        evidence_store,
        activity.clone(),
        classifier(classifier_config),
        ScoringEngine::default(),
    ));
    let letters = Arc::new(LetterService::new(
        letters_store,
        candidates.clone(),
        notifier,
        activity,
        signature_provider(signature_config),
        signature_config.webhook_secret.clone(),
    ));
    let reconcile = Arc::new(ReconcileService::new(
        sessions,
        candidates,
        scoring_client(scoring_config),
        Duration::from_millis(scoring_config.poll_pause_ms),
    ));
    let promos = Arc::new(PromoService::new(
        promos_store,
        Arc::new(SimulatedPaymentProvider),
    ));
    let billing = Arc::new(BillingService::new(
        subscriptions,
        Arc::new(SimulatedPaymentProvider),
    ));

    Services {
        evidence,
        letters,
        reconcile,
        promos,
        billing,
    }
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), StartupError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = build_services(&config.classifier, &config.signature, &config.scoring_service);

    let app = with_app_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
