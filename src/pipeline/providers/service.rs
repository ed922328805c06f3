use super::InferenceProvider;
use crate::common::image_source::ResolvedImage;
use crate::common::labels::{sort_labels, sort_objects, DetectedObject, ScoredLabel};
use crate::error::ClassifierError;
use futures::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum ProviderRequest {
    Labels(ResolvedImage),
    Objects(ResolvedImage),
}

#[derive(Debug, Clone)]
pub enum ProviderResponse {
    Labels(Vec<ScoredLabel>),
    Objects(Vec<DetectedObject>),
}

/// Adapts an `InferenceProvider` to a tower `Service` so middleware can wrap it.
#[derive(Clone)]
pub struct ProviderService {
    inner: Arc<dyn InferenceProvider>,
}

impl ProviderService {
    pub fn new(inner: Arc<dyn InferenceProvider>) -> Self {
        Self { inner }
    }
}

impl Service<ProviderRequest> for ProviderService {
    type Response = ProviderResponse;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ProviderRequest) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let response = match req {
                ProviderRequest::Labels(image) => {
                    ProviderResponse::Labels(inner.classify_labels(&image).await?)
                }
                ProviderRequest::Objects(image) => {
                    ProviderResponse::Objects(inner.detect_objects(&image).await?)
                }
            };
            Ok::<_, BoxError>(response)
        })
    }
}

pub struct ProviderHandleBuilder {
    provider: Arc<dyn InferenceProvider>,
    timeout: Option<Duration>,
}

impl ProviderHandleBuilder {
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ProviderHandle {
        let name: Arc<str> = Arc::from(self.provider.name());
        let service = ServiceBuilder::new()
            .option_layer(self.timeout.map(TimeoutLayer::new))
            .service(ProviderService::new(self.provider));

        ProviderHandle {
            name,
            timeout: self.timeout,
            service: BoxCloneSyncService::new(service),
        }
    }
}

/// A provider behind its middleware stack. Every call is bounded by the
/// configured timeout; a timeout surfaces as `ProviderUnavailable`.
#[derive(Clone)]
pub struct ProviderHandle {
    name: Arc<str>,
    timeout: Option<Duration>,
    service: BoxCloneSyncService<ProviderRequest, ProviderResponse, BoxError>,
}

impl ProviderHandle {
    pub fn builder(provider: Arc<dyn InferenceProvider>) -> ProviderHandleBuilder {
        ProviderHandleBuilder::new(provider)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels sorted by descending score.
    pub async fn labels(&self, image: &ResolvedImage) -> Result<Vec<ScoredLabel>, ClassifierError> {
        match self.call(ProviderRequest::Labels(image.clone())).await? {
            ProviderResponse::Labels(mut labels) => {
                self.check_scores(labels.iter().map(|l| (l.label.as_str(), l.score)))?;
                sort_labels(&mut labels);
                debug!(provider = %self.name, count = labels.len(), "Labels received");
                Ok(labels)
            }
            ProviderResponse::Objects(_) => Err(ClassifierError::malformed(
                self.name.as_ref(),
                "object detections returned for a label request",
            )),
        }
    }

    /// Detections sorted by descending score.
    pub async fn objects(
        &self,
        image: &ResolvedImage,
    ) -> Result<Vec<DetectedObject>, ClassifierError> {
        match self.call(ProviderRequest::Objects(image.clone())).await? {
            ProviderResponse::Objects(mut objects) => {
                self.check_scores(objects.iter().map(|o| (o.label.as_str(), o.score)))?;
                sort_objects(&mut objects);
                debug!(provider = %self.name, count = objects.len(), "Objects received");
                Ok(objects)
            }
            ProviderResponse::Labels(_) => Err(ClassifierError::malformed(
                self.name.as_ref(),
                "labels returned for a detection request",
            )),
        }
    }

    async fn call(&self, req: ProviderRequest) -> Result<ProviderResponse, ClassifierError> {
        self.service
            .clone()
            .oneshot(req)
            .await
            .map_err(|e| self.map_error(e))
    }

    fn map_error(&self, err: BoxError) -> ClassifierError {
        if err.is::<Elapsed>() {
            let reason = match self.timeout {
                Some(t) => format!("timed out after {}ms", t.as_millis()),
                None => "timed out".to_string(),
            };
            return ClassifierError::unavailable(self.name.as_ref(), reason);
        }
        match err.downcast::<ClassifierError>() {
            Ok(e) => *e,
            Err(other) => ClassifierError::unavailable(self.name.as_ref(), other.to_string()),
        }
    }

    fn check_scores<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a str, f32)>,
    ) -> Result<(), ClassifierError> {
        for (label, score) in entries {
            if label.trim().is_empty() {
                return Err(ClassifierError::malformed(self.name.as_ref(), "empty label"));
            }
            if !score.is_finite() {
                return Err(ClassifierError::malformed(
                    self.name.as_ref(),
                    format!("non-finite score for '{}'", label),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
