use crate::{
    clients::{build_http_client, transport_error, ImageService},
    config::ReplicateConfig,
    error::{ClientError, ConfigError, Result},
    models::{ImageRequest, Prediction, PredictionBody, PredictionStatus},
};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;

/// Text-to-image client for the Replicate predictions API.
#[derive(Clone)]
pub struct ReplicateImageClient {
    http: reqwest::Client,
    api_token: String,
    model: String,
    base_url: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl ReplicateImageClient {
    /// Returns `Ok(None)` when no token is configured: the backend is then unavailable.
    pub fn from_config(config: &ReplicateConfig) -> Result<Option<Self>, ConfigError> {
        let api_token = match config.api_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => return Ok(None),
        };

        Ok(Some(Self {
            http: build_http_client(config.timeout)?,
            api_token,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `owner/name:version` goes to the generic endpoint with a pinned version,
    /// `owner/name` to the model's own predictions endpoint.
    fn prediction_endpoint(&self) -> (String, Option<&str>) {
        match self.model.split_once(':') {
            Some((_, version)) => (format!("{}/predictions", self.base_url), Some(version)),
            None => (
                format!("{}/models/{}/predictions", self.base_url, self.model),
                None,
            ),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Prediction> {
        let response = builder
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn run(&self, request: &ImageRequest) -> Result<Vec<String>> {
        let (url, version) = self.prediction_endpoint();
        let body = PredictionBody {
            version,
            input: request,
        };

        log::debug!("Creating prediction on {}", url);
        let mut prediction = self
            .send(self.http.post(&url).header("Prefer", "wait").json(&body))
            .await?;

        while !prediction.status.is_terminal() {
            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|urls| urls.get.clone())
                .ok_or_else(|| ClientError::Decode("prediction has no poll URL".into()))?;

            log::debug!(
                "Prediction {} is {}, polling again",
                prediction.id,
                prediction.status.as_str()
            );
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.send(self.http.get(&poll_url)).await?;
        }

        prediction_output(prediction)
    }
}

#[async_trait]
impl ImageService for ReplicateImageClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>> {
        log::info!("Generating image with model: {}", self.model);

        match tokio::time::timeout(self.timeout, self.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.timeout.as_secs())),
        }
    }
}

fn prediction_output(prediction: Prediction) -> Result<Vec<String>> {
    match prediction.status {
        PredictionStatus::Succeeded => output_urls(prediction.output),
        status => Err(ClientError::PredictionFailed {
            status: status.as_str().to_string(),
            message: match prediction.error {
                Some(Value::String(msg)) => msg,
                Some(other) => other.to_string(),
                None => "no error detail".to_string(),
            },
        }),
    }
}

/// Models return either a single URL or a list of them.
fn output_urls(output: Option<Value>) -> Result<Vec<String>> {
    let urls: Vec<String> = match output {
        Some(Value::String(url)) => vec![url],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(url) => Some(url),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if urls.is_empty() {
        return Err(ClientError::EmptyResponse("prediction returned no images".into()));
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_for(model: &str) -> ReplicateImageClient {
        ReplicateImageClient::from_config(
            &ReplicateConfig::new()
                .with_api_token("r8_test")
                .with_model(model),
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_missing_token_means_no_backend() {
        assert!(ReplicateImageClient::from_config(&ReplicateConfig::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_versioned_model_uses_generic_endpoint() {
        let client = client_for("stability-ai/sdxl:39ed52f2");
        let (url, version) = client.prediction_endpoint();
        assert_eq!(url, "https://api.replicate.com/v1/predictions");
        assert_eq!(version, Some("39ed52f2"));
    }

    #[test]
    fn test_unversioned_model_uses_model_endpoint() {
        let client = client_for("black-forest-labs/flux-schnell");
        let (url, version) = client.prediction_endpoint();
        assert_eq!(
            url,
            "https://api.replicate.com/v1/models/black-forest-labs/flux-schnell/predictions"
        );
        assert_eq!(version, None);
    }

    #[test]
    fn test_output_urls_accepts_string_or_list() {
        assert_eq!(
            output_urls(Some(json!(["https://a/1.png", "https://a/2.png"]))).unwrap(),
            vec!["https://a/1.png", "https://a/2.png"]
        );
        assert_eq!(
            output_urls(Some(json!("https://a/1.webp"))).unwrap(),
            vec!["https://a/1.webp"]
        );
        assert!(matches!(
            output_urls(Some(json!([]))),
            Err(ClientError::EmptyResponse(_))
        ));
        assert!(output_urls(None).is_err());
    }

    #[test]
    fn test_failed_prediction_carries_error_text() {
        let prediction: Prediction = serde_json::from_value(json!({
            "id": "abc",
            "status": "failed",
            "error": "NSFW content detected"
        }))
        .unwrap();
        match prediction_output(prediction) {
            Err(ClientError::PredictionFailed { status, message }) => {
                assert_eq!(status, "failed");
                assert_eq!(message, "NSFW content detected");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    mod against_mock_server {
        use super::*;
        use crate::models::ImagePreset;
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client(server: &MockServer, model: &str, timeout: Duration) -> ReplicateImageClient {
            ReplicateImageClient::from_config(
                &ReplicateConfig::new()
                    .with_api_token("r8_test")
                    .with_model(model)
                    .with_base_url(server.uri())
                    .with_timeout(timeout)
                    .with_poll_interval(Duration::from_millis(10)),
            )
            .unwrap()
            .unwrap()
        }

        fn request() -> ImageRequest {
            ImageRequest {
                prompt: "A photo of tomato soup".into(),
                params: ImagePreset::HighDetail.params(),
            }
        }

        #[tokio::test]
        async fn test_polls_until_prediction_succeeds() {
            let server = MockServer::start().await;
            let poll_url = format!("{}/predictions/p1", server.uri());

            Mock::given(method("POST"))
                .and(path("/predictions"))
                .and(header("authorization", "Bearer r8_test"))
                .and(header("prefer", "wait"))
                .and(body_partial_json(json!({
                    "version": "39ed52f2",
                    "input": {"prompt": "A photo of tomato soup", "width": 1024}
                })))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": "p1",
                    "status": "processing",
                    "urls": {"get": poll_url}
                })))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("GET"))
                .and(path("/predictions/p1"))
                .and(header("authorization", "Bearer r8_test"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "id": "p1",
                    "status": "succeeded",
                    "output": ["https://replicate.delivery/p1/out-0.png"]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let urls = client(&server, "stability-ai/sdxl:39ed52f2", Duration::from_secs(5))
                .generate(&request())
                .await
                .unwrap();
            assert_eq!(urls, vec!["https://replicate.delivery/p1/out-0.png"]);
        }

        #[tokio::test]
        async fn test_unversioned_model_posts_to_model_endpoint() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/models/black-forest-labs/flux-schnell/predictions"))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": "p2",
                    "status": "succeeded",
                    "output": "https://replicate.delivery/p2/out.webp"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let urls = client(&server, "black-forest-labs/flux-schnell", Duration::from_secs(5))
                .generate(&request())
                .await
                .unwrap();
            assert_eq!(urls, vec!["https://replicate.delivery/p2/out.webp"]);
        }

        #[tokio::test]
        async fn test_failed_prediction_is_reported() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/predictions"))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": "p3",
                    "status": "failed",
                    "error": "NSFW content detected"
                })))
                .mount(&server)
                .await;

            let err = client(&server, "stability-ai/sdxl:39ed52f2", Duration::from_secs(5))
                .generate(&request())
                .await
                .unwrap_err();
            match err {
                ClientError::PredictionFailed { status, message } => {
                    assert_eq!(status, "failed");
                    assert_eq!(message, "NSFW content detected");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_pending_prediction_without_poll_url() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/predictions"))
                .respond_with(
                    ResponseTemplate::new(201)
                        .set_body_json(json!({"id": "p4", "status": "starting"})),
                )
                .mount(&server)
                .await;

            let err = client(&server, "stability-ai/sdxl:39ed52f2", Duration::from_secs(5))
                .generate(&request())
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Decode(_)), "got {:?}", err);
        }

        #[tokio::test]
        async fn test_stalled_prediction_times_out() {
            let server = MockServer::start().await;
            let poll_url = format!("{}/predictions/p5", server.uri());

            Mock::given(method("POST"))
                .and(path("/predictions"))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": "p5",
                    "status": "processing",
                    "urls": {"get": poll_url}
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/predictions/p5"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "id": "p5",
                    "status": "processing",
                    "urls": {"get": poll_url}
                })))
                .mount(&server)
                .await;

            let err = client(&server, "stability-ai/sdxl:39ed52f2", Duration::from_millis(300))
                .generate(&request())
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Timeout(_)), "got {:?}", err);
        }

        #[tokio::test]
        async fn test_rejected_prediction_maps_status() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/predictions"))
                .respond_with(
                    ResponseTemplate::new(422).set_body_string(r#"{"detail":"Invalid version"}"#),
                )
                .mount(&server)
                .await;

            let err = client(&server, "stability-ai/sdxl:39ed52f2", Duration::from_secs(5))
                .generate(&request())
                .await
                .unwrap_err();
            match err {
                ClientError::Status { status, message } => {
                    assert_eq!(status, 422);
                    assert!(message.contains("Invalid version"));
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }
}
