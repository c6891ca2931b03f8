//! Asset upload.
//!
//! Media segments reference hosted URLs. Local files are uploaded first
//! through `POST {api_base}/asset/create`; the platform answers with
//! `{code, message, data: {url}}`.

use std::path::Path;

use async_trait::async_trait;
use kaiheila_core::{ApiError, ApiResult};
use reqwest::{Client, ClientBuilder, multipart};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::config::{BotConfig, KaiheilaConfig};

/// Uploads binary assets and returns the hosted URL.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Uploads `bytes` under `file_name`.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<String>;

    /// Reads a local file and uploads it under its file name.
    async fn upload_path(&self, path: &Path) -> ApiResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file");
        self.upload(file_name, bytes).await
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// [`AssetUploader`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpAssetUploader {
    client: Client,
    api_base: String,
    token: String,
}

impl HttpAssetUploader {
    /// Builds an uploader for `bot`, with the configured base URL and timeout.
    pub fn new(config: &KaiheilaConfig, bot: &BotConfig) -> ApiResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.upload_timeout())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self::with_client(client, &config.api_base, &bot.token))
    }

    /// Builds an uploader around an existing client.
    pub fn with_client(client: Client, api_base: &str, token: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/asset/create", self.api_base)
    }
}

#[async_trait]
impl AssetUploader for HttpAssetUploader {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<String> {
        let url = self.endpoint();
        debug!(url = %url, file_name = %file_name, size = bytes.len(), "Uploading asset");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        trace!(status = status.as_u16(), body = %text, "Asset upload response");

        let response: UploadResponse = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Network(format!(
                    "HTTP {} error: {}",
                    status.as_u16(),
                    text
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if response.code != 0 {
            warn!(code = response.code, message = %response.message, "Asset upload failed");
            let detail = match response.data {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            return Err(ApiError::ActionFailed {
                code: response.code,
                message: response.message,
                detail,
            });
        }

        response
            .data
            .get("url")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or(ApiError::MissingField("url"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn server_with(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/asset/create"))
            .and(header("Authorization", "Bot t-1"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    fn uploader(server: &MockServer) -> HttpAssetUploader {
        HttpAssetUploader::with_client(Client::new(), &format!("{}/", server.uri()), "t-1")
    }

    #[tokio::test]
    async fn test_upload_returns_url() {
        let server = server_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "操作成功",
            "data": {"url": "https://img.kaiheila.cn/assets/a.png"}
        })))
        .await;

        let url = uploader(&server)
            .upload("a.png", b"png".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "https://img.kaiheila.cn/assets/a.png");
    }

    #[tokio::test]
    async fn test_non_zero_code_is_action_failed() {
        let server = server_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 40000,
            "message": "file too large",
            "data": {"limit": 1024}
        })))
        .await;

        match uploader(&server).upload("a.png", vec![0; 8]).await {
            Err(ApiError::ActionFailed {
                code,
                message,
                detail,
            }) => {
                assert_eq!(code, 40000);
                assert_eq!(message, "file too large");
                assert_eq!(detail.get("limit"), Some(&json!(1024)));
            }
            other => panic!("expected action failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_url() {
        let server =
            server_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
                .await;
        assert!(matches!(
            uploader(&server).upload("a.png", vec![1]).await,
            Err(ApiError::MissingField("url"))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = server_with(ResponseTemplate::new(200).set_body_string("<html>")).await;
        assert!(matches!(
            uploader(&server).upload("a.png", vec![1]).await,
            Err(ApiError::Serialization(_))
        ));

        let server = server_with(ResponseTemplate::new(502).set_body_string("bad gateway")).await;
        assert!(matches!(
            uploader(&server).upload("a.png", vec![1]).await,
            Err(ApiError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_path() {
        let server = server_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "",
            "data": {"url": "https://img.kaiheila.cn/assets/b.txt"}
        })))
        .await;

        let file = std::env::temp_dir().join(format!("kaiheila-upload-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&file, b"hello").await.unwrap();
        let url = uploader(&server).upload_path(&file).await;
        tokio::fs::remove_file(&file).await.unwrap();
        assert_eq!(url.unwrap(), "https://img.kaiheila.cn/assets/b.txt");

        let missing = std::env::temp_dir().join("kaiheila-upload-missing.bin");
        assert!(matches!(
            uploader(&server).upload_path(&missing).await,
            Err(ApiError::Io(_))
        ));
    }

    #[test]
    fn test_new_from_config() {
        let config = KaiheilaConfig::default();
        let bot = BotConfig {
            client_id: "c".into(),
            token: "t".into(),
            client_secret: None,
        };
        let uploader = HttpAssetUploader::new(&config, &bot).unwrap();
        assert_eq!(
            uploader.endpoint(),
            "https://www.kaiheila.cn/api/v3/asset/create"
        );
    }
}
