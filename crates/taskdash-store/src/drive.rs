use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{Error, ObjectStore, Result, StoredObject};

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Service-account key JSON, as issued by the provider console.
    pub service_account_key: String,
    /// Folder to write into; when absent, a folder is provisioned on
    /// connect.
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    scope: &'static str,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct DriveStore {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    folder_id: String,
    token: RwLock<Option<CachedToken>>,
}

impl DriveStore {
    /// Build a client from a service-account key, provisioning the export
    /// folder if none is configured, and verify the API is reachable.
    pub async fn connect(config: DriveConfig) -> Result<Self> {
        if config.service_account_key.is_empty() {
            return Err(Error::NotConfigured(
                "missing service account key".to_string(),
            ));
        }

        let key: ServiceAccountKey = serde_json::from_str(&config.service_account_key)
            .map_err(|e| Error::Auth(format!("invalid service account key: {}", e)))?;

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::Auth(format!("invalid private key: {}", e)))?;

        let mut store = Self {
            client: Client::new(),
            key,
            encoding_key,
            folder_id: config.folder_id.unwrap_or_default(),
            token: RwLock::new(None),
        };

        if store.folder_id.is_empty() {
            store.folder_id = store.provision_folder().await?;
        }

        store.health_check().await?;
        tracing::info!(folder = %store.folder_id, "Drive store ready");

        Ok(store)
    }

    /// Bearer token for API calls, exchanged from a signed assertion and
    /// cached until shortly before expiry.
    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(token.value.clone());
                }
            }
        }

        let now = Utc::now();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: SCOPE,
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Auth(format!("failed to sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token exchange failed ({}): {}",
                status,
                message.chars().take(200).collect::<String>()
            )));
        }

        let token: TokenResponse = response.json().await?;
        let cached = CachedToken {
            value: token.access_token.clone(),
            expires_at: now + Duration::seconds(token.expires_in),
        };
        *self.token.write().await = Some(cached);

        Ok(token.access_token)
    }

    async fn provision_folder(&self) -> Result<String> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}/files?fields=id", API_BASE))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "name": "Taskdash Exports",
                "mimeType": "application/vnd.google-apps.folder",
            }))
            .send()
            .await?;

        let response = check(response).await?;

        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = response.json().await?;

        tracing::info!(folder = %created.id, "Created Drive export folder");
        Ok(created.id)
    }
}

/// multipart/related body for a metadata + content upload.
fn build_multipart(boundary: &str, metadata: &str, content: &str, content_type: &str) -> String {
    format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n\
         --{b}\r\nContent-Type: {ct}\r\n\r\n{content}\r\n--{b}--",
        b = boundary,
        meta = metadata,
        ct = content_type,
        content = content,
    )
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(Error::Provider {
        status: status.as_u16(),
        message: message.chars().take(200).collect(),
    })
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
    #[serde(default)]
    web_view_link: Option<String>,
}

#[async_trait]
impl ObjectStore for DriveStore {
    fn provider(&self) -> &'static str {
        "drive"
    }

    fn destination(&self) -> String {
        self.folder_id.clone()
    }

    async fn upload(&self, content: &str, key: &str, content_type: &str) -> Result<()> {
        let token = self.access_token().await?;

        let boundary = format!("taskdash-{}", uuid::Uuid::new_v4());
        let metadata = serde_json::json!({
            "name": key,
            "parents": [self.folder_id],
        })
        .to_string();
        let body = build_multipart(&boundary, &metadata, content, content_type);

        let response = self
            .client
            .post(format!("{}?uploadType=multipart&fields=id,name", UPLOAD_URL))
            .bearer_auth(&token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        check(response).await?;
        tracing::info!(key, "Uploaded object to Drive");
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<StoredObject>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}/files", API_BASE))
            .bearer_auth(&token)
            .query(&[
                (
                    "q",
                    format!("'{}' in parents and trashed = false", self.folder_id),
                ),
                ("orderBy", "modifiedTime desc".to_string()),
                ("pageSize", limit.to_string()),
                (
                    "fields",
                    "files(id,name,size,modifiedTime,webViewLink)".to_string(),
                ),
            ])
            .send()
            .await?;

        let response = check(response).await?;
        let parsed: FileList = response.json().await?;

        let objects = parsed
            .files
            .into_iter()
            .filter(|file| file.name.starts_with(prefix))
            .map(|file| StoredObject {
                url: file.web_view_link.unwrap_or_else(|| {
                    format!("https://drive.google.com/file/d/{}/view", file.id)
                }),
                key: file.name,
                size: file
                    .size
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                last_modified: file.modified_time.unwrap_or_default(),
            })
            .collect();

        Ok(objects)
    }

    async fn health_check(&self) -> Result<()> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}/about?fields=user", API_BASE))
            .bearer_auth(&token)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_key() {
        let err = serde_json::from_str::<ServiceAccountKey>("{\"client_email\": \"a@b\"}");
        assert!(err.is_err());
    }

    #[test]
    fn test_multipart_layout() {
        let body = build_multipart("B", "{\"name\":\"f.csv\"}", "ID,Title\r\n", "text/csv");

        assert!(body.starts_with("--B\r\nContent-Type: application/json"));
        assert!(body.contains("\r\n--B\r\nContent-Type: text/csv\r\n\r\nID,Title\r\n"));
        assert!(body.ends_with("--B--"));
    }
}
