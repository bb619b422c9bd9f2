use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use serde::Deserialize;

use crate::{sigv4, Error, ObjectStore, Result, StoredObject};

/// Days a superseded object version is kept before the lifecycle rule
/// expires it.
pub const RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Bucket to write into; when absent, a bucket is provisioned on connect.
    pub bucket: Option<String>,
    /// Override for S3-compatible endpoints. Switches requests to
    /// path-style addressing.
    pub endpoint: Option<String>,
}

pub struct S3Store {
    client: Client,
    config: S3Config,
    bucket: String,
}

impl S3Store {
    /// Build a client, provisioning the bucket if none is configured, and
    /// verify the destination is reachable.
    pub async fn connect(config: S3Config) -> Result<Self> {
        if config.access_key_id.is_empty() || config.secret_access_key.is_empty() {
            return Err(Error::NotConfigured(
                "missing S3 credentials".to_string(),
            ));
        }

        let bucket = config.bucket.clone().unwrap_or_default();
        let mut store = Self {
            client: Client::new(),
            config,
            bucket,
        };

        if store.bucket.is_empty() {
            store.provision_bucket().await?;
        }

        store.health_check().await?;
        tracing::info!(bucket = %store.bucket, "S3 store ready");

        Ok(store)
    }

    /// Base URL for object requests, the Host header value, and the
    /// canonical path prefix (non-empty only for path-style addressing).
    fn endpoint_parts(&self) -> Result<(String, String, String)> {
        match &self.config.endpoint {
            Some(endpoint) => {
                let url = reqwest::Url::parse(endpoint)
                    .map_err(|e| Error::NotConfigured(format!("invalid S3 endpoint: {}", e)))?;
                let mut host = url
                    .host_str()
                    .ok_or_else(|| Error::NotConfigured("S3 endpoint has no host".to_string()))?
                    .to_string();
                if let Some(port) = url.port() {
                    host = format!("{}:{}", host, port);
                }

                Ok((
                    format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
                    host,
                    format!("/{}", self.bucket),
                ))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.bucket, self.config.region);
                Ok((format!("https://{}", host), host.clone(), String::new()))
            }
        }
    }

    async fn request(
        &self,
        method: Method,
        key: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
        amz_headers: &[(String, String)],
    ) -> Result<reqwest::Response> {
        let (base, host, path_prefix) = self.endpoint_parts()?;

        let path = if key.is_empty() {
            if path_prefix.is_empty() {
                "/".to_string()
            } else {
                path_prefix
            }
        } else {
            format!("{}/{}", path_prefix, key)
        };
        let canonical_uri = sigv4::uri_encode(&path, false);

        let payload = body.unwrap_or_default();
        let payload_hash = sigv4::sha256_hex(&payload);
        let query_string = sigv4::canonical_query(query);

        let ctx = sigv4::SigningContext {
            access_key_id: &self.config.access_key_id,
            secret_access_key: &self.config.secret_access_key,
            region: &self.config.region,
            service: "s3",
        };
        let signed = sigv4::sign(
            &ctx,
            method.as_str(),
            &host,
            &canonical_uri,
            &query_string,
            &payload_hash,
            amz_headers,
            Utc::now(),
        );

        let mut url = if key.is_empty() {
            base
        } else {
            format!("{}/{}", base, key)
        };
        if !query_string.is_empty() {
            url = format!("{}?{}", url, query_string);
        }

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256);
        for (name, value) in amz_headers {
            request = request.header(name, value);
        }
        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    /// Create a fresh export bucket with versioning and a lifecycle rule
    /// expiring superseded versions.
    async fn provision_bucket(&mut self) -> Result<()> {
        self.bucket = format!("taskdash-exports-{}", Utc::now().timestamp());

        // us-east-1 rejects an explicit LocationConstraint
        let create_body = if self.config.region == "us-east-1" {
            None
        } else {
            Some(
                format!(
                    "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                     <LocationConstraint>{}</LocationConstraint>\
                     </CreateBucketConfiguration>",
                    self.config.region
                )
                .into_bytes(),
            )
        };
        self.request(Method::PUT, "", &[], create_body, Some("application/xml"), &[])
            .await?;

        let versioning = "<VersioningConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                          <Status>Enabled</Status>\
                          </VersioningConfiguration>";
        self.request(
            Method::PUT,
            "",
            &[("versioning", String::new())],
            Some(versioning.as_bytes().to_vec()),
            Some("application/xml"),
            &[],
        )
        .await?;

        let lifecycle = format!(
            "<LifecycleConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Rule>\
             <ID>expire-superseded-versions</ID>\
             <Filter><Prefix>exports/</Prefix></Filter>\
             <Status>Enabled</Status>\
             <NoncurrentVersionExpiration><NoncurrentDays>{}</NoncurrentDays></NoncurrentVersionExpiration>\
             </Rule>\
             </LifecycleConfiguration>",
            RETENTION_DAYS
        );
        self.request(
            Method::PUT,
            "",
            &[("lifecycle", String::new())],
            Some(lifecycle.into_bytes()),
            Some("application/xml"),
            &[],
        )
        .await?;

        tracing::info!(bucket = %self.bucket, "Created S3 export bucket");
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        match self.endpoint_parts() {
            Ok((base, _, _)) => format!("{}/{}", base, key),
            Err(_) => key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEntry {
    key: String,
    size: u64,
    last_modified: String,
}

#[async_trait]
impl ObjectStore for S3Store {
    fn provider(&self) -> &'static str {
        "s3"
    }

    fn destination(&self) -> String {
        self.bucket.clone()
    }

    async fn upload(&self, content: &str, key: &str, content_type: &str) -> Result<()> {
        let amz_headers = vec![
            ("x-amz-meta-dashboard".to_string(), "taskdash".to_string()),
            ("x-amz-meta-export-time".to_string(), Utc::now().to_rfc3339()),
        ];

        self.request(
            Method::PUT,
            key,
            &[],
            Some(content.as_bytes().to_vec()),
            Some(content_type),
            &amz_headers,
        )
        .await?;

        tracing::info!(key, "Uploaded object to S3");
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<StoredObject>> {
        let response = self
            .request(
                Method::GET,
                "",
                &[
                    ("list-type", "2".to_string()),
                    ("max-keys", limit.to_string()),
                    ("prefix", prefix.to_string()),
                ],
                None,
                None,
                &[],
            )
            .await?;

        let text = response.text().await?;
        let parsed: ListBucketResult = quick_xml::de::from_str(&text)
            .map_err(|e| Error::BadListResponse(e.to_string()))?;

        let mut objects: Vec<StoredObject> = parsed
            .contents
            .into_iter()
            .map(|entry| StoredObject {
                url: self.object_url(&entry.key),
                key: entry.key,
                size: entry.size,
                last_modified: entry.last_modified,
            })
            .collect();

        objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(objects)
    }

    async fn health_check(&self) -> Result<()> {
        self.request(Method::HEAD, "", &[], None, None, &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(endpoint: &str) -> S3Config {
        S3Config {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            region: "us-east-1".to_string(),
            bucket: Some("test-bucket".to_string()),
            endpoint: Some(endpoint.to_string()),
        }
    }

    #[tokio::test]
    async fn test_connect_probes_bucket() {
        let mut server = mockito::Server::new_async().await;
        let head = server
            .mock("HEAD", "/test-bucket")
            .with_status(200)
            .create_async()
            .await;

        let store = S3Store::connect(test_config(&server.url())).await.unwrap();

        head.assert_async().await;
        assert_eq!(store.destination(), "test-bucket");
        assert_eq!(store.provider(), "s3");
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_credentials() {
        let config = S3Config {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: "us-east-1".to_string(),
            bucket: Some("b".to_string()),
            endpoint: None,
        };

        assert!(matches!(
            S3Store::connect(config).await,
            Err(Error::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_signed_put() {
        let mut server = mockito::Server::new_async().await;
        let _head = server
            .mock("HEAD", "/test-bucket")
            .with_status(200)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/test-bucket/exports/2024/01/02/tasks_x.csv")
            .match_header(
                "authorization",
                mockito::Matcher::Regex("^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/".to_string()),
            )
            .match_header("content-type", "text/csv")
            .with_status(200)
            .create_async()
            .await;

        let store = S3Store::connect(test_config(&server.url())).await.unwrap();
        store
            .upload("ID,Title\r\n", "exports/2024/01/02/tasks_x.csv", "text/csv")
            .await
            .unwrap();

        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        let _head = server
            .mock("HEAD", "/test-bucket")
            .with_status(200)
            .create_async()
            .await;
        let _put = server
            .mock("PUT", "/test-bucket/exports/x.json")
            .with_status(403)
            .with_body("AccessDenied")
            .create_async()
            .await;

        let store = S3Store::connect(test_config(&server.url())).await.unwrap();
        let err = store
            .upload("{}", "exports/x.json", "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>test-bucket</Name>
  <Contents>
    <Key>exports/2024/01/01/tasks_a.csv</Key>
    <LastModified>2024-01-01T10:00:00.000Z</LastModified>
    <Size>120</Size>
  </Contents>
  <Contents>
    <Key>exports/2024/01/02/tasks_b.csv</Key>
    <LastModified>2024-01-02T10:00:00.000Z</LastModified>
    <Size>240</Size>
  </Contents>
</ListBucketResult>"#;

        let mut server = mockito::Server::new_async().await;
        let _head = server
            .mock("HEAD", "/test-bucket")
            .with_status(200)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/test-bucket")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let store = S3Store::connect(test_config(&server.url())).await.unwrap();
        let objects = store.list("exports/", 10).await.unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "exports/2024/01/02/tasks_b.csv");
        assert_eq!(objects[0].size, 240);
        assert!(objects[0].url.ends_with("/test-bucket/exports/2024/01/02/tasks_b.csv"));
    }
}
