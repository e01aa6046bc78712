//! Object storage: bucket + path addressing.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::client::{read_json, BackendClient};
use super::error::ClientError;

pub struct StorageClient {
    client: BackendClient,
}

impl StorageClient {
    pub(crate) fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn from(&self, bucket: &str) -> BucketApi {
        BucketApi {
            client: self.client.clone(),
            bucket: bucket.to_string(),
        }
    }
}

/// Headers sent with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    pub content_type: Option<String>,
    /// Seconds, sent as `cache-control: max-age=<n>`.
    pub cache_control: String,
    pub upsert: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    /// Path relative to the bucket.
    pub path: String,
    pub id: Option<String>,
    /// `<bucket>/<path>`
    pub full_path: String,
}

/// Object metadata as listed or removed by the storage service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

pub struct BucketApi {
    client: BackendClient,
    bucket: String,
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl BucketApi {
    fn object_url(&self, kind: &str, path: &str) -> url::Url {
        let object = match kind {
            "" => format!("storage/v1/object/{}/{}", self.bucket, encode_path(path)),
            kind => format!(
                "storage/v1/object/{}/{}/{}",
                kind,
                self.bucket,
                encode_path(path)
            ),
        };
        self.client.endpoint(&object)
    }

    pub async fn upload(
        &self,
        path: &str,
        file: Vec<u8>,
        options: &FileOptions,
    ) -> Result<UploadedObject, ClientError> {
        #[derive(Deserialize)]
        struct UploadResponse {
            #[serde(rename = "Id", alias = "id", default)]
            id: Option<String>,
            #[serde(rename = "Key", alias = "key")]
            key: String,
        }

        let mut request = self
            .client
            .http()
            .post(self.object_url("", path))
            .header("cache-control", format!("max-age={}", options.cache_control))
            .header("x-upsert", options.upsert.to_string())
            .body(file);
        if let Some(content_type) = &options.content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let response: UploadResponse = read_json(self.client.authorize(request).await).await?;
        tracing::debug!("Uploaded {} to bucket {}", path, self.bucket);

        Ok(UploadedObject {
            path: path.trim_start_matches('/').to_string(),
            id: response.id,
            full_path: response.key,
        })
    }

    /// URL of an object in a public bucket. Does not check the object exists.
    pub fn public_url(&self, path: &str) -> String {
        self.object_url("public", path).to_string()
    }

    /// Time-limited URL for `path`, valid for `expires_in` seconds.
    pub async fn create_signed_url(&self, path: &str, expires_in: u64) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct SignResponse {
            #[serde(rename = "signedURL")]
            signed_url: String,
        }

        let request = self
            .client
            .http()
            .post(self.object_url("sign", path))
            .json(&json!({ "expiresIn": expires_in }));

        let response: SignResponse = read_json(self.client.authorize(request).await).await?;
        Ok(self
            .client
            .endpoint(&format!("storage/v1{}", response.signed_url))
            .to_string())
    }

    pub async fn remove(&self, paths: &[String]) -> Result<Vec<FileObject>, ClientError> {
        let request = self
            .client
            .http()
            .delete(self.client.endpoint(&format!("storage/v1/object/{}", self.bucket)))
            .json(&json!({ "prefixes": paths }));

        read_json(self.client.authorize(request).await).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::PublicConfig;

    fn bucket() -> BucketApi {
        let client = BackendClient::public(&PublicConfig {
            url: url::Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: "anon".to_string(),
        });
        client.storage().from("media")
    }

    #[test]
    fn test_public_url_is_deterministic() {
        let bucket = bucket();
        let url = bucket.public_url("projects/cover image.png");
        assert_eq!(
            url,
            "https://abc.supabase.co/storage/v1/object/public/media/projects/cover%20image.png"
        );
        assert_eq!(url, bucket.public_url("/projects/cover image.png"));
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("a/b c/d?.png"), "a/b%20c/d%3F.png");
    }
}
