//! Storage helpers with the same result wrapping as table queries.

use crate::domain::OperationResult;
use crate::services::query::run_query;
use crate::supabase::{BackendClient, ClientError, FileOptions, UploadedObject};

pub const DEFAULT_CACHE_CONTROL: &str = "3600";
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// What to store and where.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub bucket: String,
    pub path: String,
    pub file: Vec<u8>,
    pub content_type: Option<String>,
    pub cache_control: String,
    pub upsert: bool,
}

impl UploadOptions {
    /// Cache for an hour and never overwrite unless asked to.
    pub fn new(bucket: impl Into<String>, path: impl Into<String>, file: Vec<u8>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
            file,
            content_type: None,
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            upsert: false,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn cache_control(mut self, seconds: impl Into<String>) -> Self {
        self.cache_control = seconds.into();
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}

/// One path or several; always sent as a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathList(Vec<String>);

impl PathList {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for PathList {
    fn from(path: &str) -> Self {
        PathList(vec![path.to_string()])
    }
}

impl From<String> for PathList {
    fn from(path: String) -> Self {
        PathList(vec![path])
    }
}

impl From<Vec<String>> for PathList {
    fn from(paths: Vec<String>) -> Self {
        PathList(paths)
    }
}

impl From<&[&str]> for PathList {
    fn from(paths: &[&str]) -> Self {
        PathList(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathList {
    fn from(paths: [&str; N]) -> Self {
        PathList(paths.iter().map(|p| p.to_string()).collect())
    }
}

pub async fn upload_file(
    client: &BackendClient,
    options: UploadOptions,
) -> OperationResult<UploadedObject> {
    let UploadOptions {
        bucket,
        path,
        file,
        content_type,
        cache_control,
        upsert,
    } = options;

    let file_options = FileOptions {
        content_type,
        cache_control,
        upsert,
    };

    run_query(|| async move {
        client
            .storage()
            .from(&bucket)
            .upload(&path, file, &file_options)
            .await
    })
    .await
}

/// Public URL for `path`. Pure composition; the object may not exist.
pub fn get_public_url(client: &BackendClient, bucket: &str, path: &str) -> String {
    client.storage().from(bucket).public_url(path)
}

/// Signed URL valid for `expires_in` seconds, one hour by default.
pub async fn get_signed_url(
    client: &BackendClient,
    bucket: &str,
    path: &str,
    expires_in: Option<u64>,
) -> OperationResult<String> {
    let expires_in = expires_in.unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS);
    run_query(|| async move {
        client
            .storage()
            .from(bucket)
            .create_signed_url(path, expires_in)
            .await
    })
    .await
}

/// Remove one or more objects; returns the names the backend deleted.
pub async fn delete_file(
    client: &BackendClient,
    bucket: &str,
    paths: impl Into<PathList>,
) -> OperationResult<Vec<String>> {
    let paths = paths.into().into_vec();
    run_query(|| async move {
        let removed = client.storage().from(bucket).remove(&paths).await?;
        Ok::<_, ClientError>(removed.into_iter().map(|file| file.name).collect::<Vec<String>>())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_defaults() {
        let options = UploadOptions::new("media", "a.png", vec![1]);
        assert_eq!(options.cache_control, "3600");
        assert!(!options.upsert);
        assert!(options.content_type.is_none());
    }

    #[test]
    fn test_single_path_normalizes_to_list() {
        assert_eq!(
            PathList::from("a.png"),
            PathList::from(vec!["a.png".to_string()])
        );
        assert_eq!(PathList::from(["a.png", "b.png"]).into_vec().len(), 2);
    }
}
