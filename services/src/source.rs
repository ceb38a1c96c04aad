//! Source packaging and the staging bucket.
//!
//! The archive is a convenience packaging step, not a reproducible-build
//! guarantee: entry order follows directory traversal and is not part of
//! the contract.

use std::io::{Cursor, Write};
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLifecycleConfiguration, BucketLocationConstraint, CreateBucketConfiguration,
    ExpirationStatus, LifecycleExpiration, LifecycleRule, LifecycleRuleFilter,
};
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use al_core::traits::SourceStore;
use al_core::types::AccountId;
use errors::StagingError;
use tracing::{debug, info};

pub const STAGING_BUCKET_PREFIX: &str = "airlift-build-sources";

/// Uploaded archives are transient; stale ones expire on their own.
const SOURCE_EXPIRY_DAYS: i32 = 7;

/// Deterministic staging bucket name, bound to the owning account and
/// region.
pub fn staging_bucket_name(account: &AccountId, region: &str) -> String {
    format!("{STAGING_BUCKET_PREFIX}-{account}-{region}")
}

/// Object key for one agent's upload.
pub fn source_key(agent: &str) -> String {
    format!("{agent}/{}.zip", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}

/// Names excluded from the archive: build metadata and hidden entries.
fn excluded(name: &str) -> bool {
    name.starts_with('.') || name == "target" || name == "node_modules" || name == "__pycache__"
}

/// Zip the tree under `root`, applying the exclusion policy to every path
/// segment.
pub fn package_source(root: &Path) -> Result<Vec<u8>, StagingError> {
    let package_err = |reason: String| StagingError::Package {
        path: root.display().to_string(),
        reason,
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || entry
                .file_name()
                .to_str()
                .is_some_and(|name| !excluded(name))
    });

    let mut files = 0usize;
    for entry in walker {
        let entry = entry.map_err(|e| package_err(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| package_err(e.to_string()))?;
        let name = rel.to_string_lossy().replace('\\', "/");
        zip.start_file(name, options)
            .map_err(|e| package_err(e.to_string()))?;
        let bytes = std::fs::read(entry.path()).map_err(|e| package_err(e.to_string()))?;
        zip.write_all(&bytes).map_err(|e| package_err(e.to_string()))?;
        files += 1;
    }

    let cursor = zip.finish().map_err(|e| package_err(e.to_string()))?;
    debug!(files, root = %root.display(), "packaged source tree");
    Ok(cursor.into_inner())
}

/// Verify or create the staging bucket for `owner` in `region`.
///
/// Ownership is verified, never assumed: a pre-existing bucket owned by a
/// different account surfaces as an error from the probe.
pub async fn ensure_staging_bucket(
    store: &dyn SourceStore,
    owner: &AccountId,
    region: &str,
) -> Result<String, StagingError> {
    let bucket = staging_bucket_name(owner, region);
    if store.bucket_exists(&bucket, owner).await? {
        debug!(bucket = %bucket, "staging bucket present");
    } else {
        info!(bucket = %bucket, region, "creating staging bucket");
        store.create_bucket(&bucket, region).await?;
    }
    Ok(bucket)
}

/// S3-backed [`SourceStore`].
pub struct S3SourceStore {
    client: aws_sdk_s3::Client,
}

impl S3SourceStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceStore for S3SourceStore {
    async fn bucket_exists(
        &self,
        bucket: &str,
        expected_owner: &AccountId,
    ) -> Result<bool, StagingError> {
        match self
            .client
            .head_bucket()
            .bucket(bucket)
            .expected_bucket_owner(expected_owner.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            // Access denied covers both a foreign owner and a global name
            // collision; neither bucket can be used.
            Err(_) => Err(StagingError::ForeignOwner {
                bucket: bucket.to_string(),
                expected_owner: expected_owner.to_string(),
            }),
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StagingError> {
        let create_err = |reason: String| StagingError::CreateFailed {
            bucket: bucket.to_string(),
            reason,
        };

        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        match request.send().await {
            Ok(_) => {}
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) => {}
            Err(err) => return Err(create_err(err.to_string())),
        }

        let rule = LifecycleRule::builder()
            .id("expire-stale-sources")
            .status(ExpirationStatus::Enabled)
            .filter(LifecycleRuleFilter::builder().prefix("").build())
            .expiration(LifecycleExpiration::builder().days(SOURCE_EXPIRY_DAYS).build())
            .build()
            .map_err(|e| create_err(e.to_string()))?;
        let lifecycle = BucketLifecycleConfiguration::builder()
            .rules(rule)
            .build()
            .map_err(|e| create_err(e.to_string()))?;
        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(bucket)
            .lifecycle_configuration(lifecycle)
            .send()
            .await
            .map_err(|e| create_err(e.to_string()))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StagingError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StagingError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;
    use testing::FakeSourceStore;

    fn account(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn archive_names(bytes: &[u8]) -> HashSet<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_staging_bucket_name_is_deterministic() {
        let name = staging_bucket_name(&account("987654321098"), "us-west-2");
        assert_eq!(name, "airlift-build-sources-987654321098-us-west-2");
    }

    #[test]
    fn test_source_key_is_agent_scoped() {
        let key = source_key("test-agent");
        assert!(key.starts_with("test-agent/"));
        assert!(key.ends_with(".zip"));
    }

    #[test]
    fn test_package_source_applies_exclusions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("app/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("Dockerfile"), "FROM scratch").unwrap();
        fs::write(root.join(".hidden"), "secret").unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join("target/debug/bin"), "elf").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "{}").unwrap();
        fs::write(root.join("__pycache__/mod.pyc"), "pyc").unwrap();

        let bytes = package_source(root).unwrap();
        let names = archive_names(&bytes);

        assert!(names.contains("app/main.rs"));
        assert!(names.contains("Dockerfile"));
        assert!(!names.iter().any(|n| n.starts_with(".git")));
        assert!(!names.iter().any(|n| n.starts_with("target")));
        assert!(!names.iter().any(|n| n.starts_with("node_modules")));
        assert!(!names.iter().any(|n| n.starts_with("__pycache__")));
        assert!(!names.contains(".hidden"));
    }

    #[test]
    fn test_package_source_nested_exclusions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/target")).unwrap();
        fs::write(root.join("sub/lib.rs"), "pub fn f() {}").unwrap();
        fs::write(root.join("sub/target/out"), "obj").unwrap();

        let names = archive_names(&package_source(root).unwrap());
        assert!(names.contains("sub/lib.rs"));
        assert!(!names.iter().any(|n| n.contains("target")));
    }

    #[tokio::test]
    async fn test_ensure_staging_bucket_creates_when_missing() {
        let store = FakeSourceStore::new();
        let bucket = ensure_staging_bucket(&store, &account("123456789012"), "us-west-2")
            .await
            .unwrap();
        assert_eq!(bucket, "airlift-build-sources-123456789012-us-west-2");
        assert_eq!(
            store.created.lock().unwrap().as_slice(),
            &[(bucket.clone(), "us-west-2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_ensure_staging_bucket_reuses_owned_bucket() {
        let store = FakeSourceStore::new().with_bucket(
            "airlift-build-sources-123456789012-us-west-2",
            "123456789012",
        );
        ensure_staging_bucket(&store, &account("123456789012"), "us-west-2")
            .await
            .unwrap();
        assert!(store.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_staging_bucket_foreign_owner_is_fatal() {
        let store = FakeSourceStore::new().with_bucket(
            "airlift-build-sources-123456789012-us-west-2",
            "999999999999",
        );
        let result = ensure_staging_bucket(&store, &account("123456789012"), "us-west-2").await;
        assert!(matches!(result, Err(StagingError::ForeignOwner { .. })));
        assert!(store.created.lock().unwrap().is_empty());
    }
}
