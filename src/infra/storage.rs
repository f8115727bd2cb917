use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::AppConfig;

/// The get/put/list contract the handlers and the thumbnail job depend on.
/// Containers are addressed by name ("original" / "thumbnail"); objects by
/// name within a container. `put` always overwrites.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, container: &str, name: &str, data: Bytes, content_type: &str)
        -> Result<()>;

    async fn get(&self, container: &str, name: &str) -> Result<Bytes>;

    async fn list_names(&self, container: &str) -> Result<Vec<String>>;
}

/// S3-backed store; each container maps to a bucket of the same name.
#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
}

impl ObjectStorage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .endpoint_url(config.s3_endpoint.clone())
            .force_path_style(true);
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let s3_config = s3_builder.build();

        Ok(Self {
            client: Client::from_conf(s3_config),
        })
    }
}

#[async_trait]
impl BlobStore for ObjectStorage {
    async fn put(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(container)
            .key(name)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn get(&self, container: &str, name: &str) -> Result<Bytes> {
        let object = self
            .client
            .get_object()
            .bucket(container)
            .key(name)
            .send()
            .await?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|err| anyhow!("failed to read object body: {}", err))?
            .into_bytes();
        Ok(data)
    }

    async fn list_names(&self, container: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(container);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }
            let response = request.send().await?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    names.push(key.to_string());
                }
            }

            if response.is_truncated() == Some(true) {
                continuation = response.next_continuation_token().map(str::to_string);
                if continuation.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(names)
    }
}

/// Public URL for an object: `<base>/<container>/<name>`, by plain
/// concatenation against the fixed storage host.
pub fn public_url(base: &str, container: &str, name: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), container, name)
}
