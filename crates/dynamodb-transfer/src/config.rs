//! Client configuration loaded from the environment
//!
//! Supports both real AWS endpoints and local stand-ins (LocalStack, MinIO)
//! through the optional endpoint override and path-style flag.

use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

/// Build both clients from the ambient AWS environment (shared config files,
/// instance metadata, SSO). Preferred on real AWS; [`TransferConfig`] covers
/// explicit static credentials and local endpoints.
pub async fn clients_from_env() -> (aws_sdk_dynamodb::Client, aws_sdk_s3::Client) {
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    (
        aws_sdk_dynamodb::Client::new(&sdk_config),
        aws_sdk_s3::Client::new(&sdk_config),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl TransferConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: env::var("DDB_TRANSFER_ENDPOINT").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key: env::var("AWS_ACCESS_KEY_ID").unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            path_style: env::var("DDB_TRANSFER_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }

    pub fn for_localstack(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: "us-east-1".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
        }
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(
            &self.access_key,
            &self.secret_key,
            None,
            None,
            "ddb-transfer",
        )
    }

    /// Build the table-service client for this configuration.
    pub fn dynamodb_client(&self) -> aws_sdk_dynamodb::Client {
        debug!(region = %self.region, endpoint = ?self.endpoint, "building DynamoDB client");

        let mut builder = aws_sdk_dynamodb::Config::builder()
            .credentials_provider(self.credentials())
            .region(Region::new(self.region.clone()));

        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        aws_sdk_dynamodb::Client::from_conf(builder.build())
    }

    /// Build the object-store client for this configuration.
    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        debug!(region = %self.region, endpoint = ?self.endpoint, "building S3 client");

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(self.credentials())
            .region(Region::new(self.region.clone()))
            .force_path_style(self.path_style);

        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        aws_sdk_s3::Client::from_conf(builder.build())
    }
}
