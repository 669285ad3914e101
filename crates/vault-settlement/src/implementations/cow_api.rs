//! CoW Protocol orderbook REST client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use vault_order::SignedOrder;
use vault_types::{validate_http_url, ConfigSchema, Field, FieldType, Schema, ValidationError};

use crate::{QuoteRequest, QuoteResponse, SettlementError, SettlementInterface};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub struct CowApiSettlement {
	client: Client,
	api_url: String,
}

impl CowApiSettlement {
	pub fn new(api_url: &str, timeout: Duration) -> Result<Self, SettlementError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| SettlementError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

		Ok(Self {
			client,
			api_url: api_url.trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.api_url, path)
	}
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, SettlementError> {
	let status = response.status();
	if !status.is_success() {
		let body = response.text().await.unwrap_or_default();
		return Err(SettlementError::Rejected {
			status: status.as_u16(),
			body,
		});
	}

	response
		.json()
		.await
		.map_err(|e| SettlementError::InvalidResponse(e.to_string()))
}

pub struct CowApiSchema;

impl ConfigSchema for CowApiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("api_url", FieldType::String).with_validator(validate_http_url)],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SettlementInterface for CowApiSettlement {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(CowApiSchema)
	}

	async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, SettlementError> {
		tracing::debug!(
			sell_token = %request.sell_token,
			buy_token = %request.buy_token,
			amount = %request.sell_amount_before_fee,
			"Requesting orderbook quote"
		);

		let response = self
			.client
			.post(self.url("/api/v1/quote"))
			.json(request)
			.send()
			.await
			.map_err(|e| SettlementError::Network(format!("Failed to send quote request: {e}")))?;

		parse_response(response).await
	}

	async fn submit_order(&self, order: &SignedOrder) -> Result<String, SettlementError> {
		let response = self
			.client
			.post(self.url("/api/v1/orders"))
			.json(order)
			.send()
			.await
			.map_err(|e| SettlementError::Network(format!("Failed to submit order: {e}")))?;

		let uid: String = parse_response(response).await?;
		if uid != order.uid.to_string() {
			tracing::warn!(
				expected = %order.uid,
				returned = %uid,
				"Orderbook returned a different order uid"
			);
		}
		tracing::info!(order_uid = %uid, owner = %order.owner, "Order accepted");
		Ok(uid)
	}
}

pub fn create_cow_api(config: &toml::Value) -> Result<CowApiSettlement, SettlementError> {
	CowApiSchema
		.validate(config)
		.map_err(|e| SettlementError::InvalidConfig(e.to_string()))?;

	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| SettlementError::InvalidConfig("api_url is required".to_string()))?;

	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	CowApiSettlement::new(api_url, Duration::from_secs(timeout))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_create_from_config() {
		let config: toml::Value = toml::from_str(
			r#"
			api_url = "https://api.cow.fi/optimism/"
			timeout_seconds = 10
			"#,
		)
		.unwrap();
		let api = create_cow_api(&config).unwrap();
		assert_eq!(api.url("/api/v1/quote"), "https://api.cow.fi/optimism/api/v1/quote");
	}

	#[test]
	fn test_rejects_non_http_url() {
		let config: toml::Value = toml::from_str(r#"api_url = "ftp://example.org""#).unwrap();
		assert!(matches!(
			create_cow_api(&config),
			Err(SettlementError::InvalidConfig(_))
		));
	}

	#[test]
	fn test_requires_api_url() {
		let config = toml::Value::Table(Default::default());
		assert!(create_cow_api(&config).is_err());
	}
}
