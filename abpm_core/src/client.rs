//! Clinical API client.
//!
//! The API issues a bearer token from `POST /login` and serves each ABPM
//! test through four GET endpoints keyed by test id. [`AbpmClient`] logs in
//! once and keeps the token for every later request.

use crate::config::ApiConfig;
use crate::{AbpmRecord, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const LOGIN_PATH: &str = "login";
const META_DATA_PATH: &str = "get_mapa";
const DATA_PATH: &str = "tabla_mediciones";
const MEASURE_PATH: &str = "MAPA";
const DRUGS_PATH: &str = "medicamentos";

/// Anything that can produce a complete ABPM test by id
#[async_trait]
pub trait AbpmSource: Send + Sync {
    async fn fetch_record(&self, patient_id: u64) -> Result<AbpmRecord>;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    res: String,
}

/// Authenticated client for the ABPM API
pub struct AbpmClient {
    client: Client,
    base_url: String,
    token: String,
}

impl AbpmClient {
    /// Authenticate against the API and return a ready client
    pub async fn login(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let url = format!("{}/{}", base_url, LOGIN_PATH);
        let response = client
            .post(&url)
            .form(&[
                ("user", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url,
            });
        }

        let login: LoginResponse = response.json().await?;
        tracing::info!("Authenticated against {} as {:?}", base_url, config.username);

        Ok(Self {
            client,
            base_url,
            token: login.res,
        })
    }

    /// Client with an already issued token
    pub fn with_token(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of one endpoint for one test, e.g. `{base}/MAPA/5331/`
    pub fn endpoint_url(&self, endpoint: &str, patient_id: u64) -> String {
        format!("{}/{}/{}/", self.base_url, endpoint, patient_id)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, patient_id: u64) -> Result<T> {
        let url = self.endpoint_url(endpoint, patient_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AbpmSource for AbpmClient {
    async fn fetch_record(&self, patient_id: u64) -> Result<AbpmRecord> {
        let data = self.get_json(DATA_PATH, patient_id).await?;
        let measure: Value = self.get_json(MEASURE_PATH, patient_id).await?;
        let drugs: Value = self.get_json(DRUGS_PATH, patient_id).await?;
        let meta_data = self.get_json(META_DATA_PATH, patient_id).await?;

        tracing::debug!("Fetched test {}", patient_id);

        Ok(AbpmRecord {
            id: patient_id,
            data,
            meta_data,
            measure,
            drugs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let client = AbpmClient::with_token("https://api.example.org/", "token");
        assert_eq!(client.base_url(), "https://api.example.org");
        assert_eq!(
            client.endpoint_url(MEASURE_PATH, 5331),
            "https://api.example.org/MAPA/5331/"
        );
        assert_eq!(
            client.endpoint_url(DATA_PATH, 7),
            "https://api.example.org/tabla_mediciones/7/"
        );
    }

    #[test]
    fn test_login_response_shape() {
        let login: LoginResponse = serde_json::from_str(r#"{"res": "abc.def"}"#).unwrap();
        assert_eq!(login.res, "abc.def");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_an_error() {
        let config = ApiConfig {
            url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..Default::default()
        };
        let result = AbpmClient::login(&config).await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
