use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::models::{ServoCommand, WasteLabel};
use crate::settings::ActuatorSettings;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("request to actuator failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("actuator answered {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Tells the sorting device which bin to open.
#[derive(Clone)]
pub struct ActuatorClient {
    client: Client,
    servo_url: String,
}

impl ActuatorClient {
    pub fn new(settings: &ActuatorSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            client,
            servo_url: format!("{}/servo", settings.base_url.trim_end_matches('/')),
        })
    }

    pub fn servo_url(&self) -> &str {
        &self.servo_url
    }

    /// Fire-and-log: failures never reach the caller.
    pub async fn notify(&self, label: WasteLabel) {
        match self.send(label).await {
            Ok(()) => tracing::info!(%label, "servo command sent"),
            Err(e) => tracing::warn!(%label, url = %self.servo_url, error = %e, "servo command failed"),
        }
    }

    pub async fn send(&self, label: WasteLabel) -> Result<(), ActuatorError> {
        let response = self
            .client
            .post(&self.servo_url)
            .json(&ServoCommand { waste_type: label })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ActuatorError::Rejected { status, body })
    }
}
