use crate::domain::models::payment::ChargeRequest;
use crate::domain::ports::PaymentProcessor;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

pub struct HttpPaymentProcessor {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentProcessor {
    pub fn new(api_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, api_url, api_key }
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn charge(&self, request: &ChargeRequest) -> Result<(), AppError> {
        debug!(request_id = %request.request_id, "Sending charge request");

        // The processor deduplicates on the Idempotency-Key header, so re-sending an outstanding request is safe.
        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Idempotency-Key", &request.request_id)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment service rejected charge. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}
