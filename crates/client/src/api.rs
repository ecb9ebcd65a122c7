//! Backend access.
//!
//! [`Backend`] is the seam between screens and the REST API; [`HttpBackend`]
//! is the reqwest implementation. The backend is the sole arbiter of state;
//! nothing here retries or caches.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use medstock_purchasing::PurchaseOrderId;
use medstock_quarantine::{QuarantineRecordId, QuarantineSummary};

use crate::config::ClientConfig;
use crate::dto::{
    PurchaseOrderView, QuarantineActionRequest, QuarantineRecordView, StatusUpdateRequest,
};
use crate::error::{ApiErrorBody, ClientError};
use crate::session::Session;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_purchase_orders(&self) -> Result<Vec<PurchaseOrderView>, ClientError>;

    async fn get_purchase_order(&self, id: PurchaseOrderId)
    -> Result<PurchaseOrderView, ClientError>;

    /// `PATCH /purchase-orders/{id}/status`.
    async fn update_purchase_order_status(
        &self,
        id: PurchaseOrderId,
        request: &StatusUpdateRequest,
    ) -> Result<PurchaseOrderView, ClientError>;

    async fn list_quarantine_records(&self) -> Result<Vec<QuarantineRecordView>, ClientError>;

    async fn get_quarantine_record(
        &self,
        id: QuarantineRecordId,
    ) -> Result<QuarantineRecordView, ClientError>;

    /// `POST /quarantine/action`.
    async fn submit_quarantine_action(
        &self,
        request: &QuarantineActionRequest,
    ) -> Result<QuarantineRecordView, ClientError>;

    async fn quarantine_summary(&self) -> Result<QuarantineSummary, ClientError>;
}

/// reqwest-backed [`Backend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, session: &Session) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: session.token().map(str::to_owned),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_url, path);
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, "backend request failed");
            ClientError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = ApiErrorBody::message_for(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), %message, "backend rejected request");
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_purchase_orders(&self) -> Result<Vec<PurchaseOrderView>, ClientError> {
        self.send(self.request(Method::GET, "/purchase-orders")).await
    }

    async fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrderView, ClientError> {
        self.send(self.request(Method::GET, &format!("/purchase-orders/{id}")))
            .await
    }

    async fn update_purchase_order_status(
        &self,
        id: PurchaseOrderId,
        request: &StatusUpdateRequest,
    ) -> Result<PurchaseOrderView, ClientError> {
        tracing::info!(order_id = %id, status = %request.status, "updating purchase order status");
        let req = self
            .request(Method::PATCH, &format!("/purchase-orders/{id}/status"))
            .json(request);
        self.send(req).await
    }

    async fn list_quarantine_records(&self) -> Result<Vec<QuarantineRecordView>, ClientError> {
        self.send(self.request(Method::GET, "/quarantine")).await
    }

    async fn get_quarantine_record(
        &self,
        id: QuarantineRecordId,
    ) -> Result<QuarantineRecordView, ClientError> {
        self.send(self.request(Method::GET, &format!("/quarantine/{id}")))
            .await
    }

    async fn submit_quarantine_action(
        &self,
        request: &QuarantineActionRequest,
    ) -> Result<QuarantineRecordView, ClientError> {
        tracing::info!(
            record_id = %request.quarantine_record_id,
            action = %request.action,
            "submitting quarantine action"
        );
        let req = self
            .request(Method::POST, "/quarantine/action")
            .json(request);
        self.send(req).await
    }

    async fn quarantine_summary(&self) -> Result<QuarantineSummary, ClientError> {
        self.send(self.request(Method::GET, "/quarantine/summary"))
            .await
    }
}
