//! Buyer inquiries sent through a callable backend function.

use std::sync::Arc;

use tracing::{info, warn};

use brokerdesk_core::config::ViewConfig;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::gateway::{DataGateway, Row};
use brokerdesk_entity::form::{InquiryForm, validate_form};

use crate::notice::NoticeBoard;

/// Sends listing inquiries to sellers.
#[derive(Debug, Clone)]
pub struct InquiryService {
    gateway: Arc<dyn DataGateway>,
    function: String,
    notices: Arc<NoticeBoard>,
}

impl InquiryService {
    /// Create a service invoking the named remote function.
    pub fn new(gateway: Arc<dyn DataGateway>, function: impl Into<String>, notices: Arc<NoticeBoard>) -> Self {
        Self {
            gateway,
            function: function.into(),
            notices,
        }
    }

    /// Create a service invoking the configured inquiry function.
    pub fn from_config(gateway: Arc<dyn DataGateway>, config: &ViewConfig, notices: Arc<NoticeBoard>) -> Self {
        Self::new(gateway, config.inquiry_function.clone(), notices)
    }

    /// Validate and send an inquiry, returning the function's response.
    ///
    /// A function failure comes back as a write error; an invalid form is
    /// rejected before the function is called.
    pub async fn send(&self, form: InquiryForm) -> AppResult<Row> {
        validate_form(&form)?;
        let payload = serde_json::to_value(&form)?;

        match self.gateway.invoke(&self.function, payload).await {
            Ok(response) => {
                info!(business_id = %form.business_id, "Inquiry sent");
                Ok(response)
            }
            Err(e) => {
                let err = e.into_write("Failed to send inquiry");
                warn!(business_id = %form.business_id, error = %err, "Inquiry failed");
                self.notices.post_error(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerdesk_core::error::{AppError, ErrorKind};
    use brokerdesk_gateway::MemoryBackend;
    use serde_json::json;

    fn form(message: &str) -> InquiryForm {
        InquiryForm {
            business_id: "b1".into(),
            name: "Ann Lee".into(),
            email: "ann@example.com".into(),
            phone: None,
            message: message.into(),
        }
    }

    fn service(backend: &Arc<MemoryBackend>) -> InquiryService {
        InquiryService::from_config(
            backend.clone(),
            &ViewConfig::default(),
            Arc::new(NoticeBoard::default()),
        )
    }

    #[tokio::test]
    async fn test_send_invokes_function() {
        let backend = Arc::new(MemoryBackend::default());
        backend.register_function("send-inquiry-email", |_| Ok(json!({"sent": true})));

        let response = service(&backend)
            .send(form("Is the lease transferable?"))
            .await
            .unwrap();

        assert_eq!(response["sent"], true);
        let calls = backend.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["business_id"], "b1");
    }

    #[tokio::test]
    async fn test_function_failure_is_distinguishable() {
        let backend = Arc::new(MemoryBackend::default());
        backend.register_function("send-inquiry-email", |_| {
            Err(AppError::external_service("mail provider down"))
        });

        let err = service(&backend)
            .send(form("Is the lease transferable?"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Write);
    }

    #[tokio::test]
    async fn test_invalid_form_never_calls_function() {
        let backend = Arc::new(MemoryBackend::default());
        let err = service(&backend).send(form("hi")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(backend.invocations().is_empty());
    }
}
