use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::MailConfig;
use crate::services::ServiceError;

/// Transactional mail seam. Transport-level delivery is out of scope; this
/// trait is what the identity flows dispatch through.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        template_id: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SmtpEmailSender {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpEmailSender {
    pub fn new(config: &MailConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.smtp_user.clone(), config.smtp_app_password.clone());

        let mailer = SmtpTransport::relay("smtp.gmail.com")
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!("Email sender initialized with SMTP relay");

        Ok(Self {
            mailer,
            from_email: config.smtp_user.clone(),
        })
    }

    fn render_body(template_id: &str, params: &HashMap<String, String>) -> String {
        // Template files belong to the delivery layer; the identity core only
        // names the template and supplies its parameters.
        let mut body = format!("template: {}\n\n", template_id);
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();
        for key in keys {
            body.push_str(&format!("{}: {}\n", key, params[key]));
        }
        body
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        template_id: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        ServiceError::Internal(e.into())
                    })?,
            )
            .to(to
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Internal(e.into()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(Self::render_body(template_id, params))
            .map_err(|e| ServiceError::Internal(e.into()))?;

        // Send in the blocking pool to keep the async runtime unblocked
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to, "Failed to send email");
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

/// A sent mail as observed by the recording sender.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub template_id: String,
    pub params: HashMap<String, String>,
}

/// Recording sender for tests: captures every dispatch and can be flipped to
/// fail, to exercise the swallow-and-continue boundaries.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentMail>>,
    fail_next: Mutex<bool>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_next_send(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        template_id: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), ServiceError> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(ServiceError::Email("simulated delivery failure".to_string()));
        }
        drop(fail);

        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            template_id: template_id.to_string(),
            params: params.clone(),
        });
        Ok(())
    }
}
