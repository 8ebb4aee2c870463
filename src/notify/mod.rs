//! Email notification for grade changes.
//!
//! Notification is optional: without a complete `email.*` section the notifier
//! is simply absent. Message composition is pure; only [`Notifier::send`]
//! talks to the SMTP server (STARTTLS, password login).

use chrono::NaiveDateTime;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Message, SmtpTransport, Transport as _};

use crate::config::Config;
use crate::error::AppError;
use crate::report::{GradeChange, format_changes};

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// A composed message, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Notifier {
    smtp_server: String,
    smtp_port: u16,
    sender: String,
    password: String,
    recipient: String,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// `None` when any of server, sender, password or recipient is missing.
    pub fn from_config(config: &Config) -> Option<Self> {
        let required = (
            config.get_opt_str("email.smtp_server"),
            config.get_opt_str("email.sender_email"),
            config.get_opt_str("email.sender_password"),
            config.get_opt_str("email.recipient_email"),
        );
        let (Some(smtp_server), Some(sender), Some(password), Some(recipient)) = required else {
            tracing::info!("email configuration incomplete; notifications disabled");
            return None;
        };

        let smtp_port = config
            .get_opt_u64("email.smtp_port")
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        Some(Self {
            smtp_server,
            smtp_port,
            sender,
            password,
            recipient,
        })
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Build the notification for `changes`.
    pub fn compose(changes: &[GradeChange], old_gpa: f64, new_gpa: f64, now: NaiveDateTime) -> Email {
        let stamp = now.format("%Y-%m-%d %H:%M:%S");
        let mut body = format!("Grade update\n\nChecked at: {stamp}\n\n");
        body.push_str(&format_changes(changes, old_gpa, new_gpa));
        body.push_str("\n\nSent automatically by the grade monitor.\n");
        Email {
            subject: format!("成绩更新通知 - {stamp}"),
            body,
        }
    }

    pub fn send(&self, email: &Email) -> Result<(), AppError> {
        let from: Mailbox = self
            .sender
            .parse()
            .map_err(|e| AppError::config(format!("Invalid sender address '{}': {e}", self.sender)))?;
        let to: Mailbox = self
            .recipient
            .parse()
            .map_err(|e| AppError::config(format!("Invalid recipient address '{}': {e}", self.recipient)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| AppError::new(4, format!("Failed to build email: {e}")))?;

        let mailer = SmtpTransport::starttls_relay(&self.smtp_server)
            .map_err(|e| AppError::new(4, format!("SMTP setup failed for '{}': {e}", self.smtp_server)))?
            .port(self.smtp_port)
            .credentials(SmtpCredentials::new(self.sender.clone(), self.password.clone()))
            .build();

        mailer
            .send(&message)
            .map_err(|e| AppError::new(4, format!("Failed to send email: {e}")))?;

        tracing::info!(recipient = %self.recipient, "notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Course, fields};
    use chrono::NaiveDate;
    use serde_json::json;

    fn email_config(port: serde_json::Value) -> Config {
        Config::from_value(json!({
            "email": {
                "smtp_server": "smtp.example.com",
                "smtp_port": port,
                "sender_email": "me@example.com",
                "sender_password": "secret",
                "recipient_email": "you@example.com"
            }
        }))
    }

    #[test]
    fn incomplete_config_disables_notifier() {
        let config = Config::from_value(json!({
            "email": { "smtp_server": "smtp.example.com", "sender_email": "me@example.com" }
        }));
        assert!(Notifier::from_config(&config).is_none());
        assert!(Notifier::from_config(&Config::default()).is_none());
    }

    #[test]
    fn complete_config_builds_notifier() {
        let n = Notifier::from_config(&email_config(json!(465))).unwrap();
        assert_eq!(n.smtp_port, 465);
        assert_eq!(n.recipient(), "you@example.com");
        assert!(!format!("{n:?}").contains("secret"));

        let n = Notifier::from_config(&email_config(json!(null))).unwrap();
        assert_eq!(n.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn compose_is_deterministic() {
        let now = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let changes = vec![GradeChange::NewCourse {
            name: "编译原理".into(),
            course: Course::new()
                .with(fields::COURSE_NAME, "编译原理")
                .with(fields::CREDIT, 3.5)
                .with(fields::FINAL_SCORE, 93.0)
                .with(fields::GRADE_POINT, 4.3),
        }];

        let email = Notifier::compose(&changes, 3.8, 3.85, now);
        assert_eq!(email.subject, "成绩更新通知 - 2024-07-01 09:30:00");
        assert!(email.body.contains("Checked at: 2024-07-01 09:30:00"));
        assert!(email.body.contains("- delta : +0.05"));
        assert!(email.body.contains("[new] 编译原理"));
        assert!(email.body.contains("成绩: 93"));
        assert_eq!(email, Notifier::compose(&changes, 3.8, 3.85, now));
    }
}
