//! Contact and booking leads sent through the templated mail service.
//!
//! Both forms share one template; the subject line tells the agency which
//! form (and which package) the lead came from.

use chrono::{Local, NaiveDateTime};
use makkah_api_models::Package;
use makkah_config::MailAccount;
use makkah_events::{Event, EventBus};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{MailError, MailResult};

/// Subject line of contact page leads.
pub const CONTACT_SUBJECT: &str = "General Contact Inquiry";
/// Message body used when a booking carries no message.
pub const DEFAULT_BOOKING_MESSAGE: &str = "No specific message provided.";
/// Alert shown once a contact lead was accepted.
pub const CONTACT_CONFIRMATION: &str = "Thank you! Your message has been sent successfully.";
/// Alert shown when a contact lead could not be sent.
pub const CONTACT_FAILURE: &str = "Failed to send message. Please try again later.";
/// Alert shown when a booking lead could not be sent.
pub const BOOKING_FAILURE: &str = "Error sending request.";

/// Variables substituted into the mail template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams {
    /// Subject line.
    pub subject_title: String,
    /// Sender name.
    pub name: String,
    /// Sender mobile number.
    pub mobile: String,
    /// Sender email.
    pub email: String,
    /// Passport number, `N/A` for general inquiries.
    pub passport_no: String,
    /// Free-form message.
    pub message: String,
    /// Local time the lead was submitted.
    pub time: String,
}

/// Contact page form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    /// Sender name.
    pub name: String,
    /// Sender mobile number.
    pub mobile: String,
    /// Sender email.
    pub email: String,
    /// Message.
    pub message: String,
}

impl ContactForm {
    /// Template variables for this lead, stamped with `sent_at`.
    #[must_use]
    pub fn template_params(&self, sent_at: NaiveDateTime) -> TemplateParams {
        TemplateParams {
            subject_title: CONTACT_SUBJECT.to_string(),
            name: self.name.clone(),
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            passport_no: "N/A".to_string(),
            message: self.message.clone(),
            time: format_sent_at(sent_at),
        }
    }
}

/// Package detail page booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    /// Full name.
    pub full_name: String,
    /// Mobile number.
    pub mobile: String,
    /// Email.
    pub email: String,
    /// Passport number.
    pub passport_no: String,
    /// Optional note.
    pub message: Option<String>,
}

impl BookingForm {
    /// Template variables for a booking of `package`, stamped with `sent_at`.
    #[must_use]
    pub fn template_params(&self, package: &Package, sent_at: NaiveDateTime) -> TemplateParams {
        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_BOOKING_MESSAGE);
        TemplateParams {
            subject_title: format!("{} Booking: {}", package.category, package.title),
            name: self.full_name.clone(),
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            passport_no: self.passport_no.clone(),
            message: message.to_string(),
            time: format_sent_at(sent_at),
        }
    }

    /// Alert shown once the booking was accepted.
    #[must_use]
    pub fn confirmation(package: &Package) -> String {
        format!("Booking request for {} sent!", package.title)
    }
}

/// `month/day/year, h:mm:ss AM` in local time.
#[must_use]
pub fn format_sent_at(sent_at: NaiveDateTime) -> String {
    sent_at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Current local time, for stamping leads.
#[must_use]
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a TemplateParams,
}

/// Client for the mail service's send endpoint.
#[derive(Clone)]
pub struct LeadMailer {
    http: reqwest::Client,
    account: MailAccount,
    events: EventBus,
}

impl LeadMailer {
    /// Build a mailer for `account`.
    #[must_use]
    pub const fn new(http: reqwest::Client, account: MailAccount, events: EventBus) -> Self {
        Self {
            http,
            account,
            events,
        }
    }

    /// Hand a lead to the mail service.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the request fails or is rejected.
    #[instrument(name = "mail.send", skip(self, params), fields(subject = %params.subject_title))]
    pub async fn send(&self, params: &TemplateParams) -> MailResult<()> {
        let body = SendRequest {
            service_id: &self.account.service_id,
            template_id: &self.account.template_id,
            user_id: &self.account.public_key,
            template_params: params,
        };
        let response = self
            .http
            .post(&self.account.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|source| MailError::Transport { source })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "mail service rejected lead");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("lead sent");
        self.events.publish(Event::LeadSent {
            subject: params.subject_title.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use makkah_test_support::fixtures::hajj_package;
    use serde_json::json;

    fn sent_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 7)
            .and_then(|date| date.and_hms_opt(14, 5, 9))
            .expect("valid timestamp")
    }

    fn account(server: &MockServer) -> MailAccount {
        MailAccount {
            endpoint: server.url("/api/v1.0/email/send"),
            service_id: "service_lead".into(),
            template_id: "template_lead".into(),
            public_key: "pk_public".into(),
        }
    }

    #[test]
    fn contact_params_use_general_subject() {
        let form = ContactForm {
            name: "Amina".into(),
            mobile: "+8801700000000".into(),
            email: "amina@example.com".into(),
            message: "Family of four, December".into(),
        };
        let params = form.template_params(sent_at());
        assert_eq!(params.subject_title, "General Contact Inquiry");
        assert_eq!(params.passport_no, "N/A");
        assert_eq!(params.time, "3/7/2026, 2:05:09 PM");
    }

    #[test]
    fn booking_params_name_the_package() {
        let form = BookingForm {
            full_name: "Karim Uddin".into(),
            passport_no: "EB0123456".into(),
            message: Some("   ".into()),
            ..BookingForm::default()
        };
        let package = hajj_package("p1");
        let params = form.template_params(&package, sent_at());
        assert_eq!(params.subject_title, "Hajj Booking: Premium Hajj 2026");
        assert_eq!(params.message, DEFAULT_BOOKING_MESSAGE);
        assert_eq!(params.passport_no, "EB0123456");
        assert_eq!(
            BookingForm::confirmation(&package),
            "Booking request for Premium Hajj 2026 sent!"
        );
    }

    #[tokio::test]
    async fn send_posts_account_and_params() {
        let server = MockServer::start_async().await;
        let params = ContactForm {
            name: "Amina".into(),
            ..ContactForm::default()
        }
        .template_params(sent_at());
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1.0/email/send")
                .json_body(json!({
                    "service_id": "service_lead",
                    "template_id": "template_lead",
                    "user_id": "pk_public",
                    "template_params": {
                        "subject_title": "General Contact Inquiry",
                        "name": "Amina",
                        "mobile": "",
                        "email": "",
                        "passport_no": "N/A",
                        "message": "",
                        "time": "3/7/2026, 2:05:09 PM"
                    }
                }));
            then.status(200).body("OK");
        });
        let events = EventBus::new();
        let mailer = LeadMailer::new(reqwest::Client::new(), account(&server), events.clone());

        mailer.send(&params).await.expect("sent");
        mock.assert();
        assert!(events.recent().iter().any(|envelope| envelope.event
            == Event::LeadSent {
                subject: "General Contact Inquiry".into()
            }));
    }

    #[tokio::test]
    async fn rejected_lead_keeps_the_body() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1.0/email/send");
            then.status(400).body("The user ID is invalid");
        });
        let mailer = LeadMailer::new(reqwest::Client::new(), account(&server), EventBus::new());

        let err = mailer
            .send(&ContactForm::default().template_params(sent_at()))
            .await
            .expect_err("rejected");
        assert!(matches!(
            err,
            MailError::Rejected { status: 400, ref body } if body == "The user ID is invalid"
        ));
    }
}
