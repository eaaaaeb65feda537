use makkah_client::mail::{BOOKING_FAILURE, CONTACT_CONFIRMATION, CONTACT_FAILURE, now};
use makkah_client::{BookingForm, Catalog, ContactForm, LeadMailer};
use makkah_session::Route;

use crate::cli::{BookArgs, ContactArgs};
use crate::client::{AppContext, CliResult, api_failure, mail_failure};

fn mailer(ctx: &AppContext) -> CliResult<LeadMailer> {
    let account = ctx.config.mail.account()?;
    Ok(LeadMailer::new(ctx.http.clone(), account, ctx.events.clone()))
}

pub(crate) async fn handle_contact(ctx: &AppContext, args: ContactArgs) -> CliResult<()> {
    let mailer = mailer(ctx)?;
    let form = ContactForm {
        name: args.name,
        mobile: args.mobile,
        email: args.email,
        message: args.message,
    };
    mailer
        .send(&form.template_params(now()))
        .await
        .map_err(|err| mail_failure(err, CONTACT_FAILURE))?;
    println!("{CONTACT_CONFIRMATION}");
    Ok(())
}

pub(crate) async fn handle_booking(ctx: &AppContext, args: BookArgs) -> CliResult<()> {
    let mailer = mailer(ctx)?;
    let route = Route::HajjPackage {
        id: args.package_id.clone(),
    };
    let package = Catalog::new(ctx.api(&route))
        .package(&args.package_id)
        .await
        .map_err(|err| api_failure(err, None))?;

    let form = BookingForm {
        full_name: args.name,
        mobile: args.mobile,
        email: args.email,
        passport_no: args.passport,
        message: args.message,
    };
    mailer
        .send(&form.template_params(&package, now()))
        .await
        .map_err(|err| mail_failure(err, BOOKING_FAILURE))?;
    println!("{}", BookingForm::confirmation(&package));
    Ok(())
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use crate::client::testing::context;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    fn book_args() -> BookArgs {
        BookArgs {
            package_id: "p1".into(),
            name: "Karim Uddin".into(),
            mobile: "+8801711000000".into(),
            email: "karim@example.com".into(),
            passport: "EB0123456".into(),
            message: None,
        }
    }

    async fn mail_context(base_url: &str, mail_url: String) -> crate::client::AppContext {
        let mut ctx = context(base_url, None).await;
        ctx.config.mail.endpoint = mail_url;
        ctx.config.mail.service_id = Some("service_lead".into());
        ctx.config.mail.template_id = Some("template_lead".into());
        ctx.config.mail.public_key = Some("pk_public".into());
        ctx
    }

    #[tokio::test]
    async fn booking_fetches_the_package_then_sends_the_lead() -> Result<()> {
        let server = MockServer::start_async().await;
        let package = server.mock(|when, then| {
            when.method(GET).path("/packages/p1");
            then.status(200).json_body(json!({
                "_id": "p1",
                "title": "Premium Hajj 2026",
                "category": "Hajj"
            }));
        });
        let send = server.mock(|when, then| {
            when.method(POST).path("/api/v1.0/email/send");
            then.status(200).body("OK");
        });
        let ctx = mail_context(&server.base_url(), server.url("/api/v1.0/email/send")).await;

        handle_booking(&ctx, book_args())
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        package.assert();
        send.assert();
        Ok(())
    }

    #[tokio::test]
    async fn failed_contact_uses_the_form_alert() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1.0/email/send");
            then.status(400).body("The user ID is invalid");
        });
        let ctx = mail_context(&server.base_url(), server.url("/api/v1.0/email/send")).await;
        let args = ContactArgs {
            name: "Amina".into(),
            mobile: "+8801700000000".into(),
            email: "amina@example.com".into(),
            message: "Family of four".into(),
        };

        let Err(err) = handle_contact(&ctx, args).await else {
            anyhow::bail!("rejected lead reported success");
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().starts_with(CONTACT_FAILURE));
        Ok(())
    }

    #[tokio::test]
    async fn missing_mail_account_stops_before_any_request() -> Result<()> {
        let server = MockServer::start_async().await;
        let package = server.mock(|when, then| {
            when.method(GET).path("/packages/p1");
            then.status(200).json_body(json!({"_id": "p1", "title": "Premium Hajj 2026"}));
        });
        let ctx = context(&server.base_url(), None).await;

        let Err(err) = handle_booking(&ctx, book_args()).await else {
            anyhow::bail!("booking sent without a mail account");
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("MAKKAH_EMAILJS_SERVICE_ID"));
        package.assert_hits(0);
        Ok(())
    }
}
