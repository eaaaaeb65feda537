use std::io::{self, IsTerminal};

use anyhow::anyhow;
use makkah_client::MediaUploader;
use makkah_session::{
    Admission, Guard, ProfileUpdate, Route, SignInView, View, sign_in_view,
};
use tracing::info;

use crate::cli::{CredentialArgs, LoginArgs, OutputFormat, ProfileArgs, ResetArgs, ViewArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{print_json, render_session};

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    ctx.config.identity.require_api_key()?;
    let password = resolve_password(&args.credentials)?;
    let identity = ctx
        .session
        .begin_sign_in(args.credentials.email.trim(), &password)
        .await?;
    info!(user = identity.label(), "signed in");

    let session = ctx.session.settled().await;
    let next = match sign_in_view(&session, args.redirect.as_deref()) {
        SignInView::Redirect(route) => route,
        SignInView::Form | SignInView::Loading => Route::Home,
    };
    match ctx.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "user": identity.label(),
            "role": session.role.map(|role| role.as_str()),
            "next": next.path(),
        }))?,
        OutputFormat::Table => {
            println!("Signed in as {}.", identity.label());
            println!("Continue at {}", next.path());
        }
    }
    Ok(())
}

pub(crate) async fn handle_register(ctx: &AppContext, args: CredentialArgs) -> CliResult<()> {
    ctx.config.identity.require_api_key()?;
    let password = resolve_password(&args)?;
    let identity = ctx
        .session
        .begin_registration(args.email.trim(), &password)
        .await?;
    if let Err(err) = ctx.session.begin_email_verification().await {
        tracing::warn!(error = %err, "verification email not sent");
    }
    let _ = ctx.session.settled().await;
    println!(
        "Account created for {}. Check your inbox to verify the address.",
        identity.label()
    );
    Ok(())
}

pub(crate) async fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    let session = ctx.session.settled().await;
    if !session.is_signed_in() {
        println!("Already signed out.");
        return Ok(());
    }
    ctx.session.begin_sign_out().await?;
    println!("Signed out.");
    Ok(())
}

pub(crate) async fn handle_whoami(ctx: &AppContext) -> CliResult<()> {
    let session = ctx.session.settled().await;
    render_session(&session, ctx.output)
}

pub(crate) async fn handle_verify_email(ctx: &AppContext) -> CliResult<()> {
    ctx.config.identity.require_api_key()?;
    let _ = ctx.session.settled().await;
    ctx.session.begin_email_verification().await?;
    println!("Verification email sent.");
    Ok(())
}

pub(crate) async fn handle_reset_password(ctx: &AppContext, args: ResetArgs) -> CliResult<()> {
    ctx.config.identity.require_api_key()?;
    ctx.session.begin_password_reset(args.email.trim()).await?;
    println!("Password reset email sent to {}.", args.email.trim());
    Ok(())
}

pub(crate) async fn handle_profile(ctx: &AppContext, args: ProfileArgs) -> CliResult<()> {
    ctx.config.identity.require_api_key()?;
    let session = ctx.session.settled().await;
    if !session.is_signed_in() {
        return Err(CliError::validation("Please sign in first"));
    }

    let photo_url = match (&args.photo, args.photo_url) {
        (Some(path), _) => {
            let uploader = MediaUploader::from_config(
                &ctx.config.media,
                ctx.http.clone(),
                ctx.events.clone(),
            )?;
            Some(uploader.upload_path(path).await?)
        }
        (None, url) => url,
    };
    if args.name.is_none() && photo_url.is_none() {
        return Err(CliError::validation(
            "nothing to update; pass --name, --photo-url or --photo",
        ));
    }

    let update = ProfileUpdate {
        display_name: args.name,
        photo_url,
    };
    let identity = ctx.session.begin_profile_update(update).await?;
    let session = ctx.session.settled().await;
    render_session(&session, ctx.output)?;
    info!(user = identity.label(), "profile updated");
    Ok(())
}

/// Evaluate the guard for `path` against the settled session.
pub(crate) async fn handle_view(ctx: &AppContext, args: ViewArgs) -> CliResult<()> {
    let route = Route::parse(&args.path);
    let session = ctx.session.settled().await;

    let (outcome, target) = match &route {
        Route::SignIn { redirect } => match sign_in_view(&session, redirect.as_deref()) {
            SignInView::Redirect(next) => ("redirect", Some(next)),
            SignInView::Form => ("content", None),
            SignInView::Loading => ("loading", None),
        },
        other => {
            let admission = Guard::for_route(other).admit(&session, other);
            let outcome = match admission.render() {
                View::Content => "content",
                View::Placeholder if matches!(admission, Admission::Loading) => "loading",
                View::Placeholder => "redirect",
            };
            (outcome, admission.redirect_target().cloned())
        }
    };

    match ctx.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "route": route.path(),
            "outcome": outcome,
            "redirect": target.as_ref().map(Route::path),
        }))?,
        OutputFormat::Table => match &target {
            Some(target) => println!("{} -> {}", route.path(), target.path()),
            None => println!("{} {outcome}", route.path()),
        },
    }
    Ok(())
}

fn resolve_password(args: &CredentialArgs) -> CliResult<String> {
    if let Some(value) = &args.password {
        if value.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        return Ok(value.clone());
    }

    if io::stdin().is_terminal() {
        let password = rpassword::prompt_password("Password: ").map_err(|err| {
            CliError::failure(anyhow!("failed to read password from stdin: {err}"))
        })?;
        if password.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        Ok(password)
    } else {
        Err(CliError::validation(
            "password required; supply via --password or MAKKAH_PASSWORD when running non-interactively",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::context;
    use anyhow::Result;
    use makkah_api_models::Role;

    #[test]
    fn blank_password_is_rejected() {
        let args = CredentialArgs {
            email: "pilgrim@example.com".into(),
            password: Some(String::new()),
        };
        let Err(err) = resolve_password(&args) else {
            panic!("blank password accepted");
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn login_requires_identity_key() -> Result<()> {
        let ctx = context("http://127.0.0.1:9", None).await;
        let args = LoginArgs {
            credentials: CredentialArgs {
                email: "pilgrim@example.com".into(),
                password: Some("secret123".into()),
            },
            redirect: None,
        };
        let Err(err) = handle_login(&ctx, args).await else {
            anyhow::bail!("login ran without an api key");
        };
        assert!(err.display_message().contains("MAKKAH_FIREBASE_API_KEY"));
        Ok(())
    }

    #[tokio::test]
    async fn view_reports_guard_outcomes() -> Result<()> {
        let ctx = context("http://127.0.0.1:9", Some(Role::User)).await;
        handle_view(&ctx, ViewArgs { path: "/admin".into() }).await?;
        handle_view(&ctx, ViewArgs { path: "/Shop".into() }).await?;
        handle_view(
            &ctx,
            ViewArgs {
                path: "/login?redirect=%2FBlog".into(),
            },
        )
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn profile_requires_a_change() -> Result<()> {
        let mut ctx = context("http://127.0.0.1:9", Some(Role::User)).await;
        ctx.config.identity.api_key = Some("test-key".into());
        let args = ProfileArgs {
            name: None,
            photo_url: None,
            photo: None,
        };
        let Err(err) = handle_profile(&ctx, args).await else {
            anyhow::bail!("empty profile update accepted");
        };
        assert!(err.display_message().starts_with("nothing to update"));
        Ok(())
    }
}
