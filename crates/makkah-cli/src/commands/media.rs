use makkah_client::MediaUploader;

use crate::cli::{OutputFormat, UploadArgs};
use crate::client::{AppContext, CliResult};
use crate::output::print_json;

pub(crate) async fn handle_upload(ctx: &AppContext, args: UploadArgs) -> CliResult<()> {
    let uploader =
        MediaUploader::from_config(&ctx.config.media, ctx.http.clone(), ctx.events.clone())?;
    let url = uploader.upload_path(&args.path).await?;
    match ctx.output {
        OutputFormat::Json => print_json(&serde_json::json!({ "url": url }))?,
        OutputFormat::Table => println!("{url}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::context;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use makkah_events::Event;
    use serde_json::json;

    #[tokio::test]
    async fn upload_posts_to_the_configured_cloud() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/demo-cloud/image/upload");
            then.status(200)
                .json_body(json!({"secure_url": "https://img.example.com/kaaba.png"}));
        });
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kaaba.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G'])?;

        let mut ctx = context("http://127.0.0.1:9", None).await;
        ctx.config.media.endpoint = server.base_url();
        ctx.config.media.cloud_name = Some("demo-cloud".into());
        ctx.config.media.upload_preset = Some("site_uploads".into());

        handle_upload(&ctx, UploadArgs { path })
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        assert!(ctx.events.recent().iter().any(|envelope| envelope.event
            == Event::MediaUploaded {
                url: "https://img.example.com/kaaba.png".into()
            }));
        Ok(())
    }

    #[tokio::test]
    async fn non_images_are_rejected_before_upload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("itinerary.pdf");
        std::fs::write(&path, b"%PDF-1.7")?;

        let mut ctx = context("http://127.0.0.1:9", None).await;
        ctx.config.media.cloud_name = Some("demo-cloud".into());
        ctx.config.media.upload_preset = Some("site_uploads".into());

        let Err(err) = handle_upload(&ctx, UploadArgs { path }).await else {
            anyhow::bail!("pdf accepted as an image");
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "Please select a valid image file");
        Ok(())
    }

    #[tokio::test]
    async fn missing_cloud_name_is_a_configuration_error() -> Result<()> {
        let ctx = context("http://127.0.0.1:9", None).await;
        let Err(err) = handle_upload(
            &ctx,
            UploadArgs {
                path: "photo.jpg".into(),
            },
        )
        .await
        else {
            anyhow::bail!("upload ran without a cloud name");
        };
        assert!(err.display_message().contains("MAKKAH_CLOUDINARY_CLOUD_NAME"));
        Ok(())
    }
}
