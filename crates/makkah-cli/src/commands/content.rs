use std::path::Path;

use anyhow::anyhow;
use makkah_api_models::{Collection, Resource};
use makkah_client::{AdminBoard, UserBoard, split_inclusions};
use makkah_session::Route;
use serde_json::Value;

use crate::cli::{IdArgs, OutputFormat, RecordCommand, UserCommand};
use crate::client::{AppContext, CliError, CliResult, api_failure};
use crate::output::{Tabular, print_json, render_list};

pub(crate) async fn handle_records<R>(
    ctx: &AppContext,
    route: &Route,
    command: RecordCommand,
) -> CliResult<()>
where
    R: Resource + Tabular,
{
    let mut board = AdminBoard::<R>::new(ctx.admit(route).await?);
    match command {
        RecordCommand::List => {
            if let Err(err) = board.load().await {
                return Err(api_failure(err, board.error()));
            }
            render_list(board.items(), ctx.output)
        }
        RecordCommand::Create(args) => {
            let draft = read_draft::<R>(&args.file)?;
            let saved = match board.save(&draft, None).await {
                Ok(saved) => saved,
                Err(err) => return Err(api_failure(err, board.error())),
            };
            report_saved(saved.as_ref(), None, ctx.output)
        }
        RecordCommand::Update(args) => {
            let draft = read_draft::<R>(&args.file)?;
            let saved = match board.save(&draft, Some(&args.id)).await {
                Ok(saved) => saved,
                Err(err) => return Err(api_failure(err, board.error())),
            };
            report_saved(saved.as_ref(), Some(&args.id), ctx.output)
        }
        RecordCommand::Delete(IdArgs { id }) => {
            if let Err(err) = board.delete(&id).await {
                return Err(api_failure(err, board.error()));
            }
            println!("Deleted {} {id}.", R::COLLECTION.singular());
            Ok(())
        }
    }
}

pub(crate) async fn handle_users(ctx: &AppContext, command: UserCommand) -> CliResult<()> {
    let mut board = UserBoard::new(ctx.admit(&Route::AdminUsers).await?);
    if let Err(err) = board.load().await {
        return Err(api_failure(err, board.error()));
    }
    match command {
        UserCommand::List => render_list(board.items(), ctx.output),
        UserCommand::ToggleRole(IdArgs { id }) => {
            let role = match board.toggle_role(&id).await {
                Ok(role) => role,
                Err(err) => return Err(api_failure(err, board.error())),
            };
            match ctx.output {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "id": id,
                    "role": role.as_str(),
                }))?,
                OutputFormat::Table => println!("{id} is now {}.", role.as_str()),
            }
            Ok(())
        }
    }
}

fn report_saved<R: Resource>(
    saved: Option<&R>,
    editing: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    let singular = R::COLLECTION.singular();
    match (format, saved) {
        (OutputFormat::Json, Some(record)) => print_json(record)?,
        (OutputFormat::Json, None) => print_json(&serde_json::json!({ "id": editing }))?,
        (OutputFormat::Table, _) => {
            let id = editing.or_else(|| saved.and_then(Resource::id));
            match id {
                Some(id) => println!("Saved {singular} {id}."),
                None => println!("Saved {singular}."),
            }
        }
    }
    Ok(())
}

/// Read a record draft from a JSON document.
fn read_draft<R: Resource>(path: &Path) -> CliResult<R> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        CliError::failure(anyhow!("failed to read {}: {err}", path.display()))
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|err| {
        CliError::validation(format!("{} is not valid JSON: {err}", path.display()))
    })?;
    draft_from_value(value).map_err(|err| {
        CliError::validation(format!(
            "{} is not a valid {}: {err}",
            path.display(),
            R::COLLECTION.singular()
        ))
    })
}

fn draft_from_value<R: Resource>(mut value: Value) -> serde_json::Result<R> {
    // Package drafts may list inclusions as one comma separated string.
    if R::COLLECTION == Collection::Packages
        && let Some(Value::String(raw)) = value.get("inclusions")
    {
        let items = split_inclusions(raw);
        value["inclusions"] = Value::from(items);
    }
    serde_json::from_value(value)
}
