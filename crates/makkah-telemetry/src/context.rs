//! Per-command request identifiers.
//!
//! The binary runs each command inside [`with_request_context`]; HTTP clients
//! forward [`current_request_id`] as `x-request-id`. Tasks spawned from the
//! scope do not inherit it.

use std::future::Future;

use uuid::Uuid;

#[derive(Clone)]
struct CommandScope {
    request_id: String,
    command: String,
}

tokio::task_local! {
    static SCOPE: CommandScope;
}

/// Fresh random request identifier.
#[must_use]
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Request identifier of the enclosing command.
#[must_use]
pub fn current_request_id() -> Option<String> {
    SCOPE.try_with(|scope| scope.request_id.clone()).ok()
}

/// Label of the enclosing command.
#[must_use]
pub fn current_command() -> Option<String> {
    SCOPE.try_with(|scope| scope.command.clone()).ok()
}

/// Run `fut` with `request_id` and `command` visible to everything it awaits.
pub async fn with_request_context<F: Future>(
    request_id: impl Into<String>,
    command: impl Into<String>,
    fut: F,
) -> F::Output {
    let scope = CommandScope {
        request_id: request_id.into(),
        command: command.into(),
    };
    SCOPE.scope(scope, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_is_visible_only_inside() {
        let seen = with_request_context("req-7", "packages", async {
            (current_request_id(), current_command())
        })
        .await;
        assert_eq!(seen.0.as_deref(), Some("req-7"));
        assert_eq!(seen.1.as_deref(), Some("packages"));
        assert!(current_request_id().is_none());
    }

    #[test]
    fn request_ids_differ() {
        assert_ne!(new_request_id(), new_request_id());
    }
}
