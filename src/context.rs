//! Request-scoped context: the bundle of `(transaction, current user, current terminal,
//! node)` every handler operates against. Built once per request by the composable
//! extractor-equivalents below, never carried as ambient global state.

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::CoreError;
use crate::till::Till;
use crate::user::CurrentUser;

/// The event-subtree scope every admin query is constrained to
/// (`node_id = ANY(ids_to_event_node)`), per the external tree collaborator.
#[derive(Debug, Clone, Copy)]
pub struct NodeId(pub i64);

/// Ready-to-use request context handed to a handler once all required guards passed.
pub struct RequestContext<'a> {
    pub tx: Transaction<'a, Postgres>,
    pub current_user: Option<CurrentUser>,
    pub current_terminal: Option<Till>,
    pub node: Option<NodeId>,
}

/// Begins a transaction for the lifetime of the request. The caller commits on success;
/// dropping the context without committing rolls back.
pub async fn with_db_transaction(pool: &PgPool) -> Result<Transaction<'_, Postgres>, CoreError> {
    pool.begin().await.map_err(CoreError::from)
}

/// Fails unless a user is logged in, mirroring the source's `requires_user` decorator.
pub fn requires_user(current_user: Option<CurrentUser>) -> Result<CurrentUser, CoreError> {
    current_user.ok_or_else(|| CoreError::AccessDenied { message: "login required".to_string() })
}

/// Fails unless the bearer token resolved to a registered terminal.
pub fn requires_terminal(current_terminal: Option<Till>) -> Result<Till, CoreError> {
    current_terminal.ok_or_else(|| CoreError::AccessDenied { message: "terminal registration required".to_string() })
}

/// Fails unless a node scope was resolved from the bearer token or path.
pub fn requires_node(node: Option<NodeId>) -> Result<NodeId, CoreError> {
    node.ok_or_else(|| CoreError::invalid_argument("node could not be resolved"))
}

/// Fails unless `current_user` holds `privilege`.
pub fn requires_privilege(current_user: &CurrentUser, privilege: crate::user::Privilege) -> Result<(), CoreError> {
    if current_user.requires(privilege) {
        Ok(())
    } else {
        Err(CoreError::AccessDenied { message: format!("{privilege:?} required") })
    }
}
