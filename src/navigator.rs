//! Table list navigation and schema management
//!
//! Selection is local. Creating or dropping a table goes to the backend and
//! is followed by a refresh of the table list. Both are offered to `Admin`
//! users only; the backend enforces the real permission check.

use crate::confirm::Confirm;
use crate::error::{forbidden_error, not_found_error, ApiResult};
use crate::forms::CreateTableForm;
use crate::models::Table;
use crate::session::SessionController;
use tracing::{debug, info};

impl SessionController {
    pub fn can_manage_tables(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.can_manage_tables())
    }

    fn require_admin(&self) -> ApiResult<()> {
        if self.can_manage_tables() {
            Ok(())
        } else {
            Err(forbidden_error("Only administrators can manage tables."))
        }
    }

    /// Make `name` the active table. The list is not re-fetched.
    pub fn select_table(&mut self, name: &str) -> ApiResult<&Table> {
        if self.table(name).is_none() {
            return Err(not_found_error(format!("Table '{}' not found.", name)));
        }
        debug!("Selected table '{}'", name);
        self.selected = Some(name.to_string());
        self.selected_table()
            .ok_or_else(|| not_found_error(format!("Table '{}' not found.", name)))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Submit `form` and refresh the table list.
    ///
    /// Local validation failures never reach the backend; the message is
    /// left on the form.
    pub async fn create_table(&mut self, form: &mut CreateTableForm) -> ApiResult<()> {
        self.require_admin()?;
        if let Err(e) = form.submit(&self.client).await {
            return Err(self.handle_error(e));
        }
        info!("Created table '{}'", form.table_name);
        self.refresh_tables().await
    }

    /// Drop `name` after confirmation, then refresh the table list.
    ///
    /// Returns `Ok(false)` when the user declines; no request is sent.
    pub async fn delete_table(&mut self, name: &str, confirm: &mut dyn Confirm) -> ApiResult<bool> {
        self.require_admin()?;

        let prompt = format!(
            "Are you sure you want to delete the table \"{}\"? This action cannot be undone.",
            name
        );
        if !confirm.confirm(&prompt) {
            debug!("Drop of table '{}' cancelled", name);
            return Ok(false);
        }

        if let Err(e) = self.client.delete_table(name).await {
            return Err(self.handle_error(e));
        }

        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        self.refresh_tables().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiClient, SessionStore};
    use crate::error::AppError;
    use crate::models::{Role, User};
    use pretty_assertions::assert_eq;

    fn controller(role: Role) -> SessionController {
        let store = SessionStore::in_memory();
        store
            .set(User {
                id: 2,
                username: "someone".to_string(),
                role,
                token: "t".to_string(),
            })
            .unwrap();
        let client = ApiClient::builder()
            .base_url("http://127.0.0.1:9")
            .session(store)
            .build()
            .unwrap();
        let mut controller = SessionController::new(client);
        controller.tables = vec![Table::new("users", vec![]), Table::new("orders", vec![])];
        controller
    }

    #[test]
    fn test_select_table() {
        let mut c = controller(Role::User);
        assert_eq!(c.select_table("orders").unwrap().name, "orders");
        assert_eq!(c.selected_table().map(|t| t.name.as_str()), Some("orders"));

        let err = c.select_table("missing").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(c.selected_table().map(|t| t.name.as_str()), Some("orders"));

        c.clear_selection();
        assert!(c.selected_table().is_none());
    }

    #[test]
    fn test_role_gate() {
        assert!(controller(Role::Admin).can_manage_tables());
        assert!(!controller(Role::User).can_manage_tables());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_drop() {
        let mut c = controller(Role::User);
        let mut asked = false;
        let mut confirm = |_: &str| {
            asked = true;
            true
        };
        let err = c.delete_table("users", &mut confirm).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(!asked);
    }

    #[tokio::test]
    async fn test_declined_drop_sends_nothing() {
        let mut c = controller(Role::Admin);
        c.select_table("users").unwrap();

        let mut prompts = Vec::new();
        let mut decline = |p: &str| {
            prompts.push(p.to_string());
            false
        };
        assert!(!c.delete_table("users", &mut decline).await.unwrap());
        assert_eq!(
            prompts,
            vec!["Are you sure you want to delete the table \"users\"? This action cannot be undone."]
        );
        assert_eq!(c.tables().len(), 2);
        assert!(c.selected_table().is_some());
    }

    #[tokio::test]
    async fn test_invalid_create_stays_local() {
        let mut c = controller(Role::Admin);
        let mut form = CreateTableForm::new();
        let err = c.create_table(&mut form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(form.error().is_some());
        assert!(c.is_logged_in());
    }
}
