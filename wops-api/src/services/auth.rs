//! Login against the Usuarios table
//!
//! Issued tokens are opaque and are not checked by any other endpoint.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use wops_common::records::{scan, RecordSet, UserCredential};
use wops_common::store::RowStore;
use wops_common::Result;

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: Uuid,
    pub name: String,
    pub username: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RowStore>,
    users_table: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn RowStore>, users_table: impl Into<String>) -> Self {
        Self {
            store,
            users_table: users_table.into(),
        }
    }

    /// Case-insensitive username, exact password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Session>> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Ok(None);
        }

        let table = self.store.get_all_rows(&self.users_table).await?;
        let users: RecordSet<UserCredential> = scan(table);
        let user = users
            .records()
            .find(|u| u.username.to_lowercase() == username && u.password == password);

        match user {
            Some(user) => {
                info!(username = %user.username, "Login accepted");
                let name = if user.display_name.is_empty() {
                    user.username.clone()
                } else {
                    user.display_name.clone()
                };
                Ok(Some(Session {
                    token: Uuid::new_v4(),
                    name,
                    username: user.username.clone(),
                }))
            }
            None => {
                warn!(username = %username, "Login rejected");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wops_common::store::MemoryStore;

    async fn service() -> AuthService {
        let store = MemoryStore::new();
        store
            .insert_table(
                "Usuarios",
                &["Usuario", "Senha", "Nome"],
                &[&["Ana", "s3cret", "Ana Lima"], &["bia", "pw", ""]],
            )
            .await;
        AuthService::new(Arc::new(store), "Usuarios")
    }

    #[tokio::test]
    async fn test_login_case_insensitive_username() {
        let auth = service().await;
        let session = auth.authenticate(" ANA ", "s3cret").await.unwrap().unwrap();

        assert_eq!(session.name, "Ana Lima");
        assert_eq!(session.username, "Ana");
        assert_eq!(session.token.get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_password_is_exact() {
        let auth = service().await;
        assert!(auth.authenticate("ana", "S3CRET").await.unwrap().is_none());
        assert!(auth.authenticate("ana", "s3cret ").await.unwrap().is_none());
        assert!(auth.authenticate("", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_username() {
        let auth = service().await;
        let session = auth.authenticate("bia", "pw").await.unwrap().unwrap();
        assert_eq!(session.name, "bia");
    }
}
