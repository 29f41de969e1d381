//! Credential coordinator.
//!
//! [`Coordinator`] is the façade every CLI command depends on: it glues the
//! session directory, the secret store, the transport, and the device flow
//! into the four credential operations (login, logout, tenant selection,
//! token resolution). Presentation stays outside; login takes a callback
//! through which the CLI shows the verification URI and user code.

use crate::api::ApiClient;
use crate::device::{AuthGrant, DeviceFlow, DeviceHandshake, Sleeper, TokioSleeper};
use crate::error::Error;
use crate::model::{SecretKey, SecretKind, TenantId};
use crate::session::SessionStore;
use crate::store::{find_token, Secret, SecretStore};

/// Façade over session state, secret storage, and the device flow.
pub struct Coordinator {
    session: SessionStore,
    store: Box<dyn SecretStore>,
}

impl Coordinator {
    /// Create a coordinator over the given session directory and secret
    /// store. The backend is selected per deployment, never per call.
    pub fn new(session: SessionStore, store: Box<dyn SecretStore>) -> Self {
        Self { session, store }
    }

    /// The session directory.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The secret store.
    pub fn secrets(&self) -> &dyn SecretStore {
        self.store.as_ref()
    }

    /// Log in to a tenant via the device flow.
    ///
    /// `on_handshake` is invoked once with the handshake so the caller can
    /// present the verification URI and user code; the call then blocks
    /// until the provider reports a terminal outcome.
    ///
    /// On success the previous token is revoked server-side (best-effort,
    /// when the grant is repo-scoped), every locally stored secret for the
    /// tenant is replaced, the tenant record is upserted, and the tenant
    /// becomes current when nothing was selected yet.
    pub async fn login<F>(&self, tenant: TenantId, on_handshake: F) -> Result<AuthGrant, Error>
    where
        F: FnOnce(&DeviceHandshake),
    {
        self.login_with_sleeper(tenant, on_handshake, TokioSleeper)
            .await
    }

    /// [`login`](Self::login) with an injected poll sleeper.
    pub async fn login_with_sleeper<F, S>(
        &self,
        tenant: TenantId,
        on_handshake: F,
        sleeper: S,
    ) -> Result<AuthGrant, Error>
    where
        F: FnOnce(&DeviceHandshake),
        S: Sleeper,
    {
        let client = ApiClient::new(self.endpoint()?);
        let flow = DeviceFlow::with_sleeper(&client, sleeper);

        let handshake = flow.request_device_code(&tenant).await?;
        on_handshake(&handshake);

        let grant = flow.wait_for_authorization(&tenant, &handshake).await?;

        if grant.repo_names.is_some() {
            // The grant replaces any previously issued token; revoke it
            // server-side before the local copy disappears. Failure here
            // never blocks login.
            if let Ok(Some(old)) = find_token(self.store.as_ref(), SecretKind::SessionToken, &tenant).await
            {
                if let Err(e) = client.revoke_token(&old).await {
                    tracing::warn!(tenant = %tenant, "failed to revoke previous token: {}", e);
                }
            }
        }

        self.store.purge_tenant(&tenant).await?;

        let secret = Secret::new(grant.token.clone());
        match &grant.repo_names {
            Some(repos) => {
                for repo in repos {
                    let key = SecretKey::repo_scoped(SecretKind::SessionToken, tenant.clone(), repo);
                    self.store.set(&key, &secret).await?;
                }
            }
            None => {
                let key = SecretKey::tenant_wide(SecretKind::SessionToken, tenant.clone());
                self.store.set(&key, &secret).await?;
            }
        }

        self.session
            .upsert_tenant(tenant.clone(), tenant.as_str(), &grant.permission)?;
        if self.session.current_tenant()?.is_none() {
            self.session.set_current_tenant(Some(tenant))?;
        }

        Ok(grant)
    }

    /// Log out of a tenant (the current one when omitted).
    ///
    /// Attempts server-side revocation of the stored token, ignoring any
    /// failure; the local store is the source of truth for "logged out".
    /// All local secrets for the tenant are removed unconditionally and the
    /// current-tenant pointer is cleared when it matches. Idempotent.
    pub async fn logout(&self, tenant: Option<TenantId>) -> Result<TenantId, Error> {
        let tenant = self.effective_tenant(tenant)?;

        if let Ok(endpoint) = self.endpoint() {
            if let Ok(Some(token)) =
                find_token(self.store.as_ref(), SecretKind::SessionToken, &tenant).await
            {
                let client = ApiClient::new(endpoint);
                if let Err(e) = client.revoke_token(&token).await {
                    tracing::warn!(tenant = %tenant, "server-side revocation failed: {}", e);
                }
            }
        }

        self.store.purge_tenant(&tenant).await?;

        if self.session.current_tenant()?.as_ref() == Some(&tenant) {
            self.session.set_current_tenant(None)?;
        }

        Ok(tenant)
    }

    /// Resolve an authenticated client for a tenant (the current one when
    /// omitted).
    ///
    /// Fails with a usage error when no endpoint is configured, no tenant
    /// is resolvable, or no token is stored for the tenant.
    pub async fn resolve_token(&self, tenant: Option<TenantId>) -> Result<ApiClient, Error> {
        let endpoint = self.endpoint()?;
        let tenant = self.effective_tenant(tenant)?;

        let token = find_token(self.store.as_ref(), SecretKind::SessionToken, &tenant)
            .await?
            .ok_or_else(|| {
                Error::usage(format!(
                    "No token stored for tenant '{}'. Run 'lfsctl login {}' first.",
                    tenant, tenant
                ))
            })?;

        Ok(ApiClient::with_token(endpoint, token))
    }

    /// Switch the current tenant.
    ///
    /// Fails with a usage error when the tenant is not in the known list.
    pub fn select_tenant(&self, tenant: &TenantId) -> Result<(), Error> {
        if self.session.tenant(tenant)?.is_none() {
            return Err(Error::usage(format!(
                "Tenant '{}' not found. Use 'lfsctl login' first.",
                tenant
            )));
        }
        self.session.set_current_tenant(Some(tenant.clone()))?;
        Ok(())
    }

    /// Remove a tenant record entirely.
    ///
    /// Cascades: local secrets are purged and the current-tenant pointer is
    /// cleared when it pointed at the removed tenant.
    pub async fn remove_tenant(&self, tenant: &TenantId) -> Result<(), Error> {
        self.store.purge_tenant(tenant).await?;
        self.session.remove_tenant(tenant)?;
        Ok(())
    }

    fn endpoint(&self) -> Result<String, Error> {
        let endpoint = self.session.api_endpoint()?;
        if endpoint.is_empty() {
            return Err(Error::usage(
                "API endpoint not configured. Set with: lfsctl config set-endpoint <url>",
            ));
        }
        Ok(endpoint)
    }

    fn effective_tenant(&self, tenant: Option<TenantId>) -> Result<TenantId, Error> {
        match tenant {
            Some(tenant) => Ok(tenant),
            None => self
                .session
                .current_tenant()?
                .ok_or_else(|| Error::usage("No tenant specified and no current tenant selected")),
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn test_coordinator() -> (Coordinator, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let session =
            SessionStore::load_from_path(temp_dir.path().join("session.json")).unwrap();
        let coordinator = Coordinator::new(session, Box::new(MemoryStore::new()));
        (coordinator, temp_dir)
    }

    #[tokio::test]
    async fn test_resolve_token_requires_endpoint() {
        let (coordinator, _temp) = test_coordinator();
        // A fresh session may still carry an endpoint from the environment.
        coordinator.session().set_api_endpoint("").unwrap();

        let result = coordinator.resolve_token(Some(TenantId::new("acme"))).await;
        assert!(matches!(result, Err(Error::Usage { .. })));
    }

    #[tokio::test]
    async fn test_resolve_token_requires_tenant() {
        let (coordinator, _temp) = test_coordinator();
        coordinator
            .session()
            .set_api_endpoint("https://lfs.example.com")
            .unwrap();

        let result = coordinator.resolve_token(None).await;
        assert!(matches!(result, Err(Error::Usage { .. })));
    }

    #[tokio::test]
    async fn test_resolve_token_requires_stored_token() {
        let (coordinator, _temp) = test_coordinator();
        coordinator
            .session()
            .set_api_endpoint("https://lfs.example.com")
            .unwrap();

        let result = coordinator.resolve_token(Some(TenantId::new("acme"))).await;
        assert!(matches!(result, Err(Error::Usage { .. })));
    }

    #[tokio::test]
    async fn test_select_unknown_tenant_fails() {
        let (coordinator, _temp) = test_coordinator();

        let result = coordinator.select_tenant(&TenantId::new("ghost"));
        assert!(matches!(result, Err(Error::Usage { .. })));
    }

    #[tokio::test]
    async fn test_select_known_tenant() {
        let (coordinator, _temp) = test_coordinator();
        coordinator
            .session()
            .upsert_tenant(TenantId::new("acme"), "acme", "member")
            .unwrap();

        coordinator.select_tenant(&TenantId::new("acme")).unwrap();
        assert_eq!(
            coordinator.session().current_tenant().unwrap(),
            Some(TenantId::new("acme"))
        );
    }

    #[tokio::test]
    async fn test_remove_tenant_cascades() {
        let (coordinator, _temp) = test_coordinator();
        let tenant = TenantId::new("acme");

        coordinator
            .session()
            .upsert_tenant(tenant.clone(), "acme", "member")
            .unwrap();
        coordinator
            .session()
            .set_current_tenant(Some(tenant.clone()))
            .unwrap();
        coordinator
            .secrets()
            .set(
                &SecretKey::tenant_wide(SecretKind::SessionToken, "acme"),
                &Secret::new("tok"),
            )
            .await
            .unwrap();

        coordinator.remove_tenant(&tenant).await.unwrap();

        assert!(coordinator.session().tenants().unwrap().is_empty());
        assert!(coordinator.session().current_tenant().unwrap().is_none());
        assert!(coordinator
            .secrets()
            .get(&SecretKey::tenant_wide(SecretKind::SessionToken, "acme"))
            .await
            .unwrap()
            .is_none());
    }
}
