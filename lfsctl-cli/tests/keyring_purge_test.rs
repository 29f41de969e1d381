//! Integration tests for logout/remove purge behavior against the real vault.
//!
//! These only assert anything where a functional keyring daemon is present;
//! on headless systems they skip rather than fail.

use lfsctl_core::model::{SecretKey, SecretKind, TenantId};
use lfsctl_core::store::{KeyringStore, Secret, SecretStore};

#[tokio::test]
async fn test_purge_tenant_scrubs_both_kinds() {
    let store = match KeyringStore::try_new("lfsctl-test-purge") {
        Ok(s) => s,
        Err(_) => {
            eprintln!("Skipping test: keyring unavailable");
            return;
        }
    };

    let tenant = TenantId::new("acme");
    let session = SecretKey::tenant_wide(SecretKind::SessionToken, tenant.clone());
    let provider = SecretKey::tenant_wide(SecretKind::ProviderToken, tenant.clone());

    if store.set(&session, &Secret::new("s1")).await.is_err() {
        eprintln!("Skipping test: keyring set failed");
        return;
    }
    if store.get(&session).await.unwrap().is_none() {
        eprintln!("Skipping test: keyring daemon not persisting");
        let _ = store.delete(&session).await;
        return;
    }
    store.set(&provider, &Secret::new("p1")).await.unwrap();

    store.purge_tenant(&tenant).await.unwrap();

    assert!(store.get(&session).await.unwrap().is_none());
    assert!(store.get(&provider).await.unwrap().is_none());
}

#[tokio::test]
async fn test_purge_absent_tenant_is_ok() {
    let store = match KeyringStore::try_new("lfsctl-test-purge-absent") {
        Ok(s) => s,
        Err(_) => return,
    };

    store
        .purge_tenant(&TenantId::new("never-logged-in"))
        .await
        .unwrap();
}
