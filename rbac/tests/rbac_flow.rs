use authz::types::Principal;
use authz::{Decision, HasPermissions, ProtectedOperation};
use permissions::{FailureCode, PermissionEntity};
use rbac::{Rbac, RbacConfig, RbacError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn sqlite_rbac(temp_dir: &TempDir) -> Rbac {
    let config = RbacConfig::from_yaml(&format!(
        "store:\n  backend: sqlite\n  database_path: {}\n",
        temp_dir.path().join("permissions.db").display()
    ))
    .unwrap();
    Rbac::from_config(config).await.unwrap()
}

#[tokio::test]
async fn permissions_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    let rbac = sqlite_rbac(&temp_dir).await;
    let seeded = rbac
        .seed_permissions(["Orders.Read", "Orders.Write", "Billing.View"], &cancel)
        .await
        .unwrap();
    assert!(seeded.succeeded());
    rbac.close().await.unwrap();

    let reopened = sqlite_rbac(&temp_dir).await;
    let found = reopened
        .manager()
        .find_by_names(&["orders.read", "BILLING.VIEW", "Orders.Delete"], &cancel)
        .await
        .unwrap();
    let mut names: Vec<String> = found.into_iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["Billing.View", "Orders.Read"]);
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn duplicate_and_stale_writes_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let rbac = sqlite_rbac(&temp_dir).await;
    let manager = rbac.manager();

    let mut created = PermissionEntity::new("Orders.Read");
    assert!(manager.create(&mut created, &cancel).await.unwrap().succeeded());

    let mut duplicate = PermissionEntity::new("orders.read");
    let result = manager.create(&mut duplicate, &cancel).await.unwrap();
    assert!(result.has_code(FailureCode::DuplicatePermissionName));
    assert_eq!(manager.get_all(&cancel).await.unwrap().len(), 1);

    let mut first = manager.find_by_id(&created.id, &cancel).await.unwrap().unwrap();
    let mut second = first.clone();

    first.name = "Orders.View".to_string();
    assert!(manager.update(&mut first, &cancel).await.unwrap().succeeded());

    second.name = "Orders.List".to_string();
    let stale = manager.update(&mut second, &cancel).await.unwrap();
    assert_eq!(stale.codes(), vec![FailureCode::ConcurrencyFailure]);

    let mut fresh = manager.find_by_id(&created.id, &cancel).await.unwrap().unwrap();
    assert_eq!(fresh.name, "Orders.View");
    fresh.name = "Orders.List".to_string();
    assert!(manager.update(&mut fresh, &cancel).await.unwrap().succeeded());

    rbac.close().await.unwrap();
}

#[tokio::test]
async fn stored_permissions_drive_decisions() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let rbac = sqlite_rbac(&temp_dir).await;
    rbac.seed_permissions(["Orders.Read", "Orders.Write", "Billing.View"], &cancel)
        .await
        .unwrap();

    // Claims come from whatever the host granted; here a subset of stored names
    let granted = rbac
        .manager()
        .find_by_names(&["Orders.Write"], &cancel)
        .await
        .unwrap();
    let clerk = Principal::user("clerk").with_permissions(granted.iter().map(|p| p.name.clone()));

    let edit = ProtectedOperation::new("edit_order")
        .requires(HasPermissions::new(["Orders.Read", "Orders.Write"]));
    let export = ProtectedOperation::new("export_invoices")
        .requires(HasPermissions::new(["Orders.Read", "Orders.Write"]))
        .requires(HasPermissions::new(["Billing.View"]));
    let public = ProtectedOperation::new("health");

    assert_eq!(rbac.authorize_operation(&clerk, &edit).unwrap(), Decision::Allow);
    assert_eq!(rbac.authorize_operation(&clerk, &export).unwrap(), Decision::Deny);
    assert_eq!(rbac.authorize_operation(&clerk, &public).unwrap(), Decision::Allow);
    assert_eq!(
        rbac.authorize_operation(&Principal::anonymous(), &public).unwrap(),
        Decision::Deny
    );

    let accountant = clerk.with_permission("billing.view");
    assert_eq!(
        rbac.authorize_operation(&accountant, &export).unwrap(),
        Decision::Allow
    );

    rbac.close().await.unwrap();
}

#[tokio::test]
async fn cancelled_token_stops_seeding() {
    let temp_dir = TempDir::new().unwrap();
    let rbac = sqlite_rbac(&temp_dir).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = rbac.seed_permissions(["Orders.Read"], &cancel).await;
    assert!(matches!(
        result,
        Err(RbacError::Permission(permissions::PermissionError::Cancelled))
    ));

    let live = CancellationToken::new();
    assert!(rbac.manager().get_all(&live).await.unwrap().is_empty());
    rbac.close().await.unwrap();
}
