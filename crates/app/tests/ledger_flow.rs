use std::sync::Arc;

use rust_decimal_macros::dec;
use shopledger_app::{bootstrap_admin, ops_identity};
use shopledger_auth::{NewUser, Role};
use shopledger_core::ErrorKind;
use shopledger_infra::ledger_store::InMemoryLedgerStore;
use shopledger_infra::{BootstrapAdmin, Services, SharedLedgerStore};
use shopledger_inventory::{EntryFilter, EntryKind, NewCategory, NewItem, RecordSale, StockIn};

async fn boot() -> Services {
    let store: SharedLedgerStore = Arc::new(InMemoryLedgerStore::new());
    bootstrap_admin(
        store.as_ref(),
        &BootstrapAdmin {
            email: "admin@school.local".to_string(),
            password: "admin123".to_string(),
        },
    )
    .await
    .unwrap();
    Services::new(store, 10)
}

fn new_user(email: &str, role: Role) -> NewUser {
    NewUser {
        email: email.to_string(),
        password: "secret123".to_string(),
        name: None,
        role: Some(role),
    }
}

#[tokio::test]
async fn shop_day_from_login_to_dashboard() {
    let services = boot().await;

    let session = services.users.login("admin@school.local", "admin123").await.unwrap();
    let admin = services.users.current_identity(&session).await.unwrap();
    assert_eq!(admin.role, Role::Admin);

    services
        .users
        .create_user(&admin, new_user("counter@school.local", Role::Staff))
        .await
        .unwrap();
    services
        .users
        .create_user(&admin, new_user("auditor@school.local", Role::Viewer))
        .await
        .unwrap();

    let staff_session = services.users.login("counter@school.local", "secret123").await.unwrap();
    let staff = services.users.current_identity(&staff_session).await.unwrap();

    let stationery = services
        .catalog
        .create_category(
            &staff,
            NewCategory {
                name: "Stationery".to_string(),
                description: Some("Pens, pencils, notebooks".to_string()),
            },
        )
        .await
        .unwrap();
    let pen = services
        .ledger
        .create_item(
            &staff,
            NewItem {
                cost_price: dec!(10),
                sale_price: dec!(15),
                ..NewItem::new("Pen", stationery.id)
            },
        )
        .await
        .unwrap();
    assert_eq!(pen.sku, "STA-PE-XX");
    assert_eq!(pen.stock, 0);

    let movement = services
        .ledger
        .stock_in(
            &staff,
            pen.id,
            StockIn {
                quantity: 50,
                price: None,
                reference: Some("Supplier delivery".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(movement.message, "Added 50 units. New stock: 50");

    let receipt = services
        .ledger
        .record_sale(
            &staff,
            pen.id,
            RecordSale {
                quantity: 12,
                price: None,
                reference: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.message, "Sold 12 unit(s) @ 15. Remaining stock: 38");
    assert_eq!(receipt.revenue, dec!(180));

    let auditor_session = services.users.login("auditor@school.local", "secret123").await.unwrap();
    let auditor = services.users.current_identity(&auditor_session).await.unwrap();
    let err = services
        .ledger
        .record_sale(
            &auditor,
            pen.id,
            RecordSale {
                quantity: 1,
                price: None,
                reference: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let entries = services
        .reporting
        .list_entries(&auditor, &EntryFilter::default())
        .await
        .unwrap();
    let kinds: Vec<EntryKind> = entries.iter().map(|r| r.entry.kind).collect();
    assert_eq!(kinds, vec![EntryKind::Sale, EntryKind::StockIn]);

    let summary = services.reporting.summary(&ops_identity()).await.unwrap();
    assert_eq!(summary.total_items, 1);
    assert_eq!(summary.total_categories, 1);
    assert_eq!(summary.total_units_in_stock, 38);
    assert_eq!(summary.total_stock_value, dec!(380));
    assert_eq!(summary.total_sales_revenue, dec!(15));
    assert!(summary.low_stock_items.is_empty());

    services.users.logout(staff_session);
}

#[tokio::test]
async fn ops_identity_is_read_only() {
    let services = boot().await;
    let err = services
        .catalog
        .create_category(
            &ops_identity(),
            NewCategory {
                name: "Books".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
