use anyhow::Context;

use shopledger_infra::{LedgerConfig, Services, ledger_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopledger_observability::init();

    let config = LedgerConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "starting shopledger");

    let store = ledger_store::open(&config.persistence)
        .await
        .context("failed to open ledger store")?;

    if let Some(admin) = &config.bootstrap_admin {
        shopledger_app::bootstrap_admin(store.as_ref(), admin)
            .await
            .context("failed to bootstrap admin user")?;
    }

    let services = Services::new(store, config.low_stock_threshold);
    let summary = services
        .reporting
        .summary(&shopledger_app::ops_identity())
        .await
        .context("failed to compute dashboard summary")?;

    let settings = services
        .settings
        .school_settings()
        .await
        .context("failed to read school settings")?;

    tracing::info!(
        school = %settings.school_name,
        total_items = summary.total_items,
        total_units_in_stock = summary.total_units_in_stock,
        total_categories = summary.total_categories,
        low_stock_items = summary.low_stock_items.len(),
        total_stock_value = %summary.total_stock_value,
        total_sales_revenue = %summary.total_sales_revenue,
        "ledger ready"
    );
    Ok(())
}
