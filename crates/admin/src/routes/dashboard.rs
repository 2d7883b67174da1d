//! Dashboard page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::DashboardRepository;
use crate::db::dashboard::LowStockItem;
use crate::error::Result;
use crate::middleware::Staff;
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub staff_email: String,
    pub current_path: &'static str,
    pub total_orders: i64,
    pub revenue: String,
    pub product_count: i64,
    pub orders_by_status: Vec<(String, i64)>,
    pub low_stock: Vec<LowStockItem>,
}

/// `GET /admin`
#[instrument(skip(state, staff))]
pub async fn index(State(state): State<AppState>, Staff(staff): Staff) -> Result<DashboardPage> {
    let summary = DashboardRepository::new(state.pool())
        .summary(state.config().low_stock_threshold)
        .await?;

    Ok(DashboardPage {
        staff_email: staff.email.to_string(),
        current_path: "/admin",
        total_orders: summary.total_orders(),
        revenue: state.config().currency.format(summary.paid_revenue),
        product_count: summary.product_count,
        orders_by_status: summary
            .orders_by_status
            .iter()
            .map(|(status, n)| (status.as_str().replace('_', " "), *n))
            .collect(),
        low_stock: summary.low_stock,
    })
}
