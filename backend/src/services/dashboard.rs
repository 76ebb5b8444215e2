//! Dashboard aggregates

use serde::Serialize;
use shared::{Sale, TopProduct, UpcomingBirthday};
use sqlx::PgPool;

use super::{CatalogService, ExpenseService, Notifier, SaleService};
use crate::config::Config;
use crate::error::AppResult;

const DASHBOARD_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardCounts {
    pub sales: i64,
    pub expenses: i64,
    pub products: i64,
    pub clients: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub top_products: Vec<TopProduct>,
    pub latest_sales: Vec<Sale>,
    pub upcoming_birthdays: Vec<UpcomingBirthday>,
    pub counts: DashboardCounts,
}

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    sales: SaleService,
    expenses: ExpenseService,
    catalog: CatalogService,
}

impl DashboardService {
    pub fn new(db: PgPool, config: &Config, notifier: Notifier) -> Self {
        Self {
            sales: SaleService::new(db.clone(), config, notifier.clone()),
            expenses: ExpenseService::new(db.clone(), config, notifier),
            catalog: CatalogService::new(db, config),
        }
    }

    pub async fn summary(&self) -> AppResult<DashboardSummary> {
        let (top_products, latest_sales, upcoming_birthdays) = tokio::try_join!(
            self.sales.top_products(DASHBOARD_LIMIT),
            self.sales.latest_sales(DASHBOARD_LIMIT),
            self.catalog.upcoming_birthdays(DASHBOARD_LIMIT as usize),
        )?;

        let (sales, expenses, products, clients) = tokio::try_join!(
            self.sales.count_sales(),
            self.expenses.count_expenses(),
            self.catalog.count_products(),
            self.catalog.count_clients(),
        )?;

        Ok(DashboardSummary {
            top_products,
            latest_sales,
            upcoming_birthdays,
            counts: DashboardCounts {
                sales,
                expenses,
                products,
                clients,
            },
        })
    }
}
