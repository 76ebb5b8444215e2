//! Report rendering
//!
//! Turns sale lists and cash register sessions into CSV documents. Times are
//! printed in the business timezone.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{CashRegisterDetail, SaleWithLines};

use crate::error::{AppError, AppResult};

/// CSV report renderer
#[derive(Debug, Clone, Copy)]
pub struct ReportRenderer {
    offset: FixedOffset,
}

/// One sale per row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaleReportRow {
    pub code: String,
    pub sold_at: String,
    pub seller: String,
    pub buyer: String,
    pub payment_method: String,
    pub items: usize,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: String,
}

/// Cash register report row: the close summary, then sales, then expenses
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CashReportRow {
    pub section: &'static str,
    pub code: String,
    pub date: String,
    pub description: String,
    pub payment_method: String,
    pub amount: Decimal,
}

impl ReportRenderer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%Y-%m-%d %H:%M").to_string()
    }

    /// Serialize rows into CSV with a header line
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }

    pub fn sale_rows(&self, sales: &[SaleWithLines]) -> Vec<SaleReportRow> {
        sales
            .iter()
            .map(|s| SaleReportRow {
                code: s.sale.code.clone(),
                sold_at: self.local(s.sale.sold_at),
                seller: s.seller_name.clone().unwrap_or_default(),
                buyer: s.sale.buyer_name.clone(),
                payment_method: s.sale.payment_method.as_str().to_string(),
                items: s.lines.len(),
                subtotal: s.sale.subtotal,
                discount: s.sale.discount,
                total: s.sale.total,
                status: if s.sale.active { "ACTIVA" } else { "ANULADA" }.to_string(),
            })
            .collect()
    }

    pub fn sales_csv(&self, sales: &[SaleWithLines]) -> AppResult<String> {
        Self::export_to_csv(&self.sale_rows(sales))
    }

    pub fn cash_register_rows(&self, detail: &CashRegisterDetail) -> Vec<CashReportRow> {
        let session = &detail.session;
        let date = self.local(session.closed_at.unwrap_or(session.opened_at));
        let summary = |description: &str, amount: Decimal| CashReportRow {
            section: "summary",
            code: session.code.clone(),
            date: date.clone(),
            description: description.to_string(),
            payment_method: String::new(),
            amount,
        };

        let mut rows = vec![
            summary("opening_balance", session.opening_balance),
            summary("cash_sales", session.cash_sales),
            summary("electronic_sales", session.electronic_sales),
            summary("cash_expenses", session.cash_expenses),
            summary("electronic_expenses", session.electronic_expenses),
            summary("cash_close", session.cash_close),
            summary("electronic_close", session.electronic_close),
            summary("net_close", session.net_close),
        ];

        rows.extend(detail.sales.iter().map(|sale| CashReportRow {
            section: if sale.active { "sale" } else { "voided_sale" },
            code: sale.code.clone(),
            date: self.local(sale.sold_at),
            description: sale.buyer_name.clone(),
            payment_method: sale.payment_method.as_str().to_string(),
            amount: sale.total,
        }));

        rows.extend(detail.expenses.iter().map(|view| CashReportRow {
            section: "expense",
            code: view.expense.code.clone(),
            date: self.local(view.expense.spent_at),
            description: view.expense.memo.clone(),
            payment_method: format!("{:?}", view.expense.payment_method).to_uppercase(),
            amount: view.expense.amount,
        }));

        rows
    }

    pub fn cash_register_csv(&self, detail: &CashRegisterDetail) -> AppResult<String> {
        Self::export_to_csv(&self.cash_register_rows(detail))
    }
}
