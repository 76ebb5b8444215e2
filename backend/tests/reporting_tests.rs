//! Report rendering tests

use chrono::{TimeZone, Utc};
use pos_inventory_backend::services::ReportRenderer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    business_offset, CashRegisterDetail, CashRegisterSession, Expense, ExpenseKind, ExpensePaymentMethod, ExpenseView,
    PaymentMethod, Sale, SaleWithLines,
};
use uuid::Uuid;

fn sale(code: &str, active: bool, total: Decimal) -> Sale {
    let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
    Sale {
        id: Uuid::new_v4(),
        seq: 1,
        code: code.to_string(),
        sold_at: at,
        edited_at: None,
        voided_at: None,
        voided_by: None,
        seller_id: Uuid::new_v4(),
        buyer_name: "Ana".to_string(),
        active,
        subtotal: total,
        discount: dec!(0),
        total,
        payment_method: PaymentMethod::Cash,
        cash_amount: None,
        electronic_amount: None,
        cash_register_session_id: None,
        created_at: at,
    }
}

fn expense(code: &str, amount: Decimal) -> ExpenseView {
    let at = Utc.with_ymd_and_hms(2024, 3, 5, 16, 0, 0).unwrap();
    ExpenseView {
        expense: Expense {
            id: Uuid::new_v4(),
            seq: 1,
            code: code.to_string(),
            user_id: Uuid::new_v4(),
            category_id: None,
            kind: ExpenseKind::Variable,
            memo: "Bolsas".to_string(),
            detail: None,
            spent_at: at,
            amount,
            payment_method: ExpensePaymentMethod::Cash,
            cash_register_session_id: None,
            created_at: at,
        },
        user_name: Some("Ana".to_string()),
        category_name: None,
    }
}

fn detail() -> CashRegisterDetail {
    CashRegisterDetail {
        session: CashRegisterSession {
            id: Uuid::new_v4(),
            seq: 1,
            code: "CA0001".to_string(),
            user_id: Uuid::new_v4(),
            opened_at: Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
            closed_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 23, 0, 0).unwrap()),
            opening_balance: dec!(10),
            cash_sales: dec!(150),
            electronic_sales: dec!(0),
            cash_expenses: dec!(20),
            electronic_expenses: dec!(0),
            cash_close: dec!(130),
            electronic_close: dec!(0),
            net_close: dec!(140),
        },
        user_name: Some("Ana".to_string()),
        sales: vec![sale("V0001", true, dec!(150)), sale("V0002", false, dec!(30))],
        expenses: vec![expense("G0001", dec!(20))],
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_sales_csv_has_header_and_local_times() {
        let renderer = ReportRenderer::new(business_offset(-4));
        let sales = vec![SaleWithLines {
            sale: sale("V0001", true, dec!(12.50)),
            seller_name: Some("Luis".to_string()),
            lines: Vec::new(),
        }];

        let csv = renderer.sales_csv(&sales).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("code,sold_at,seller,buyer,payment_method,items,subtotal,discount,total,status")
        );
        assert_eq!(
            lines.next(),
            Some("V0001,2024-03-05 10:30,Luis,Ana,CASH,0,12.50,0,12.50,ACTIVA")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_voided_sale_is_marked() {
        let renderer = ReportRenderer::new(business_offset(0));
        let rows = renderer.sale_rows(&[SaleWithLines {
            sale: sale("V0002", false, dec!(30)),
            seller_name: None,
            lines: Vec::new(),
        }]);
        assert_eq!(rows[0].status, "ANULADA");
        assert_eq!(rows[0].seller, "");
    }

    #[test]
    fn test_cash_register_rows_order() {
        let renderer = ReportRenderer::new(business_offset(0));
        let rows = renderer.cash_register_rows(&detail());

        assert_eq!(rows.len(), 8 + 2 + 1);
        assert!(rows[..8].iter().all(|r| r.section == "summary"));
        assert_eq!(rows[7].description, "net_close");
        assert_eq!(rows[7].amount, dec!(140));
        assert_eq!(rows[8].section, "sale");
        assert_eq!(rows[9].section, "voided_sale");
        assert_eq!(rows[10].section, "expense");
        assert_eq!(rows[10].payment_method, "CASH");
        assert_eq!(rows[10].date, "2024-03-05 16:00");
    }

    #[test]
    fn test_cash_register_csv_renders() {
        let renderer = ReportRenderer::new(business_offset(0));
        let csv = renderer.cash_register_csv(&detail()).unwrap();
        assert!(csv.starts_with("section,code,date,description,payment_method,amount\n"));
        assert!(csv.contains("summary,CA0001,2024-03-05 23:00,cash_close,,130\n"));
        assert!(csv.contains("expense,G0001,2024-03-05 16:00,Bolsas,CASH,20\n"));
    }
}
