//! Notification hub tests

use chrono::Utc;
use pos_inventory_backend::config::WebhookConfig;
use pos_inventory_backend::services::notification::{
    event_kind, expense_message, sale_message, NotificationPayload, Notifier,
};
use rust_decimal_macros::dec;
use shared::{Expense, ExpenseKind, ExpensePaymentMethod, PaymentMethod, Sale};
use uuid::Uuid;

fn sale() -> Sale {
    Sale {
        id: Uuid::new_v4(),
        seq: 7,
        code: "V0007".to_string(),
        sold_at: Utc::now(),
        edited_at: None,
        voided_at: None,
        voided_by: None,
        seller_id: Uuid::new_v4(),
        buyer_name: "Carla".to_string(),
        active: true,
        subtotal: dec!(20),
        discount: dec!(0),
        total: dec!(20),
        payment_method: PaymentMethod::Cash,
        cash_amount: None,
        electronic_amount: None,
        cash_register_session_id: None,
        created_at: Utc::now(),
    }
}

fn expense() -> Expense {
    Expense {
        id: Uuid::new_v4(),
        seq: 3,
        code: "G0003".to_string(),
        user_id: Uuid::new_v4(),
        category_id: None,
        kind: ExpenseKind::Fixed,
        memo: "Alquiler".to_string(),
        detail: None,
        spent_at: Utc::now(),
        amount: dec!(500),
        payment_method: ExpensePaymentMethod::Transfer,
        cash_register_session_id: None,
        created_at: Utc::now(),
    }
}

fn payload(message: &str) -> NotificationPayload {
    NotificationPayload {
        role: "admin".to_string(),
        kind: "sale".to_string(),
        message: message.to_string(),
        at: Utc::now(),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let notifier = Notifier::new();
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(notifier.publish(event_kind::SALE_CREATED, payload("x")), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let notifier = Notifier::new();
        let mut first = notifier.subscribe();
        let mut second = notifier.clone().subscribe();

        let delivered = notifier.publish(event_kind::SALE_CREATED, payload("Nueva Venta - V0001 - Ana"));
        assert_eq!(delivered, 2);

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.event, "sale_created");
        assert_eq!(a.payload.message, "Nueva Venta - V0001 - Ana");
    }

    #[tokio::test]
    async fn test_sale_created_event() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.sale_created(&sale());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, event_kind::SALE_CREATED);
        assert_eq!(event.payload.role, "admin");
        assert_eq!(event.payload.kind, "sale");
        assert_eq!(event.payload.message, "Nueva Venta - V0007 - Carla");
    }

    #[tokio::test]
    async fn test_expense_created_event() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.expense_created(&expense());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, event_kind::EXPENSE_CREATED);
        assert_eq!(event.payload.message, "Nuevo Gasto - G0003 - Alquiler");
    }

    #[tokio::test]
    async fn test_unconfigured_webhook_is_disabled() {
        let notifier = Notifier::from_config(&WebhookConfig::default());
        let mut rx = notifier.subscribe();
        notifier.sale_created(&sale());
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn test_webhook_messages() {
        let message = sale_message(&sale());
        assert!(message.starts_with("Nueva venta registrada"));
        assert!(message.contains("Cliente: Carla"));
        assert!(message.contains("Total: 20.00"));
        assert!(message.contains("Código: V0007"));

        let message = expense_message(&expense());
        assert!(message.contains("Glosa: Alquiler"));
        assert!(message.contains("Monto: 500.00"));
        assert!(message.contains("Método de pago: Transfer"));
    }
}
