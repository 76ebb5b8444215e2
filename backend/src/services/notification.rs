//! Notification fan-out
//!
//! Supports:
//! - In-process broadcast of events to SSE subscribers
//! - Optional messaging webhook, posted from a spawned task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Expense, Sale};
use tokio::sync::broadcast;

use crate::config::WebhookConfig;

/// Events kept for slow subscribers before they start lagging
const CHANNEL_CAPACITY: usize = 256;

pub mod event_kind {
    pub const SALE_CREATED: &str = "sale_created";
    pub const EXPENSE_CREATED: &str = "expense_created";
}

/// Body of a notification event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    /// Role the event is addressed to
    pub role: String,
    /// Entity kind, e.g. `sale` or `expense`
    pub kind: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Event name plus payload, as sent over SSE
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub event: String,
    pub payload: NotificationPayload,
}

/// Messaging webhook request body
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    number: &'a str,
    message: &'a str,
}

/// Messaging webhook client
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    username: Option<String>,
    password: Option<String>,
    recipient: String,
    http_client: reqwest::Client,
}

impl WebhookClient {
    /// Build a client when a webhook url is configured
    pub fn from_config(config: &WebhookConfig) -> Option<Self> {
        let url = config.url.clone()?;
        Some(Self {
            url,
            username: config.username.clone(),
            password: config.password.clone(),
            recipient: config.recipient.clone().unwrap_or_default(),
            http_client: reqwest::Client::new(),
        })
    }

    /// Post one message to the webhook
    pub async fn send(&self, message: &str) -> Result<(), String> {
        let mut request = self.http_client.post(&self.url).json(&WebhookMessage {
            number: &self.recipient,
            message,
        });
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Failed to send webhook message: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("Webhook responded with {}", response.status()))
        }
    }
}

/// Broadcast hub shared through `AppState`
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<NotificationEvent>,
    webhook: Option<WebhookClient>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    /// Hub without a webhook
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, webhook: None }
    }

    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            webhook: WebhookClient::from_config(config),
            ..Self::new()
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish to current subscribers; returns how many received it
    pub fn publish(&self, event: &str, payload: NotificationPayload) -> usize {
        let event = NotificationEvent {
            event: event.to_string(),
            payload,
        };
        // No subscribers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Send a webhook message in the background; failures are only logged
    pub fn dispatch_message(&self, message: String) {
        let Some(webhook) = self.webhook.clone() else {
            return;
        };
        tokio::spawn(async move {
            match webhook.send(&message).await {
                Ok(()) => tracing::debug!("Webhook message delivered"),
                Err(e) => tracing::error!(error = %e, "Webhook delivery failed"),
            }
        });
    }

    /// Announce a committed sale to admins
    pub fn sale_created(&self, sale: &Sale) {
        self.publish(
            event_kind::SALE_CREATED,
            NotificationPayload {
                role: "admin".to_string(),
                kind: "sale".to_string(),
                message: format!("Nueva Venta - {} - {}", sale.code, sale.buyer_name),
                at: sale.sold_at,
            },
        );
        self.dispatch_message(sale_message(sale));
    }

    /// Announce a committed expense to admins
    pub fn expense_created(&self, expense: &Expense) {
        self.publish(
            event_kind::EXPENSE_CREATED,
            NotificationPayload {
                role: "admin".to_string(),
                kind: "expense".to_string(),
                message: format!("Nuevo Gasto - {} - {}", expense.code, expense.memo),
                at: expense.spent_at,
            },
        );
        self.dispatch_message(expense_message(expense));
    }
}

pub fn sale_message(sale: &Sale) -> String {
    format!(
        "Nueva venta registrada\nCliente: {}\nTotal: {:.2}\nCódigo: {}\nFecha: {}",
        sale.buyer_name,
        sale.total,
        sale.code,
        sale.sold_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn expense_message(expense: &Expense) -> String {
    format!(
        "Nuevo gasto registrado\nGlosa: {}\nMonto: {:.2}\nMétodo de pago: {:?}\nTipo: {:?}\nCódigo: {}\nFecha: {}",
        expense.memo,
        expense.amount,
        expense.payment_method,
        expense.kind,
        expense.code,
        expense.spent_at.format("%Y-%m-%d %H:%M")
    )
}
