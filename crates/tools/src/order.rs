//! Order agent tools.
//!
//! - `get_order_details` — fetch full order details by order number
//! - `check_delivery_status` — delivery/shipping status with tracking
//! - `list_user_orders` — the requesting user's orders, newest first

use async_trait::async_trait;
use helpdesk_core::store::{CommerceStore, Order, OrderStatus};
use helpdesk_core::tool::{Tool, ToolOutcome};
use std::sync::Arc;
use tracing::warn;

/// How many orders a listing returns at most.
const MAX_LISTED_ORDERS: usize = 10;

pub struct GetOrderDetailsTool {
    commerce: Arc<dyn CommerceStore>,
}

impl GetOrderDetailsTool {
    pub fn new(commerce: Arc<dyn CommerceStore>) -> Self {
        Self { commerce }
    }
}

#[async_trait]
impl Tool for GetOrderDetailsTool {
    fn name(&self) -> &str {
        "get_order_details"
    }

    fn description(&self) -> &str {
        "Fetch full details of an order by its order number, including items purchased, current status, shipping info, and associated invoice/refunds. Use when a customer asks about a specific order."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "order_number": {
                    "type": "string",
                    "description": "The order number (e.g., ORD-001) to look up"
                }
            },
            "required": ["order_number"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let Some(order_number) = arguments["order_number"].as_str() else {
            return ToolOutcome::fail("Missing 'order_number' argument.");
        };

        match self.commerce.order_by_number(order_number).await {
            Ok(Some(order)) => match serde_json::to_value(&order) {
                Ok(data) => ToolOutcome::ok(data),
                Err(e) => ToolOutcome::fail(format!("Failed to serialize order: {e}")),
            },
            Ok(None) => ToolOutcome::fail(format!(
                "Order \"{order_number}\" not found. Please check the order number and try again."
            )),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to fetch order details. Please try again.")
            }
        }
    }
}

pub struct CheckDeliveryStatusTool {
    commerce: Arc<dyn CommerceStore>,
}

impl CheckDeliveryStatusTool {
    pub fn new(commerce: Arc<dyn CommerceStore>) -> Self {
        Self { commerce }
    }
}

/// Human-readable status line the model can quote to the customer.
fn delivery_status_message(order: &Order) -> String {
    match order.status {
        OrderStatus::Pending => "Your order is pending and has not been processed yet.".into(),
        OrderStatus::Confirmed => "Your order has been confirmed and is being prepared.".into(),
        OrderStatus::Processing => "Your order is being prepared for shipment.".into(),
        OrderStatus::Shipped => format!(
            "Your order has been shipped! Tracking number: {}.",
            order.tracking_number.as_deref().unwrap_or("Not available yet")
        ),
        OrderStatus::Delivered => "Your order has been delivered.".into(),
        OrderStatus::Cancelled => "This order has been cancelled.".into(),
    }
}

#[async_trait]
impl Tool for CheckDeliveryStatusTool {
    fn name(&self) -> &str {
        "check_delivery_status"
    }

    fn description(&self) -> &str {
        "Check the delivery and shipping status of an order, including tracking number and estimated delivery date. Use when a customer asks about delivery or tracking."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "order_number": {
                    "type": "string",
                    "description": "The order number to check delivery status for"
                }
            },
            "required": ["order_number"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let Some(order_number) = arguments["order_number"].as_str() else {
            return ToolOutcome::fail("Missing 'order_number' argument.");
        };

        match self.commerce.order_by_number(order_number).await {
            Ok(Some(order)) => {
                let data = serde_json::json!({
                    "order_number": order.order_number,
                    "status": order.status,
                    "tracking_number": order.tracking_number,
                    "estimated_delivery": order.estimated_delivery,
                    "shipping_address": order.shipping_address,
                    "updated_at": order.updated_at,
                    "status_message": delivery_status_message(&order),
                });
                ToolOutcome::ok(data)
            }
            Ok(None) => ToolOutcome::fail(format!("Order \"{order_number}\" not found.")),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to check delivery status.")
            }
        }
    }
}

/// Lists the calling user's orders. The user id is fixed at construction
/// time; the model cannot list anyone else's orders.
pub struct ListUserOrdersTool {
    commerce: Arc<dyn CommerceStore>,
    user_id: String,
}

impl ListUserOrdersTool {
    pub fn new(commerce: Arc<dyn CommerceStore>, user_id: &str) -> Self {
        Self {
            commerce,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for ListUserOrdersTool {
    fn name(&self) -> &str {
        "list_user_orders"
    }

    fn description(&self) -> &str {
        "List the customer's orders, optionally filtered by order status. Use when a customer wants to see their order history or find a specific order."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pending", "confirmed", "processing", "shipped", "delivered", "cancelled"],
                    "description": "Optional filter by order status"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let status = match arguments["status"].as_str() {
            Some(raw) => match OrderStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    return ToolOutcome::fail(format!(
                        "Invalid order status \"{raw}\". Valid values: pending, confirmed, processing, shipped, delivered, cancelled."
                    ));
                }
            },
            None => None,
        };

        match self
            .commerce
            .orders_for_user(&self.user_id, status, MAX_LISTED_ORDERS)
            .await
        {
            Ok(orders) if orders.is_empty() => ToolOutcome::empty(match status {
                Some(status) => format!("No {status} orders found for this user."),
                None => "No orders found for this user.".into(),
            }),
            Ok(orders) => match serde_json::to_value(&orders) {
                Ok(data) => ToolOutcome::ok(data),
                Err(e) => ToolOutcome::fail(format!("Failed to serialize orders: {e}")),
            },
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to fetch user orders.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_store::{SqliteStore, seed};

    async fn commerce() -> Arc<dyn CommerceStore> {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        seed::run(&store).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn order_lookup_returns_details() {
        let tool = GetOrderDetailsTool::new(commerce().await);
        let outcome = tool
            .execute(serde_json::json!({"order_number": "ORD-001"}))
            .await;

        assert!(!outcome.is_error());
        assert_eq!(outcome.data["order_number"], "ORD-001");
        assert_eq!(outcome.data["items"].as_array().unwrap().len(), 2);
        assert_eq!(outcome.data["invoice"]["invoice_number"], "INV-001");
    }

    #[tokio::test]
    async fn missing_order_is_an_error_outcome() {
        let tool = GetOrderDetailsTool::new(commerce().await);
        let outcome = tool
            .execute(serde_json::json!({"order_number": "ORD-999"}))
            .await;

        assert!(outcome.is_error());
        assert_eq!(
            outcome.error.as_deref(),
            Some("Order \"ORD-999\" not found. Please check the order number and try again.")
        );
        assert!(outcome.data.is_null());
    }

    #[tokio::test]
    async fn delivery_status_includes_tracking_message() {
        let tool = CheckDeliveryStatusTool::new(commerce().await);
        let outcome = tool
            .execute(serde_json::json!({"order_number": "ORD-002"}))
            .await;

        assert!(!outcome.is_error());
        let message = outcome.data["status_message"].as_str().unwrap();
        assert!(message.contains("shipped"));
        assert!(message.contains("TRK-1002-EFGH"));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_bound_user() {
        let tool = ListUserOrdersTool::new(commerce().await, "user-001");
        let outcome = tool.execute(serde_json::json!({})).await;

        assert!(!outcome.is_error());
        let orders = outcome.data.as_array().unwrap();
        assert_eq!(orders.len(), 4);
        assert!(orders.iter().all(|o| o["user_id"] == "user-001"));
    }

    #[tokio::test]
    async fn listing_filters_by_status_and_reports_empty() {
        let tool = ListUserOrdersTool::new(commerce().await, "user-001");

        let outcome = tool.execute(serde_json::json!({"status": "pending"})).await;
        assert_eq!(outcome.data.as_array().unwrap().len(), 1);

        let outcome = tool.execute(serde_json::json!({"status": "cancelled"})).await;
        assert!(!outcome.is_error());
        assert_eq!(
            outcome.message.as_deref(),
            Some("No cancelled orders found for this user.")
        );
    }

    #[tokio::test]
    async fn invalid_status_is_an_error_outcome() {
        let tool = ListUserOrdersTool::new(commerce().await, "user-001");
        let outcome = tool.execute(serde_json::json!({"status": "returned"})).await;
        assert!(outcome.is_error());
    }
}
