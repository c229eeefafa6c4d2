//! Billing agent tools.
//!
//! - `get_invoice_details` — fetch invoice details by invoice number
//! - `check_refund_status` — the user's refunds, optionally for one order
//! - `list_user_invoices` — the requesting user's invoices

use async_trait::async_trait;
use helpdesk_core::store::{CommerceStore, InvoiceStatus, Refund, RefundStatus};
use helpdesk_core::tool::{Tool, ToolOutcome};
use std::sync::Arc;
use tracing::warn;

pub struct GetInvoiceDetailsTool {
    commerce: Arc<dyn CommerceStore>,
}

impl GetInvoiceDetailsTool {
    pub fn new(commerce: Arc<dyn CommerceStore>) -> Self {
        Self { commerce }
    }
}

#[async_trait]
impl Tool for GetInvoiceDetailsTool {
    fn name(&self) -> &str {
        "get_invoice_details"
    }

    fn description(&self) -> &str {
        "Fetch detailed invoice information by invoice number, including the associated order and items. Use when a customer asks about a specific invoice or payment."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "invoice_number": {
                    "type": "string",
                    "description": "The invoice number (e.g., INV-001) to look up"
                }
            },
            "required": ["invoice_number"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let Some(invoice_number) = arguments["invoice_number"].as_str() else {
            return ToolOutcome::fail("Missing 'invoice_number' argument.");
        };

        match self.commerce.invoice_by_number(invoice_number).await {
            Ok(Some(invoice)) => match serde_json::to_value(&invoice) {
                Ok(data) => ToolOutcome::ok(data),
                Err(e) => ToolOutcome::fail(format!("Failed to serialize invoice: {e}")),
            },
            Ok(None) => ToolOutcome::fail(format!(
                "Invoice \"{invoice_number}\" not found. Please check the invoice number and try again."
            )),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to fetch invoice details.")
            }
        }
    }
}

/// Checks refunds for the calling user, optionally narrowed to one order.
pub struct CheckRefundStatusTool {
    commerce: Arc<dyn CommerceStore>,
    user_id: String,
}

impl CheckRefundStatusTool {
    pub fn new(commerce: Arc<dyn CommerceStore>, user_id: &str) -> Self {
        Self {
            commerce,
            user_id: user_id.to_string(),
        }
    }
}

/// Human-readable refund status line with the expected timeline.
fn refund_status_message(refund: &Refund) -> &'static str {
    match refund.status {
        RefundStatus::Requested => {
            "Your refund request has been received and is awaiting review."
        }
        RefundStatus::Processing => {
            "Your refund is being processed. This typically takes 3-5 business days."
        }
        RefundStatus::Approved => {
            "Your refund has been approved and will be credited to your account shortly."
        }
        RefundStatus::Rejected => {
            "Your refund request was not approved. Please contact support for more details."
        }
        RefundStatus::Completed => {
            "Your refund has been completed and the amount has been credited to your account."
        }
    }
}

#[async_trait]
impl Tool for CheckRefundStatusTool {
    fn name(&self) -> &str {
        "check_refund_status"
    }

    fn description(&self) -> &str {
        "Check the status of the customer's refund requests, optionally for a specific order number. Use when a customer asks about their refund status."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "order_number": {
                    "type": "string",
                    "description": "Optional order number to check refunds for a specific order"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let order_number = arguments["order_number"].as_str();

        match self.commerce.refunds(order_number, Some(&self.user_id)).await {
            Ok(refunds) if refunds.is_empty() => ToolOutcome::empty("No refund requests found."),
            Ok(refunds) => {
                let annotated: Vec<serde_json::Value> = refunds
                    .iter()
                    .filter_map(|r| {
                        let mut value = serde_json::to_value(r).ok()?;
                        value["status_message"] =
                            serde_json::Value::String(refund_status_message(r).into());
                        Some(value)
                    })
                    .collect();
                ToolOutcome::ok(serde_json::Value::Array(annotated))
            }
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to check refund status.")
            }
        }
    }
}

/// Lists the calling user's invoices, optionally filtered by status.
pub struct ListUserInvoicesTool {
    commerce: Arc<dyn CommerceStore>,
    user_id: String,
}

impl ListUserInvoicesTool {
    pub fn new(commerce: Arc<dyn CommerceStore>, user_id: &str) -> Self {
        Self {
            commerce,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for ListUserInvoicesTool {
    fn name(&self) -> &str {
        "list_user_invoices"
    }

    fn description(&self) -> &str {
        "List the customer's invoices, optionally filtered by payment status. Use when a customer wants to see their billing history."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pending", "paid", "overdue", "cancelled"],
                    "description": "Optional filter by invoice status"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let status = match arguments["status"].as_str() {
            Some(raw) => match InvoiceStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    return ToolOutcome::fail(format!(
                        "Invalid invoice status \"{raw}\". Valid values: pending, paid, overdue, cancelled."
                    ));
                }
            },
            None => None,
        };

        match self.commerce.invoices_for_user(&self.user_id, status).await {
            Ok(invoices) if invoices.is_empty() => ToolOutcome::empty(match status {
                Some(status) => format!("No {status} invoices found for this user."),
                None => "No invoices found for this user.".into(),
            }),
            Ok(invoices) => match serde_json::to_value(&invoices) {
                Ok(data) => ToolOutcome::ok(data),
                Err(e) => ToolOutcome::fail(format!("Failed to serialize invoices: {e}")),
            },
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to fetch invoices.")
            }
        }
    }
}
