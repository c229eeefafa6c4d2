//! Demo dataset for local development and tests.
//!
//! Three customers (user-001 Alice, user-002 Bob, user-003 Carol), ten
//! orders, eight invoices, four refunds, and a few sample conversations.
//! The order/invoice numbers referenced throughout the agent prompts
//! (ORD-001, INV-001, ...) come from here.

use chrono::{DateTime, TimeZone, Utc};
use helpdesk_core::agent::AgentType;
use helpdesk_core::error::StorageError;
use helpdesk_core::message::Role;
use helpdesk_core::store::{
    ConversationStore, Invoice, InvoiceStatus, Order, OrderItem, OrderStatus, Refund, RefundStatus,
};
use tracing::info;

use crate::sqlite::SqliteStore;

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn item(product_name: &str, category: &str, quantity: u32, unit_price: f64) -> OrderItem {
    OrderItem {
        product_name: product_name.into(),
        category: Some(category.into()),
        quantity,
        unit_price,
    }
}

#[allow(clippy::too_many_arguments)]
fn order(
    id: &str,
    order_number: &str,
    user_id: &str,
    status: OrderStatus,
    total_amount: f64,
    shipping_address: &str,
    tracking_number: Option<&str>,
    estimated_delivery: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    items: Vec<OrderItem>,
) -> Order {
    Order {
        id: id.into(),
        order_number: order_number.into(),
        user_id: user_id.into(),
        status,
        total_amount,
        shipping_address: Some(shipping_address.into()),
        tracking_number: tracking_number.map(Into::into),
        estimated_delivery,
        items,
        invoice: None,
        refunds: Vec::new(),
        created_at,
        updated_at: created_at,
    }
}

#[allow(clippy::too_many_arguments)]
fn invoice(
    id: &str,
    invoice_number: &str,
    order_id: &str,
    user_id: &str,
    amount: f64,
    status: InvoiceStatus,
    due_date: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
) -> Invoice {
    Invoice {
        id: id.into(),
        invoice_number: invoice_number.into(),
        user_id: user_id.into(),
        order_id: order_id.into(),
        // Join columns are filled on read; unused on insert.
        order_number: String::new(),
        order_status: OrderStatus::Pending,
        amount,
        status,
        due_date: Some(due_date),
        paid_at,
        items: Vec::new(),
        created_at,
    }
}

fn refund(
    id: &str,
    order_id: &str,
    user_id: &str,
    amount: f64,
    status: RefundStatus,
    reason: &str,
    requested_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
) -> Refund {
    Refund {
        id: id.into(),
        order_id: order_id.into(),
        order_number: String::new(),
        user_id: user_id.into(),
        amount,
        status,
        reason: reason.into(),
        requested_at,
        processed_at,
    }
}

/// Populate the store with the demo dataset.
pub async fn run(store: &SqliteStore) -> Result<(), StorageError> {
    let alice_addr = "123 Main St, Springfield, IL 62701";
    let bob_addr = "456 Oak Ave, Portland, OR 97201";
    let carol_addr = "789 Pine Rd, Austin, TX 78701";

    let orders = [
        // Alice's orders
        order(
            "order-001", "ORD-001", "user-001", OrderStatus::Delivered, 349.98, alice_addr,
            Some("TRK-1001-ABCD"), Some(date(2025, 1, 10)), date(2025, 1, 2),
            vec![
                item("Wireless Headphones Pro", "Electronics", 1, 199.99),
                item("Mechanical Keyboard RGB", "Electronics", 1, 149.99),
            ],
        ),
        order(
            "order-002", "ORD-002", "user-001", OrderStatus::Shipped, 549.99, alice_addr,
            Some("TRK-1002-EFGH"), Some(date(2025, 2, 15)), date(2025, 2, 1),
            vec![item("Ultrawide Monitor 34\"", "Electronics", 1, 549.99)],
        ),
        order(
            "order-003", "ORD-003", "user-001", OrderStatus::Processing, 229.98, alice_addr,
            None, None, date(2025, 2, 8),
            vec![
                item("Cotton T-Shirt Pack (3)", "Clothing", 1, 49.99),
                item("Running Shoes Elite", "Clothing", 1, 179.99),
            ],
        ),
        // Bob's orders
        order(
            "order-004", "ORD-004", "user-002", OrderStatus::Delivered, 399.99, bob_addr,
            Some("TRK-1004-IJKL"), Some(date(2025, 1, 5)), date(2024, 12, 28),
            vec![item("Ergonomic Office Chair", "Furniture", 1, 399.99)],
        ),
        order(
            "order-005", "ORD-005", "user-002", OrderStatus::Cancelled, 279.99, bob_addr,
            None, None, date(2025, 1, 8),
            vec![item("Standing Desk Converter", "Furniture", 1, 279.99)],
        ),
        order(
            "order-006", "ORD-006", "user-002", OrderStatus::Pending, 329.98, bob_addr,
            None, None, date(2025, 2, 10),
            vec![
                item("Wireless Headphones Pro", "Electronics", 1, 199.99),
                item("Smart Home Hub", "Home", 1, 129.99),
            ],
        ),
        // Carol's orders
        order(
            "order-007", "ORD-007", "user-003", OrderStatus::Shipped, 179.99, carol_addr,
            Some("TRK-1007-MNOP"), Some(date(2025, 2, 20)), date(2025, 2, 5),
            vec![item("Running Shoes Elite", "Clothing", 1, 179.99)],
        ),
        order(
            "order-008", "ORD-008", "user-003", OrderStatus::Confirmed, 679.98, carol_addr,
            None, None, date(2025, 1, 25),
            vec![
                item("Ultrawide Monitor 34\"", "Electronics", 1, 549.99),
                item("Smart Home Hub", "Home", 1, 129.99),
            ],
        ),
        order(
            "order-009", "ORD-009", "user-003", OrderStatus::Delivered, 149.99, carol_addr,
            Some("TRK-1009-QRST"), Some(date(2024, 12, 20)), date(2024, 12, 12),
            vec![item("Mechanical Keyboard RGB", "Electronics", 1, 149.99)],
        ),
        order(
            "order-010", "ORD-010", "user-001", OrderStatus::Pending, 129.99, alice_addr,
            None, None, date(2025, 2, 12),
            vec![item("Smart Home Hub", "Home", 1, 129.99)],
        ),
    ];

    for o in &orders {
        store.insert_order(o).await?;
    }

    let invoices = [
        invoice("inv-001", "INV-001", "order-001", "user-001", 349.98, InvoiceStatus::Paid, date(2025, 1, 15), Some(date(2025, 1, 8)), date(2025, 1, 2)),
        invoice("inv-002", "INV-002", "order-002", "user-001", 549.99, InvoiceStatus::Pending, date(2025, 2, 20), None, date(2025, 2, 1)),
        invoice("inv-003", "INV-003", "order-003", "user-001", 229.98, InvoiceStatus::Pending, date(2025, 2, 25), None, date(2025, 2, 8)),
        invoice("inv-004", "INV-004", "order-004", "user-002", 399.99, InvoiceStatus::Paid, date(2025, 1, 10), Some(date(2025, 1, 3)), date(2024, 12, 28)),
        invoice("inv-005", "INV-005", "order-005", "user-002", 279.99, InvoiceStatus::Cancelled, date(2025, 1, 20), None, date(2025, 1, 8)),
        invoice("inv-006", "INV-006", "order-007", "user-003", 179.99, InvoiceStatus::Pending, date(2025, 2, 25), None, date(2025, 2, 5)),
        invoice("inv-007", "INV-007", "order-008", "user-003", 679.98, InvoiceStatus::Overdue, date(2025, 1, 30), None, date(2025, 1, 25)),
        invoice("inv-008", "INV-008", "order-009", "user-003", 149.99, InvoiceStatus::Paid, date(2024, 12, 25), Some(date(2024, 12, 22)), date(2024, 12, 12)),
    ];

    for i in &invoices {
        store.insert_invoice(i).await?;
    }

    let refunds = [
        refund("ref-001", "order-005", "user-002", 279.99, RefundStatus::Completed, "Order cancelled by customer - changed mind", date(2025, 1, 12), Some(date(2025, 1, 15))),
        refund("ref-002", "order-001", "user-001", 199.99, RefundStatus::Processing, "Headphones defective - left ear not working", date(2025, 1, 20), None),
        refund("ref-003", "order-004", "user-002", 399.99, RefundStatus::Requested, "Chair armrest broken on arrival", date(2025, 2, 1), None),
        refund("ref-004", "order-009", "user-003", 149.99, RefundStatus::Rejected, "Keyboard not as described", date(2025, 1, 25), Some(date(2025, 1, 28))),
    ];

    for r in &refunds {
        store.insert_refund(r).await?;
    }

    seed_conversations(store).await?;

    info!(
        orders = orders.len(),
        invoices = invoices.len(),
        refunds = refunds.len(),
        "Seed completed"
    );
    Ok(())
}

/// A few past conversations so the support agent's history search has
/// something to find.
async fn seed_conversations(store: &SqliteStore) -> Result<(), StorageError> {
    let conv = store
        .create_conversation("user-001", Some("Order status inquiry"))
        .await?;
    store
        .append_message(
            &conv.id,
            Role::User,
            "Hi, I want to check my order ORD-002 status",
            None,
            None,
            None,
        )
        .await?;
    store
        .append_message(
            &conv.id,
            Role::Assistant,
            "I found your order ORD-002. It is currently shipped and being delivered to 123 Main St, Springfield. Your tracking number is TRK-1002-EFGH and estimated delivery is February 15, 2025.",
            Some(AgentType::Order),
            None,
            None,
        )
        .await?;

    let conv = store
        .create_conversation("user-002", Some("Refund request"))
        .await?;
    store
        .append_message(
            &conv.id,
            Role::User,
            "I need a refund for my chair order. The armrest was broken.",
            None,
            None,
            None,
        )
        .await?;
    store
        .append_message(
            &conv.id,
            Role::Assistant,
            "I'm sorry to hear about the damaged chair. I can see your order ORD-004 for the Ergonomic Office Chair. I've initiated a refund request for $399.99. The refund is currently being reviewed and you should hear back within 3-5 business days.",
            Some(AgentType::Billing),
            None,
            None,
        )
        .await?;

    let conv = store
        .create_conversation("user-003", Some("Product inquiry"))
        .await?;
    store
        .append_message(
            &conv.id,
            Role::User,
            "How do I set up my new smart home hub?",
            None,
            None,
            None,
        )
        .await?;
    store
        .append_message(
            &conv.id,
            Role::Assistant,
            "Great question! To set up your Smart Home Hub: plug it in and wait for the blue LED, download our companion app, create an account, tap \"Add New Device\" and select \"Smart Home Hub\", then follow the pairing instructions.",
            Some(AgentType::Support),
            None,
            None,
        )
        .await?;

    Ok(())
}
