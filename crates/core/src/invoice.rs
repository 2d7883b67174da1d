//! Invoices issued against orders.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::order::Order;
use crate::types::{Cents, InvoiceId, InvoiceStatus, OrderId};

/// Fields needed to insert an invoice; the number is generated server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub order_id: OrderId,
    pub total_amount: Cents,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl InvoiceDraft {
    /// Draft an invoice for `order`, due `due_days` after `today`.
    ///
    /// The total is copied from the order, never recomputed. Returns `None`
    /// if the due date overflows the calendar.
    #[must_use]
    pub fn for_order(order: &Order, today: NaiveDate, due_days: u32) -> Option<Self> {
        Some(Self {
            order_id: order.id,
            total_amount: order.total_amount,
            status: InvoiceStatus::Draft,
            issue_date: today,
            due_date: today.checked_add_days(Days::new(u64::from(due_days)))?,
        })
    }
}

/// A persisted invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub order_id: OrderId,
    pub order_number: Option<String>,
    pub status: InvoiceStatus,
    pub total_amount: Cents,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Unpaid and past its due date.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Draft | InvoiceStatus::Sent) && today > self.due_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, OrderStatus, PaymentMethod, PaymentStatus, UserId};

    fn order(total: i64) -> Order {
        let address = Address {
            first_name: "Camille".to_string(),
            last_name: "Durand".to_string(),
            address: "12 rue des Lunettes".to_string(),
            complement: None,
            city: "Lyon".to_string(),
            postal_code: "69002".to_string(),
            country: "France".to_string(),
            phone: None,
        };
        Order {
            id: OrderId::random(),
            order_number: "MTG-20260101-0001".to_string(),
            user_id: UserId::random(),
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            payment_method: PaymentMethod::Card,
            shipping_address: address.clone(),
            billing_address: address,
            notes: None,
            total_amount: Cents::new(total),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_draft_copies_total_and_computes_due_date() {
        let o = order(24_900);
        let draft = InvoiceDraft::for_order(&o, date(2026, 1, 20), 30).expect("draft");
        assert_eq!(draft.total_amount, Cents::new(24_900));
        assert_eq!(draft.order_id, o.id);
        assert_eq!(draft.due_date, date(2026, 2, 19));
        assert_eq!(draft.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_overdue_only_when_unpaid() {
        let o = order(100);
        let draft = InvoiceDraft::for_order(&o, date(2026, 1, 1), 10).expect("draft");
        let mut invoice = Invoice {
            id: InvoiceId::random(),
            invoice_number: "INV-2026-0001".to_string(),
            order_id: o.id,
            order_number: Some(o.order_number.clone()),
            status: InvoiceStatus::Sent,
            total_amount: draft.total_amount,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            created_at: Utc::now(),
        };
        assert!(!invoice.is_overdue(date(2026, 1, 11)));
        assert!(invoice.is_overdue(date(2026, 1, 12)));
        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.is_overdue(date(2026, 1, 12)));
    }
}
