use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medstock_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ProductId, UserId};
use medstock_events::Event;

use crate::pricing::{LineItem, OrderTotals};
use crate::status::{PURCHASE_ORDER_TRANSITIONS, PurchaseOrderStatus};

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier reference carried by a purchase order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Who created, approved or rejected the order, and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub created_by: Option<UserId>,
    pub created_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

/// Rejecting an approval needs a reason. Returns the trimmed comments.
pub fn validate_rejection_comments(comments: &str) -> Result<&str, DomainError> {
    let trimmed = comments.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(
            "comments are required when rejecting a purchase order",
        ));
    }
    Ok(trimmed)
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier_id: Option<SupplierId>,
    status: PurchaseOrderStatus,
    lines: Vec<LineItem>,
    audit: AuditTrail,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            supplier_id: None,
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            audit: AuditTrail::default(),
            version: 0,
            created: false,
        }
    }

    /// Instance at the state the backend last reported, ready to judge
    /// commands before they are sent.
    pub fn restore(
        id: PurchaseOrderId,
        supplier_id: SupplierId,
        status: PurchaseOrderStatus,
        lines: Vec<LineItem>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            id,
            supplier_id: Some(supplier_id),
            status,
            lines,
            audit,
            version: 0,
            created: true,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Statuses this order may move to next.
    pub fn available_transitions(&self) -> &'static [PurchaseOrderStatus] {
        if !self.created {
            return &[];
        }
        self.status.next()
    }

    /// Only drafts awaiting approval can be rejected.
    pub fn can_reject(&self) -> bool {
        self.created && self.status == PurchaseOrderStatus::Draft
    }

    pub fn totals(&self) -> Result<OrderTotals, DomainError> {
        OrderTotals::from_lines(&self.lines)
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (only allowed in Draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: u64,
    pub discount_bps: u32,
    pub tax_bps: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus (one step along the lifecycle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: PurchaseOrderId,
    pub target: PurchaseOrderStatus,
    /// `None` when the backend attributes the change from the bearer token.
    pub changed_by: Option<UserId>,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectApproval (Draft only, comments mandatory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectApproval {
    pub order_id: PurchaseOrderId,
    pub rejected_by: Option<UserId>,
    pub comments: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    ChangeStatus(ChangeStatus),
    RejectApproval(RejectApproval),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineAdded {
    pub order_id: PurchaseOrderId,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderStatusChanged {
    pub order_id: PurchaseOrderId,
    pub from: PurchaseOrderStatus,
    pub to: PurchaseOrderStatus,
    pub changed_by: Option<UserId>,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderRejected. The order ends up cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderRejected {
    pub order_id: PurchaseOrderId,
    pub rejected_by: Option<UserId>,
    pub comments: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderLineAdded(PurchaseOrderLineAdded),
    PurchaseOrderStatusChanged(PurchaseOrderStatusChanged),
    PurchaseOrderRejected(PurchaseOrderRejected),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::PurchaseOrderLineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::PurchaseOrderStatusChanged(_) => "purchasing.order.status_changed",
            PurchaseOrderEvent::PurchaseOrderRejected(_) => "purchasing.order.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderStatusChanged(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderRejected(e) => e.occurred_at,
        }
    }

    fn actor(&self) -> Option<UserId> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => Some(e.created_by),
            PurchaseOrderEvent::PurchaseOrderLineAdded(_) => None,
            PurchaseOrderEvent::PurchaseOrderStatusChanged(e) => e.changed_by,
            PurchaseOrderEvent::PurchaseOrderRejected(e) => e.rejected_by,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.supplier_id = Some(e.supplier_id);
                self.status = PurchaseOrderStatus::Draft;
                self.lines.clear();
                self.audit = AuditTrail {
                    created_by: Some(e.created_by),
                    created_at: Some(e.occurred_at),
                    ..AuditTrail::default()
                };
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            PurchaseOrderEvent::PurchaseOrderStatusChanged(e) => {
                self.status = e.to;
                if e.to == PurchaseOrderStatus::Approved {
                    self.audit.approved_by = e.changed_by;
                    self.audit.approved_at = Some(e.occurred_at);
                }
                if e.comments.is_some() {
                    self.audit.comments = e.comments.clone();
                }
            }
            PurchaseOrderEvent::PurchaseOrderRejected(e) => {
                self.status = PurchaseOrderStatus::Cancelled;
                self.audit.rejected_by = e.rejected_by;
                self.audit.rejected_at = Some(e.occurred_at);
                self.audit.comments = Some(e.comments.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            PurchaseOrderCommand::RejectApproval(cmd) => self.handle_reject(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_exists(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                order_id: cmd.order_id,
                supplier_id: cmd.supplier_id,
                created_by: cmd.created_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "lines can only be added while the purchase order is a draft",
            ));
        }

        let line = LineItem {
            line_no: (self.lines.len() as u32) + 1,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            discount_bps: cmd.discount_bps,
            tax_bps: cmd.tax_bps,
        };
        line.amounts()?;

        Ok(vec![PurchaseOrderEvent::PurchaseOrderLineAdded(
            PurchaseOrderLineAdded {
                order_id: cmd.order_id,
                line,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeStatus,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;
        PURCHASE_ORDER_TRANSITIONS.check(self.status, cmd.target)?;

        let comments = cmd
            .comments
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        Ok(vec![PurchaseOrderEvent::PurchaseOrderStatusChanged(
            PurchaseOrderStatusChanged {
                order_id: cmd.order_id,
                from: self.status,
                to: cmd.target,
                changed_by: cmd.changed_by,
                comments,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reject(&self, cmd: &RejectApproval) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        let comments = validate_rejection_comments(&cmd.comments)?;
        self.ensure_exists(cmd.order_id)?;

        if !self.can_reject() {
            return Err(DomainError::invariant(format!(
                "only draft purchase orders awaiting approval can be rejected (order is {})",
                self.status
            )));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderRejected(
            PurchaseOrderRejected {
                order_id: cmd.order_id,
                rejected_by: cmd.rejected_by,
                comments: comments.to_owned(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_order(order_id: PurchaseOrderId) -> PurchaseOrder {
        let mut order = PurchaseOrder::empty(order_id);
        order
            .execute(&PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                order_id,
                supplier_id: SupplierId::new(AggregateId::new()),
                created_by: UserId::new(),
                occurred_at: test_time(),
            }))
            .unwrap();
        order
    }

    /// Replays a status change event without validation.
    fn order_in(status: PurchaseOrderStatus) -> PurchaseOrder {
        let order_id = test_order_id();
        let mut order = created_order(order_id);
        if status != PurchaseOrderStatus::Draft {
            order.apply(&PurchaseOrderEvent::PurchaseOrderStatusChanged(
                PurchaseOrderStatusChanged {
                    order_id,
                    from: PurchaseOrderStatus::Draft,
                    to: status,
                    changed_by: Some(UserId::new()),
                    comments: None,
                    occurred_at: test_time(),
                },
            ));
        }
        order
    }

    fn change(order: &PurchaseOrder, target: PurchaseOrderStatus) -> PurchaseOrderCommand {
        PurchaseOrderCommand::ChangeStatus(ChangeStatus {
            order_id: order.id_typed(),
            target,
            changed_by: Some(UserId::new()),
            comments: None,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_emits_created_event_and_starts_in_draft() {
        let order_id = test_order_id();
        let order = created_order(order_id);

        assert_eq!(order.status(), PurchaseOrderStatus::Draft);
        assert_eq!(order.version(), 1);
        assert!(order.audit().created_by.is_some());
        assert_eq!(
            order.available_transitions(),
            &[PurchaseOrderStatus::Approved, PurchaseOrderStatus::Cancelled]
        );
    }

    #[test]
    fn full_lifecycle_reaches_received() {
        let order_id = test_order_id();
        let mut order = created_order(order_id);

        for target in [
            PurchaseOrderStatus::Approved,
            PurchaseOrderStatus::Sent,
            PurchaseOrderStatus::PartiallyReceived,
            PurchaseOrderStatus::Received,
        ] {
            let cmd = change(&order, target);
            let events = order.execute(&cmd).unwrap();
            assert_eq!(events[0].event_type(), "purchasing.order.status_changed");
            assert_eq!(order.status(), target);
        }

        assert!(order.available_transitions().is_empty());
        assert!(order.audit().approved_by.is_some());
    }

    #[test]
    fn cannot_skip_from_draft_to_sent() {
        let order = order_in(PurchaseOrderStatus::Draft);
        let err = order.handle(&change(&order, PurchaseOrderStatus::Sent)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => {
                assert_eq!(msg, "SENT is not allowed from DRAFT");
            }
            _ => panic!("Expected InvariantViolation for skipping approval"),
        }
    }

    #[test]
    fn add_line_only_while_draft() {
        let order_id = test_order_id();
        let mut order = created_order(order_id);
        let add = |order_id| {
            PurchaseOrderCommand::AddLine(AddLine {
                order_id,
                product_id: ProductId::new(),
                quantity: 4,
                unit_price: 250,
                discount_bps: 0,
                tax_bps: 1000,
                occurred_at: test_time(),
            })
        };

        order.execute(&add(order_id)).unwrap();
        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.totals().unwrap().total, 1_100);

        order.execute(&change(&order, PurchaseOrderStatus::Approved)).unwrap();
        let err = order.handle(&add(order_id)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn reject_requires_comments() {
        let order = order_in(PurchaseOrderStatus::Draft);
        let cmd = PurchaseOrderCommand::RejectApproval(RejectApproval {
            order_id: order.id_typed(),
            rejected_by: Some(UserId::new()),
            comments: "   ".to_string(),
            occurred_at: test_time(),
        });
        let err = order.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reject_cancels_and_records_audit() {
        let mut order = order_in(PurchaseOrderStatus::Draft);
        let rejected_by = Some(UserId::new());
        let cmd = PurchaseOrderCommand::RejectApproval(RejectApproval {
            order_id: order.id_typed(),
            rejected_by,
            comments: "  supplier price expired ".to_string(),
            occurred_at: test_time(),
        });
        let events = order.execute(&cmd).unwrap();

        assert_eq!(events[0].actor(), rejected_by);
        assert_eq!(order.status(), PurchaseOrderStatus::Cancelled);
        assert_eq!(order.audit().rejected_by, rejected_by);
        assert_eq!(order.audit().comments.as_deref(), Some("supplier price expired"));
    }

    #[test]
    fn reject_after_approval_is_refused() {
        let order = order_in(PurchaseOrderStatus::Approved);
        let cmd = PurchaseOrderCommand::RejectApproval(RejectApproval {
            order_id: order.id_typed(),
            rejected_by: Some(UserId::new()),
            comments: "too late".to_string(),
            occurred_at: test_time(),
        });
        assert!(matches!(order.handle(&cmd), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn restored_order_judges_commands_from_reported_status() {
        let order_id = test_order_id();
        let order = PurchaseOrder::restore(
            order_id,
            SupplierId::new(AggregateId::new()),
            PurchaseOrderStatus::Sent,
            Vec::new(),
            AuditTrail::default(),
        );

        assert_eq!(order.version(), 0);
        assert!(!order.can_reject());
        assert_eq!(order.available_transitions(), PurchaseOrderStatus::Sent.next());

        let events = order.handle(&change(&order, PurchaseOrderStatus::Received)).unwrap();
        match &events[..] {
            [PurchaseOrderEvent::PurchaseOrderStatusChanged(e)] => {
                assert_eq!(e.from, PurchaseOrderStatus::Sent);
                assert_eq!(e.to, PurchaseOrderStatus::Received);
            }
            other => panic!("unexpected events: {other:?}"),
        }
        assert!(order.handle(&change(&order, PurchaseOrderStatus::Approved)).is_err());
    }

    #[test]
    fn anonymous_status_change_leaves_no_actor() {
        let mut order = order_in(PurchaseOrderStatus::Draft);
        let cmd = PurchaseOrderCommand::ChangeStatus(ChangeStatus {
            order_id: order.id_typed(),
            target: PurchaseOrderStatus::Approved,
            changed_by: None,
            comments: Some("  ".to_string()),
            occurred_at: test_time(),
        });
        let events = order.execute(&cmd).unwrap();
        assert_eq!(events[0].actor(), None);
        assert_eq!(order.audit().approved_by, None);
        assert!(order.audit().approved_at.is_some());
        assert!(order.audit().comments.is_none());
    }

    #[test]
    fn commands_on_uncreated_order_are_not_found() {
        let order = PurchaseOrder::empty(test_order_id());
        let err = order.handle(&change(&order, PurchaseOrderStatus::Approved)).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
        assert!(order.available_transitions().is_empty());
    }

    fn any_status() -> impl Strategy<Value = PurchaseOrderStatus> {
        prop::sample::select(PurchaseOrderStatus::ALL.to_vec())
    }

    proptest! {
        /// Property: the aggregate accepts a status change exactly when the table lists it.
        #[test]
        fn change_status_agrees_with_transition_table(from in any_status(), to in any_status()) {
            let order = order_in(from);
            let result = order.handle(&change(&order, to));
            prop_assert_eq!(result.is_ok(), from.can_transition_to(to));
        }

        /// Property: handle never mutates state.
        #[test]
        fn handle_is_side_effect_free(from in any_status(), to in any_status()) {
            let order = order_in(from);
            let before = order.clone();
            let _ = order.handle(&change(&order, to));
            prop_assert_eq!(order, before);
        }
    }
}
