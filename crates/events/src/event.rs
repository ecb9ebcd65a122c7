use chrono::{DateTime, Utc};
use medstock_core::UserId;

/// Something that happened to a purchase order or quarantine record.
///
/// Events feed the audit fields the dashboard shows (who approved, who
/// disposed, when), so each one says who caused it.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. "quarantine.record.action_applied".
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Business time of the change.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// User who triggered the change; `None` for backend-originated facts.
    fn actor(&self) -> Option<UserId>;

    /// One-line audit entry: `<type> v<version> at <time> by <user|system>`.
    fn audit_line(&self) -> String {
        let by = self
            .actor()
            .map(|user| user.to_string())
            .unwrap_or_else(|| "system".to_string());
        format!(
            "{} v{} at {} by {}",
            self.event_type(),
            self.version(),
            self.occurred_at().to_rfc3339(),
            by
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone)]
    struct Received {
        by: Option<UserId>,
    }

    impl Event for Received {
        fn event_type(&self) -> &'static str {
            "purchasing.order.received"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
        }

        fn actor(&self) -> Option<UserId> {
            self.by
        }
    }

    #[test]
    fn audit_line_names_the_actor() {
        let user = UserId::new();
        let line = Received { by: Some(user) }.audit_line();
        assert_eq!(
            line,
            format!("purchasing.order.received v2 at 2024-03-01T09:30:00+00:00 by {user}")
        );
    }

    #[test]
    fn audit_line_falls_back_to_system() {
        assert!(Received { by: None }.audit_line().ends_with("by system"));
    }
}
