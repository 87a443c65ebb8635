//! Inventory request workflow models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TransitionError;

/// A salesperson's ask to be assigned specific plots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRequest {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub salesperson_id: Uuid,
    pub status: RequestStatus,
    pub requested_plot_ids: Vec<Uuid>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Only `pending` requests move, and only to a terminal state
    pub fn transition(self, to: RequestStatus) -> Result<RequestStatus, TransitionError> {
        match (self, to) {
            (RequestStatus::Pending, RequestStatus::Approved)
            | (RequestStatus::Pending, RequestStatus::Rejected) => Ok(to),
            _ => Err(TransitionError {
                entity: "request",
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("Unknown request status: {}", other)),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when two plot sets share at least one plot
pub fn plot_sets_overlap(a: &[Uuid], b: &[Uuid]) -> bool {
    let a: HashSet<&Uuid> = a.iter().collect();
    b.iter().any(|id| a.contains(id))
}

/// Pending requests that lose to an approved request.
///
/// `pending` holds `(request_id, plot_ids)` pairs; every entry other than the
/// approved request itself that shares a plot with `approved_plots` is returned.
/// An empty plot set stands for the whole unit and always competes.
pub fn competing_requests(
    approved_id: Uuid,
    approved_plots: &[Uuid],
    pending: &[(Uuid, Vec<Uuid>)],
) -> Vec<Uuid> {
    pending
        .iter()
        .filter(|(id, plots)| {
            *id != approved_id && (plots.is_empty() || plot_sets_overlap(approved_plots, plots))
        })
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_moves() {
        assert_eq!(
            RequestStatus::Pending.transition(RequestStatus::Approved),
            Ok(RequestStatus::Approved)
        );
        assert!(RequestStatus::Approved
            .transition(RequestStatus::Rejected)
            .is_err());
        assert!(RequestStatus::Rejected
            .transition(RequestStatus::Approved)
            .is_err());
        assert!(RequestStatus::Pending
            .transition(RequestStatus::Pending)
            .is_err());
    }

    #[test]
    fn test_competing_requests_excludes_self_and_disjoint() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let p3 = Uuid::new_v4();
        let approved = Uuid::new_v4();
        let rival = Uuid::new_v4();
        let bystander = Uuid::new_v4();

        let pending = vec![
            (approved, vec![p1, p2]),
            (rival, vec![p2, p3]),
            (bystander, vec![p3]),
        ];

        assert_eq!(competing_requests(approved, &[p1, p2], &pending), vec![rival]);
    }

    #[test]
    fn test_whole_unit_request_always_competes() {
        let approved = Uuid::new_v4();
        let whole_unit = Uuid::new_v4();
        let pending = vec![(whole_unit, Vec::new())];

        assert_eq!(
            competing_requests(approved, &[Uuid::new_v4()], &pending),
            vec![whole_unit]
        );
    }
}
