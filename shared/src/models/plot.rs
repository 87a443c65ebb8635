//! Plot models and the plot lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::InventoryStatus;
use crate::error::TransitionError;

/// One individually sellable plot within an inventory unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plot {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub plot_number: String,
    pub status: PlotStatus,
    pub assigned_to: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Plot lifecycle
///
/// `available -> assigned -> paid -> used_in_deal`, with `sold` as an
/// alternate terminal state reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlotStatus {
    #[default]
    Available,
    Assigned,
    Paid,
    UsedInDeal,
    Sold,
}

impl PlotStatus {
    pub const ALL: [PlotStatus; 5] = [
        PlotStatus::Available,
        PlotStatus::Assigned,
        PlotStatus::Paid,
        PlotStatus::UsedInDeal,
        PlotStatus::Sold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlotStatus::Available => "available",
            PlotStatus::Assigned => "assigned",
            PlotStatus::Paid => "paid",
            PlotStatus::UsedInDeal => "used_in_deal",
            PlotStatus::Sold => "sold",
        }
    }

    /// Position along the lifecycle; statuses never move to a lower rank
    pub fn rank(&self) -> u8 {
        match self {
            PlotStatus::Available => 0,
            PlotStatus::Assigned => 1,
            PlotStatus::Paid => 2,
            PlotStatus::UsedInDeal | PlotStatus::Sold => 3,
        }
    }

    pub fn can_transition_to(&self, to: PlotStatus) -> bool {
        use PlotStatus::*;
        matches!(
            (self, to),
            (Available, Assigned)
                | (Assigned, Paid)
                | (Assigned, UsedInDeal)
                | (Paid, UsedInDeal)
                | (Available, Sold)
                | (Assigned, Sold)
                | (Paid, Sold)
        )
    }

    /// The single entry point for changing a plot's status
    pub fn transition(self, to: PlotStatus) -> Result<PlotStatus, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                entity: "plot",
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// Free to be requested or assigned
    pub fn is_allocatable(&self) -> bool {
        matches!(self, PlotStatus::Available)
    }

    /// Eligible to be bound to a deal
    pub fn is_consumable(&self) -> bool {
        matches!(self, PlotStatus::Assigned | PlotStatus::Paid)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlotStatus::UsedInDeal | PlotStatus::Sold)
    }

    /// Status after the plot's payments add up to `total_paid`.
    ///
    /// Only an `assigned` plot is promoted; a plot is never demoted here.
    pub fn after_payment(self, total_paid: Decimal, price: Decimal) -> PlotStatus {
        if self == PlotStatus::Assigned && total_paid >= price {
            PlotStatus::Paid
        } else {
            self
        }
    }
}

impl PlotStatus {
    /// Starting status of a placeholder plot synthesized for a unit stored
    /// before plots existed. Without an assignee only `sold` carries over.
    pub fn for_legacy_unit(unit_status: InventoryStatus, has_assignee: bool) -> PlotStatus {
        match unit_status {
            InventoryStatus::Sold => PlotStatus::Sold,
            InventoryStatus::Paid if has_assignee => PlotStatus::Paid,
            _ if has_assignee => PlotStatus::Assigned,
            _ => PlotStatus::Available,
        }
    }
}

impl FromStr for PlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(PlotStatus::Available),
            "assigned" => Ok(PlotStatus::Assigned),
            "paid" => Ok(PlotStatus::Paid),
            "used_in_deal" => Ok(PlotStatus::UsedInDeal),
            "sold" => Ok(PlotStatus::Sold),
            other => Err(format!("Unknown plot status: {}", other)),
        }
    }
}

impl std::fmt::Display for PlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order of plot numbers: shorter first, then lexical, so `plot-2` comes
/// before `plot-10`. Same order as `ORDER BY length(plot_number), plot_number`.
pub fn cmp_plot_numbers(a: &str, b: &str) -> std::cmp::Ordering {
    a.chars()
        .count()
        .cmp(&b.chars().count())
        .then_with(|| a.cmp(b))
}

/// Sort plots by plot number, see [`cmp_plot_numbers`]
pub fn sort_plots(plots: &mut [Plot]) {
    plots.sort_by(|a, b| cmp_plot_numbers(&a.plot_number, &b.plot_number).then(a.id.cmp(&b.id)));
}

/// Plots of one assignee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssigneePlots {
    pub salesperson_id: Uuid,
    pub plots: Vec<Plot>,
}

/// Split plots into per-assignee groups and the unassigned remainder.
///
/// Groups keep the order in which each assignee first appears.
pub fn partition_by_assignee(plots: Vec<Plot>) -> (Vec<AssigneePlots>, Vec<Plot>) {
    let mut groups: Vec<AssigneePlots> = Vec::new();
    let mut unassigned = Vec::new();

    for plot in plots {
        match plot.assigned_to {
            Some(owner) => match groups.iter_mut().find(|g| g.salesperson_id == owner) {
                Some(group) => group.plots.push(plot),
                None => groups.push(AssigneePlots {
                    salesperson_id: owner,
                    plots: vec![plot],
                }),
            },
            None => unassigned.push(plot),
        }
    }

    (groups, unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges_are_legal() {
        assert_eq!(
            PlotStatus::Available.transition(PlotStatus::Assigned),
            Ok(PlotStatus::Assigned)
        );
        assert!(PlotStatus::Assigned.can_transition_to(PlotStatus::Paid));
        assert!(PlotStatus::Paid.can_transition_to(PlotStatus::UsedInDeal));
        assert!(PlotStatus::Assigned.can_transition_to(PlotStatus::UsedInDeal));
    }

    #[test]
    fn test_backward_edges_are_rejected() {
        let err = PlotStatus::Paid.transition(PlotStatus::Assigned).unwrap_err();
        assert_eq!(err.from, "paid");
        assert_eq!(err.to, "assigned");
        assert!(!PlotStatus::UsedInDeal.can_transition_to(PlotStatus::Available));
        assert!(!PlotStatus::Assigned.can_transition_to(PlotStatus::Assigned));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for to in PlotStatus::ALL {
            assert!(!PlotStatus::UsedInDeal.can_transition_to(to));
            assert!(!PlotStatus::Sold.can_transition_to(to));
        }
    }

    #[test]
    fn test_payment_promotion_boundary() {
        let price = Decimal::new(100000, 2);
        assert_eq!(
            PlotStatus::Assigned.after_payment(price, price),
            PlotStatus::Paid
        );
        assert_eq!(
            PlotStatus::Assigned.after_payment(price - Decimal::new(1, 2), price),
            PlotStatus::Assigned
        );
        assert_eq!(
            PlotStatus::UsedInDeal.after_payment(price, price),
            PlotStatus::UsedInDeal
        );
    }

    fn plot(number: &str, assigned_to: Option<Uuid>) -> Plot {
        Plot {
            id: Uuid::new_v4(),
            inventory_id: Uuid::nil(),
            plot_number: number.to_string(),
            status: if assigned_to.is_some() {
                PlotStatus::Assigned
            } else {
                PlotStatus::Available
            },
            assigned_to,
            assigned_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_partition_by_assignee() {
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let (groups, unassigned) = partition_by_assignee(vec![
            plot("1", Some(s1)),
            plot("2", None),
            plot("3", Some(s2)),
            plot("4", Some(s1)),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].salesperson_id, s1);
        assert_eq!(groups[0].plots.len(), 2);
        assert_eq!(groups[1].salesperson_id, s2);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].plot_number, "2");
    }

    #[test]
    fn test_legacy_unit_mapping() {
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Assigned, true),
            PlotStatus::Assigned
        );
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Paid, true),
            PlotStatus::Paid
        );
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Assigned, false),
            PlotStatus::Available
        );
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Sold, false),
            PlotStatus::Sold
        );
    }

    #[test]
    fn test_round_trip_strings() {
        for status in PlotStatus::ALL {
            assert_eq!(status.as_str().parse::<PlotStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_plot_numbers_sort_by_length_then_value() {
        let mut numbers = vec!["plot-10", "plot-2", "plot-1", "plot-11", "plot-3"];
        numbers.sort_by(|a, b| cmp_plot_numbers(a, b));
        assert_eq!(numbers, vec!["plot-1", "plot-2", "plot-3", "plot-10", "plot-11"]);
    }
}
