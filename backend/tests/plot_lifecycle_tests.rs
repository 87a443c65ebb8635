//! Plot lifecycle tests
//!
//! Tests for plot allocation including:
//! - Status transitions only move forward
//! - Unit status derived from its plots
//! - Partial assignment leaves the unit available

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    partition_by_assignee, AssignmentSummary, InventoryStatus, Plot, PlotStatus,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn plot(number: &str, status: PlotStatus, assigned_to: Option<Uuid>) -> Plot {
    Plot {
        id: Uuid::new_v4(),
        inventory_id: Uuid::nil(),
        plot_number: number.to_string(),
        status,
        assigned_to,
        assigned_at: assigned_to.map(|_| Utc::now()),
        created_at: Utc::now(),
    }
}

fn any_status() -> impl Strategy<Value = PlotStatus> {
    prop::sample::select(PlotStatus::ALL.to_vec())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A legal transition never lowers a plot's rank
    #[test]
    fn prop_transitions_never_move_backwards(from in any_status(), to in any_status()) {
        if let Ok(next) = from.transition(to) {
            prop_assert!(next.rank() > from.rank() || next.is_terminal());
            prop_assert!(!from.is_terminal());
        }
    }

    /// Terminal statuses accept no further transition
    #[test]
    fn prop_terminal_is_final(to in any_status()) {
        prop_assert!(PlotStatus::UsedInDeal.transition(to).is_err());
        prop_assert!(PlotStatus::Sold.transition(to).is_err());
    }

    /// Any free plot keeps the unit available
    #[test]
    fn prop_free_plot_keeps_unit_available(
        mut statuses in prop::collection::vec(any_status(), 0..20),
        position in any::<prop::sample::Index>(),
    ) {
        let at = position.index(statuses.len() + 1);
        statuses.insert(at, PlotStatus::Available);
        prop_assert_eq!(InventoryStatus::derive(&statuses), InventoryStatus::Available);
    }

    /// Without free plots the unit is never available
    #[test]
    fn prop_fully_allocated_unit_is_not_available(
        statuses in prop::collection::vec(
            prop::sample::select(vec![
                PlotStatus::Assigned,
                PlotStatus::Paid,
                PlotStatus::UsedInDeal,
                PlotStatus::Sold,
            ]),
            1..20,
        )
    ) {
        prop_assert_ne!(InventoryStatus::derive(&statuses), InventoryStatus::Available);
    }

    /// Payment promotion fires exactly when the plot is covered
    #[test]
    fn prop_payment_promotes_at_price(price_cents in 1i64..10_000_000, paid_cents in 0i64..20_000_000) {
        let price = Decimal::new(price_cents, 2);
        let paid = Decimal::new(paid_cents, 2);
        let next = PlotStatus::Assigned.after_payment(paid, price);
        if paid >= price {
            prop_assert_eq!(next, PlotStatus::Paid);
        } else {
            prop_assert_eq!(next, PlotStatus::Assigned);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Assigning one of three plots leaves the unit open
    #[test]
    fn test_partial_assignment_keeps_unit_available() {
        let salesperson = Uuid::new_v4();
        let mut plots = vec![
            plot("1", PlotStatus::Available, None),
            plot("2", PlotStatus::Available, None),
            plot("3", PlotStatus::Available, None),
        ];

        plots[1].status = plots[1].status.transition(PlotStatus::Assigned).unwrap();
        plots[1].assigned_to = Some(salesperson);

        let statuses: Vec<PlotStatus> = plots.iter().map(|p| p.status).collect();
        assert_eq!(statuses[0], PlotStatus::Available);
        assert_eq!(statuses[1], PlotStatus::Assigned);
        assert_eq!(statuses[2], PlotStatus::Available);
        assert_eq!(InventoryStatus::derive(&statuses), InventoryStatus::Available);

        let summary = AssignmentSummary::new(1, dec("10000"), Decimal::ZERO);
        assert_eq!(summary.plots_assigned, 1);
        assert_eq!(summary.total_amount, dec("10000"));
        assert_eq!(summary.remaining_balance, dec("10000"));
    }

    #[test]
    fn test_unit_status_progression() {
        use PlotStatus::*;
        assert_eq!(InventoryStatus::derive(&[Assigned, Paid]), InventoryStatus::Assigned);
        assert_eq!(InventoryStatus::derive(&[Paid, Paid]), InventoryStatus::Paid);
        assert_eq!(InventoryStatus::derive(&[Paid, UsedInDeal]), InventoryStatus::Paid);
        assert_eq!(InventoryStatus::derive(&[UsedInDeal, Sold]), InventoryStatus::Sold);
        assert_eq!(InventoryStatus::derive(&[]), InventoryStatus::Available);
    }

    /// Re-assigning an assigned plot is rejected
    #[test]
    fn test_double_assignment_rejected() {
        let err = PlotStatus::Assigned
            .transition(PlotStatus::Assigned)
            .unwrap_err();
        assert_eq!(err.entity, "plot");
        assert_eq!(err.from, "assigned");
        assert_eq!(err.to, "assigned");
    }

    /// Deletion of a payment never demotes a paid plot
    #[test]
    fn test_paid_plot_not_demoted_by_lower_total() {
        assert_eq!(
            PlotStatus::Paid.after_payment(Decimal::ZERO, dec("1000")),
            PlotStatus::Paid
        );
    }

    #[test]
    fn test_only_assigned_or_paid_plots_are_consumable() {
        let consumable: Vec<PlotStatus> = PlotStatus::ALL
            .into_iter()
            .filter(|s| s.is_consumable())
            .collect();
        assert_eq!(consumable, vec![PlotStatus::Assigned, PlotStatus::Paid]);
    }

    #[test]
    fn test_overview_groups_by_assignee() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let plots = vec![
            plot("1", PlotStatus::Assigned, Some(a)),
            plot("2", PlotStatus::Available, None),
            plot("3", PlotStatus::Paid, Some(b)),
            plot("4", PlotStatus::Assigned, Some(a)),
        ];

        let (groups, unassigned) = partition_by_assignee(plots);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].salesperson_id, a);
        assert_eq!(groups[0].plots.len(), 2);
        assert_eq!(groups[1].salesperson_id, b);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].plot_number, "2");
    }

    #[test]
    fn test_legacy_units_map_to_plot_status() {
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Assigned, true),
            PlotStatus::Assigned
        );
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Paid, true),
            PlotStatus::Paid
        );
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Sold, false),
            PlotStatus::Sold
        );
        assert_eq!(
            PlotStatus::for_legacy_unit(InventoryStatus::Assigned, false),
            PlotStatus::Available
        );
    }
}
