use load_planner::cost::DistanceSource;
use load_planner::model::{Container, Shipment};
use load_planner::packing::{ItemOutcome, RejectionReason};
use load_planner::planner::{PlanSettings, plan_load};
use load_planner::report::{ReportWarning, round_currency};
use load_planner::route::{RouteBackend, RouteInfo, StaticRouteTable};
use load_planner::types::Vec3;

fn trailer() -> Container {
    Container::new(50.0, 8.0, 10.0, 45_000.0).unwrap()
}

fn routes() -> StaticRouteTable {
    StaticRouteTable::new()
        .with_route(
            "Chicago, IL",
            "Denver, CO",
            RouteInfo {
                distance_miles: 1000.0,
                duration_hours: 15.0,
            },
        )
        .with_route(
            "Dallas, TX",
            "Houston, TX",
            RouteInfo {
                distance_miles: 239.0,
                duration_hours: 3.6,
            },
        )
}

fn queue() -> Vec<Shipment> {
    vec![
        Shipment::new(1, (10.0, 4.0, 4.0), 3_000.0)
            .unwrap()
            .with_label("Machine parts")
            .with_route("Chicago, IL", "Denver, CO"),
        Shipment::new(2, (10.0, 4.0, 4.0), 2_000.0)
            .unwrap()
            .with_route("Houston, TX", "Dallas, TX"),
        Shipment::new(3, (10.0, 4.0, 4.0), 1_500.0)
            .unwrap()
            .with_route("Nowhere", "Elsewhere"),
        Shipment::new(4, (60.0, 4.0, 4.0), 500.0)
            .unwrap()
            .with_route("Chicago, IL", "Denver, CO"),
    ]
}

#[tokio::test]
async fn plans_mixed_queue_with_partial_route_coverage() {
    let shipments = queue();
    let report = plan_load(&trailer(), &shipments, &PlanSettings::default(), &routes())
        .await
        .expect("valid queue");

    assert_eq!(report.placed_count, 3);
    assert_eq!(report.rejected_ids, vec![4]);
    assert_eq!(report.total_weight, 6_500.0);
    assert!(!report.overload_warning);

    let ids: Vec<_> = report.lines.iter().map(|line| line.shipment_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(report.lines[0].label, "Machine parts");
    assert_eq!(
        report.lines[1].outcome,
        ItemOutcome::Placed {
            position: Vec3::new(10.0, 0.0, 0.0),
            layer: 0
        }
    );
    assert_eq!(
        report.lines[3].outcome,
        ItemOutcome::Rejected {
            reason: RejectionReason::DimensionsExceedContainer
        }
    );

    let routed = report.line(1).and_then(|line| line.cost).expect("estimate");
    assert_eq!(routed.distance_source, DistanceSource::Route);
    assert_eq!(routed.shift_count, Some(2));
    assert!((routed.total_cost - 1518.4615).abs() < 1e-3);

    let reversed = report.line(2).and_then(|line| line.cost).expect("estimate");
    assert_eq!(reversed.distance_miles, 239.0);
    assert_eq!(reversed.shift_count, Some(1));

    let fallback = report.line(3).and_then(|line| line.cost).expect("estimate");
    assert_eq!(fallback.distance_source, DistanceSource::Fallback);
    assert_eq!(fallback.distance_miles, 500.0);
    assert_eq!(fallback.duration_hours, None);
    assert_eq!(fallback.shift_count, None);

    assert_eq!(report.totals.fallback_estimates, 1);
    assert_eq!(report.totals.max_shift_count, Some(2));
    assert!(
        report
            .warnings
            .contains(&ReportWarning::RouteUnavailable { shipment_id: 3 })
    );
    assert!(
        report
            .warnings
            .contains(&ReportWarning::RejectedItems { count: 1 })
    );
}

#[tokio::test]
async fn disabled_routing_degrades_every_estimate_to_fallback() {
    let shipments = queue();
    let report = plan_load(
        &trailer(),
        &shipments,
        &PlanSettings::default(),
        &RouteBackend::Disabled,
    )
    .await
    .expect("valid queue");

    assert!(report.lines.iter().all(|line| {
        line.cost
            .is_some_and(|cost| cost.distance_source == DistanceSource::Fallback)
    }));
    assert_eq!(report.totals.fallback_estimates, shipments.len());
    assert_eq!(report.totals.max_shift_count, None);
    assert_eq!(report.totals.distance_miles, 500.0 * shipments.len() as f64);
    assert_eq!(report.placed_count, 3);
}

#[tokio::test]
async fn overweight_load_is_placed_and_flagged() {
    let container = Container::new(50.0, 8.0, 10.0, 5_000.0).unwrap();
    let shipments = queue();
    let report = plan_load(&container, &shipments, &PlanSettings::default(), &routes())
        .await
        .expect("valid queue");

    assert_eq!(report.placed_count, 3);
    assert!(report.overload_warning);
    assert!(report.weight_headroom < 0.0);
    assert!(report.warnings.contains(&ReportWarning::Overload {
        total_weight: 6_500.0,
        max_weight: 5_000.0
    }));
}

#[tokio::test]
async fn presentation_rounds_only_currency() {
    let report = plan_load(&trailer(), &queue(), &PlanSettings::default(), &routes())
        .await
        .expect("valid queue");
    let shown = report.for_presentation();

    assert_eq!(
        shown.totals.total_cost,
        round_currency(report.totals.total_cost)
    );
    let raw = report.line(1).and_then(|line| line.cost).expect("estimate");
    let rounded = shown.line(1).and_then(|line| line.cost).expect("estimate");
    assert_eq!(rounded.total_cost, 1518.46);
    assert_eq!(rounded.fuel_gallons, raw.fuel_gallons);
    assert_eq!(shown.volume_utilization, report.volume_utilization);
}
