//! The statistics engine
//!
//! Joins the business, machine and bottle stores into caller-facing
//! rollups. A business whose id is unknown, or which has no machines at
//! all, is a hard NotFound for every per-business rollup — an empty
//! result is never substituted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::bottle::{BottleEvent, BottleStore};
use crate::business::{Business, BusinessStore};
use crate::machine::{Machine, MachineStore};
use crate::{Error, Result};

use super::model::{
    BottleTotals, BusinessDayTotals, BusinessMachineCount, BusinessStats, DayBucket,
    FleetDayBucket, FleetSummary, MachineDayTotals,
};

/// Running (count, weight) sums keyed by machine id
type MachineSums = HashMap<i64, (i64, f64)>;

pub struct StatsEngine {
    businesses: Arc<BusinessStore>,
    machines: Arc<MachineStore>,
    bottles: Arc<BottleStore>,
}

impl StatsEngine {
    pub fn new(
        businesses: Arc<BusinessStore>,
        machines: Arc<MachineStore>,
        bottles: Arc<BottleStore>,
    ) -> Self {
        Self {
            businesses,
            machines,
            bottles,
        }
    }

    /// Sum of count and weight across every event in the system
    pub async fn overall_totals(&self) -> BottleTotals {
        sum_events(&self.bottles.list().await)
    }

    /// Sum of count and weight across one business's machines
    pub async fn totals_for_business(&self, business_id: i64) -> Result<BottleTotals> {
        let (_, machines) = self.business_with_machines(business_id).await?;
        let machine_ids: Vec<i64> = machines.iter().map(|m| m.id).collect();
        let events = self.bottles.list_for_machines(&machine_ids, None, None).await;
        Ok(sum_events(&events))
    }

    /// Machine count plus bottle totals for one business
    pub async fn business_stats(&self, business_id: i64) -> Result<BusinessStats> {
        let (business, machines) = self.business_with_machines(business_id).await?;
        let machine_ids: Vec<i64> = machines.iter().map(|m| m.id).collect();
        let events = self.bottles.list_for_machines(&machine_ids, None, None).await;
        let totals = sum_events(&events);

        Ok(BusinessStats {
            business_id: business.id,
            business_name: business.name,
            total_machines: machines.len() as i64,
            total_bottle_count: totals.total_count,
            total_bottle_weight: totals.total_weight,
        })
    }

    /// Day-wise per-machine totals for one business
    ///
    /// Only dates on which some machine of the business logged an event
    /// appear; there is no calendar back-fill. Within a present date every
    /// machine of the business appears, zero-filled when it was idle.
    pub async fn daywise_for_business(&self, business_id: i64) -> Result<Vec<DayBucket>> {
        let (_, machines) = self.business_with_machines(business_id).await?;
        let machine_ids: Vec<i64> = machines.iter().map(|m| m.id).collect();
        let events = self.bottles.list_for_machines(&machine_ids, None, None).await;

        let by_date = sums_by_date(&events);
        let buckets = by_date
            .iter()
            .rev()
            .map(|(date, sums)| DayBucket {
                date: *date,
                machines: machine_rows(&machines, sums),
            })
            .collect();
        Ok(buckets)
    }

    /// Day-wise per-machine totals across every business (admin view)
    ///
    /// Every date with at least one event anywhere yields a bucket holding
    /// every business (id order) and all of its machines, zero-filled.
    pub async fn daywise_all_businesses(&self) -> Vec<FleetDayBucket> {
        let businesses = self.businesses.list().await;
        let machines = self.machines.list().await;
        // Events whose machine has since been deleted have no business to
        // report under and are skipped.
        let known: Vec<i64> = machines.iter().map(|m| m.id).collect();
        let events: Vec<BottleEvent> = self
            .bottles
            .list()
            .await
            .into_iter()
            .filter(|e| known.contains(&e.machine_id))
            .collect();

        let by_date = sums_by_date(&events);
        by_date
            .iter()
            .rev()
            .map(|(date, sums)| FleetDayBucket {
                date: *date,
                businesses: businesses
                    .iter()
                    .map(|business| BusinessDayTotals {
                        business_id: business.id,
                        business_name: business.name.clone(),
                        machines: machine_rows(
                            &machines
                                .iter()
                                .filter(|m| m.business_id == business.id)
                                .cloned()
                                .collect::<Vec<_>>(),
                            sums,
                        ),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Fleet-wide dashboard counts
    pub async fn fleet_summary(&self) -> FleetSummary {
        let businesses = self.businesses.list().await;
        let machines = self.machines.list().await;

        let machines_per_business = businesses
            .iter()
            .map(|business| BusinessMachineCount {
                business_id: business.id,
                business_name: business.name.clone(),
                machine_count: machines
                    .iter()
                    .filter(|m| m.business_id == business.id)
                    .count() as i64,
            })
            .collect();

        FleetSummary {
            total_businesses: businesses.len() as i64,
            total_machines: machines.len() as i64,
            machines_per_business,
        }
    }

    async fn business_with_machines(&self, business_id: i64) -> Result<(Business, Vec<Machine>)> {
        let business = self
            .businesses
            .get(business_id)
            .await
            .ok_or_else(|| Error::BusinessNotFound(business_id.to_string()))?;
        let machines = self.machines.list_by_business(business_id).await;
        if machines.is_empty() {
            return Err(Error::NotFound(format!(
                "No machines found for business {}",
                business_id
            )));
        }
        Ok((business, machines))
    }
}

fn sum_events(events: &[BottleEvent]) -> BottleTotals {
    let mut totals = BottleTotals::zero();
    for event in events {
        totals.total_count += event.bottle_count;
        totals.total_weight += event.bottle_weight;
    }
    totals
}

/// Bucket events by the UTC date of their instant.
///
/// Deposits are stamped on a +05:30 wall clock but bucketed here in UTC;
/// the mismatch is inherited behavior, not an oversight.
fn sums_by_date(events: &[BottleEvent]) -> BTreeMap<NaiveDate, MachineSums> {
    let mut by_date: BTreeMap<NaiveDate, MachineSums> = BTreeMap::new();
    for event in events {
        let date = event.created_at.naive_utc().date();
        let sums = by_date.entry(date).or_default();
        let entry = sums.entry(event.machine_id).or_insert((0, 0.0));
        entry.0 += event.bottle_count;
        entry.1 += event.bottle_weight;
    }
    by_date
}

/// One row per machine in id order, zero-filled where the machine is idle
fn machine_rows(machines: &[Machine], sums: &MachineSums) -> Vec<MachineDayTotals> {
    machines
        .iter()
        .map(|machine| {
            let (total_bottles, total_weight) =
                sums.get(&machine.id).copied().unwrap_or((0, 0.0));
            MachineDayTotals {
                machine_id: machine.id,
                machine_name: machine.name.clone(),
                total_bottles,
                total_weight,
            }
        })
        .collect()
}
