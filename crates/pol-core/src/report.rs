//! The fuel-usage aggregation engine.
//!
//! Transforms a partition of fuel records into three summary views: running
//! totals since a boundary instant, a trailing 12-month histogram, and a
//! four-bucket calendar-quarter histogram. The reshaping layer is pure and
//! synchronous; the assembly functions at the bottom issue the grouping
//! queries through any [`PolStore`] and feed the pure layer.
//!
//! A failure in any underlying query fails the whole report — callers never
//! see partially-assembled data.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  record::FuelType,
  store::{MonthTotal, PolStore, QuarterTotal},
};

// ─── Output types ────────────────────────────────────────────────────────────

/// One month of the trailing 12-month histogram. The label is a fixed
/// English "Month Year" string (e.g. `"March 2025"`), independent of the
/// runtime locale, so merging by label is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
  pub month:        String,
  pub total_liters: f64,
}

/// One calendar-quarter bucket, labelled `"Q1"`..`"Q4"`. Quarters span all
/// years in the record set cumulatively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlyBucket {
  pub quarter:      String,
  pub total_liters: f64,
}

/// The full per-fuel-type usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
  /// Liters dispensed since midnight of the reference day.
  pub daily:         f64,
  /// Liters dispensed since midnight of the most recent Sunday.
  pub weekly:        f64,
  /// Liters dispensed since day 1 of the reference month.
  pub monthly_total: f64,
  pub monthly:       Vec<MonthlyBucket>,
  pub quarterly:     Vec<QuarterlyBucket>,
}

/// One month of the side-by-side ADF/XCS comparison report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedMonth {
  pub month:      String,
  pub adf_liters: f64,
  pub xcs_liters: f64,
}

// ─── Calendar boundaries ─────────────────────────────────────────────────────

/// Midnight (UTC) of the day containing `now`.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
  now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Midnight (UTC) of the most recent Sunday, inclusive: a Sunday `now`
/// yields that same day. Week start is fixed to Sunday, not derived from
/// any runtime locale.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
  let back = u64::from(now.weekday().num_days_from_sunday());
  (now.date_naive() - Days::new(back))
    .and_time(NaiveTime::MIN)
    .and_utc()
}

/// Midnight (UTC) of day 1 of the month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
  let date = now.date_naive();
  (date - Days::new(u64::from(date.day0())))
    .and_time(NaiveTime::MIN)
    .and_utc()
}

// ─── Pure reshaping ──────────────────────────────────────────────────────────

/// Label for a grouped `(year, month)` row. `None` for a month outside 1–12,
/// which then simply fails to match any histogram bucket.
fn group_label(year: i32, month: u32) -> Option<String> {
  NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.format("%B %Y").to_string())
}

/// Build the trailing 12-month histogram ending at the month containing
/// `reference`.
///
/// All 12 buckets are pre-populated with zero totals before the grouped sums
/// are applied, so months with no activity are always present. Grouped rows
/// are matched to buckets by exact label equality; rows outside the window
/// (no matching label) are silently dropped.
pub fn monthly_histogram(
  groups: &[MonthTotal],
  reference: DateTime<Utc>,
) -> Vec<MonthlyBucket> {
  let ref_date = reference.date_naive();
  let first_of_ref = ref_date - Days::new(u64::from(ref_date.day0()));

  let mut buckets: Vec<MonthlyBucket> = (0..12)
    .rev()
    .map(|back| {
      let month = first_of_ref - Months::new(back);
      MonthlyBucket {
        month:        month.format("%B %Y").to_string(),
        total_liters: 0.0,
      }
    })
    .collect();

  for group in groups {
    let Some(label) = group_label(group.year, group.month) else {
      continue;
    };
    if let Some(bucket) = buckets.iter_mut().find(|b| b.month == label) {
      bucket.total_liters = group.total_liters;
    }
  }

  buckets
}

/// Build the four-bucket quarterly histogram. Always `Q1`..`Q4` in order,
/// zero-filled; grouped rows with a quarter outside 1–4 are dropped.
pub fn quarterly_histogram(groups: &[QuarterTotal]) -> Vec<QuarterlyBucket> {
  let mut buckets: Vec<QuarterlyBucket> = (1..=4)
    .map(|q| QuarterlyBucket {
      quarter:      format!("Q{q}"),
      total_liters: 0.0,
    })
    .collect();

  for group in groups {
    if (1..=4).contains(&group.quarter) {
      buckets[(group.quarter - 1) as usize].total_liters = group.total_liters;
    }
  }

  buckets
}

/// Merge two equally-ordered monthly histograms into the side-by-side
/// comparison view. Labels come from the `adf` side; a missing index on the
/// `xcs` side contributes 0.
pub fn combine_monthly(
  adf: &[MonthlyBucket],
  xcs: &[MonthlyBucket],
) -> Vec<CombinedMonth> {
  adf
    .iter()
    .enumerate()
    .map(|(i, a)| CombinedMonth {
      month:      a.month.clone(),
      adf_liters: a.total_liters,
      xcs_liters: xcs.get(i).map_or(0.0, |x| x.total_liters),
    })
    .collect()
}

/// Merge two equally-ordered monthly histograms by summing pairwise — the
/// "ground fuel" view, defined as ADF + XCS. A missing index on the `xcs`
/// side contributes 0.
pub fn sum_monthly(
  adf: &[MonthlyBucket],
  xcs: &[MonthlyBucket],
) -> Vec<MonthlyBucket> {
  adf
    .iter()
    .enumerate()
    .map(|(i, a)| MonthlyBucket {
      month:        a.month.clone(),
      total_liters: a.total_liters + xcs.get(i).map_or(0.0, |x| x.total_liters),
    })
    .collect()
}

// ─── Report assembly ─────────────────────────────────────────────────────────

/// Assemble the full usage report for one fuel type, relative to `now`.
///
/// The five underlying queries are independent; they are issued sequentially
/// here because no invariant depends on their order. The first failure
/// aborts the whole report.
pub async fn usage_totals<S: PolStore>(
  store: &S,
  fuel: FuelType,
  now: DateTime<Utc>,
) -> Result<UsageTotals, S::Error> {
  let daily = store.sum_liters_since(fuel, day_start(now)).await?;
  let weekly = store.sum_liters_since(fuel, week_start(now)).await?;
  let monthly_total = store.sum_liters_since(fuel, month_start(now)).await?;
  let monthly = monthly_histogram(&store.liters_by_month(fuel).await?, now);
  let quarterly = quarterly_histogram(&store.liters_by_quarter(fuel).await?);

  Ok(UsageTotals {
    daily,
    weekly,
    monthly_total,
    monthly,
    quarterly,
  })
}

/// Trailing 12-month ADF vs XCS comparison, merged by month label order.
pub async fn adf_xcs_report<S: PolStore>(
  store: &S,
  now: DateTime<Utc>,
) -> Result<Vec<CombinedMonth>, S::Error> {
  let adf = monthly_histogram(&store.liters_by_month(FuelType::Adf).await?, now);
  let xcs = monthly_histogram(&store.liters_by_month(FuelType::Xcs).await?, now);
  Ok(combine_monthly(&adf, &xcs))
}

/// Trailing 12-month ground-fuel (ADF + XCS) histogram.
pub async fn ground_fuel_report<S: PolStore>(
  store: &S,
  now: DateTime<Utc>,
) -> Result<Vec<MonthlyBucket>, S::Error> {
  let adf = monthly_histogram(&store.liters_by_month(FuelType::Adf).await?, now);
  let xcs = monthly_histogram(&store.liters_by_month(FuelType::Xcs).await?, now);
  Ok(sum_monthly(&adf, &xcs))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
  }

  // ── Boundaries ──────────────────────────────────────────────────────────

  #[test]
  fn day_start_is_midnight_of_same_day() {
    let now = utc(2025, 6, 4, 15, 30, 12);
    assert_eq!(day_start(now), utc(2025, 6, 4, 0, 0, 0));
  }

  #[test]
  fn week_start_is_most_recent_sunday() {
    // 2025-06-04 is a Wednesday; the preceding Sunday is 2025-06-01.
    let wednesday = utc(2025, 6, 4, 15, 30, 12);
    assert_eq!(week_start(wednesday), utc(2025, 6, 1, 0, 0, 0));
  }

  #[test]
  fn week_start_on_a_sunday_is_that_sunday() {
    let sunday = utc(2025, 6, 1, 23, 59, 59);
    assert_eq!(week_start(sunday), utc(2025, 6, 1, 0, 0, 0));
  }

  #[test]
  fn week_start_can_cross_a_month_boundary() {
    // 2025-07-02 is a Wednesday; the preceding Sunday is 2025-06-29.
    let wednesday = utc(2025, 7, 2, 8, 0, 0);
    assert_eq!(week_start(wednesday), utc(2025, 6, 29, 0, 0, 0));
  }

  #[test]
  fn month_start_is_day_one() {
    let now = utc(2025, 6, 30, 23, 0, 0);
    assert_eq!(month_start(now), utc(2025, 6, 1, 0, 0, 0));
  }

  // ── Monthly histogram ───────────────────────────────────────────────────

  #[test]
  fn monthly_histogram_has_twelve_zeroed_entries_on_empty_input() {
    let buckets = monthly_histogram(&[], utc(2025, 6, 15, 0, 0, 0));
    assert_eq!(buckets.len(), 12);
    assert!(buckets.iter().all(|b| b.total_liters == 0.0));
    assert_eq!(buckets[0].month, "July 2024");
    assert_eq!(buckets[11].month, "June 2025");
  }

  #[test]
  fn monthly_histogram_window_crosses_year_boundary() {
    let buckets = monthly_histogram(&[], utc(2025, 2, 1, 0, 0, 0));
    assert_eq!(buckets[0].month, "March 2024");
    assert_eq!(buckets[10].month, "January 2025");
    assert_eq!(buckets[11].month, "February 2025");
  }

  #[test]
  fn monthly_histogram_places_sum_in_matching_month() {
    let groups = vec![MonthTotal {
      year:         2025,
      month:        6,
      total_liters: 75.0,
    }];
    let buckets = monthly_histogram(&groups, utc(2025, 6, 20, 0, 0, 0));
    assert_eq!(buckets.len(), 12);
    for bucket in &buckets {
      let expected = if bucket.month == "June 2025" { 75.0 } else { 0.0 };
      assert_eq!(bucket.total_liters, expected, "bucket {}", bucket.month);
    }
  }

  #[test]
  fn monthly_histogram_drops_groups_outside_window() {
    let groups = vec![
      MonthTotal { year: 2020, month: 1, total_liters: 999.0 },
      MonthTotal { year: 2025, month: 5, total_liters: 40.0 },
    ];
    let buckets = monthly_histogram(&groups, utc(2025, 6, 20, 0, 0, 0));
    let total: f64 = buckets.iter().map(|b| b.total_liters).sum();
    assert_eq!(total, 40.0);
  }

  #[test]
  fn monthly_histogram_ignores_invalid_month_numbers() {
    let groups = vec![MonthTotal { year: 2025, month: 13, total_liters: 5.0 }];
    let buckets = monthly_histogram(&groups, utc(2025, 6, 20, 0, 0, 0));
    assert!(buckets.iter().all(|b| b.total_liters == 0.0));
  }

  // ── Quarterly histogram ─────────────────────────────────────────────────

  #[test]
  fn quarterly_histogram_always_has_four_labelled_entries() {
    let buckets = quarterly_histogram(&[]);
    let labels: Vec<&str> =
      buckets.iter().map(|b| b.quarter.as_str()).collect();
    assert_eq!(labels, ["Q1", "Q2", "Q3", "Q4"]);
    assert!(buckets.iter().all(|b| b.total_liters == 0.0));
  }

  #[test]
  fn quarterly_histogram_fills_reported_quarters() {
    // The grouped rows already carry the cross-year accumulation: a
    // January-2023 record and a January-2024 record arrive summed in the
    // single quarter-1 row.
    let groups = vec![
      QuarterTotal { quarter: 1, total_liters: 130.0 },
      QuarterTotal { quarter: 2, total_liters: 50.0 },
    ];
    let buckets = quarterly_histogram(&groups);
    assert_eq!(buckets[0].total_liters, 130.0);
    assert_eq!(buckets[1].total_liters, 50.0);
    assert_eq!(buckets[2].total_liters, 0.0);
    assert_eq!(buckets[3].total_liters, 0.0);
  }

  #[test]
  fn quarterly_histogram_drops_out_of_range_quarters() {
    let groups = vec![
      QuarterTotal { quarter: 0, total_liters: 7.0 },
      QuarterTotal { quarter: 5, total_liters: 9.0 },
    ];
    let buckets = quarterly_histogram(&groups);
    assert!(buckets.iter().all(|b| b.total_liters == 0.0));
  }

  // ── Combined views ──────────────────────────────────────────────────────

  fn bucket(month: &str, liters: f64) -> MonthlyBucket {
    MonthlyBucket { month: month.to_string(), total_liters: liters }
  }

  #[test]
  fn combine_monthly_pairs_by_index() {
    let adf = vec![bucket("May 2025", 10.0), bucket("June 2025", 0.0)];
    let xcs = vec![bucket("May 2025", 5.0), bucket("June 2025", 5.0)];
    let combined = combine_monthly(&adf, &xcs);
    assert_eq!(combined.len(), 2);
    assert_eq!(combined[0].month, "May 2025");
    assert_eq!(combined[0].adf_liters, 10.0);
    assert_eq!(combined[0].xcs_liters, 5.0);
    assert_eq!(combined[1].adf_liters, 0.0);
    assert_eq!(combined[1].xcs_liters, 5.0);
  }

  #[test]
  fn combine_monthly_missing_side_contributes_zero() {
    let adf = vec![bucket("May 2025", 10.0), bucket("June 2025", 20.0)];
    let xcs = vec![bucket("May 2025", 5.0)];
    let combined = combine_monthly(&adf, &xcs);
    assert_eq!(combined[1].xcs_liters, 0.0);
  }

  #[test]
  fn sum_monthly_adds_pairwise() {
    let adf = vec![bucket("May 2025", 10.0), bucket("June 2025", 0.0)];
    let xcs = vec![bucket("May 2025", 5.0), bucket("June 2025", 5.0)];
    let summed = sum_monthly(&adf, &xcs);
    assert_eq!(summed[0].total_liters, 15.0);
    assert_eq!(summed[1].total_liters, 5.0);
  }

  #[test]
  fn sum_monthly_missing_side_contributes_zero() {
    let adf = vec![bucket("May 2025", 10.0), bucket("June 2025", 20.0)];
    let summed = sum_monthly(&adf, &[]);
    assert_eq!(summed[0].total_liters, 10.0);
    assert_eq!(summed[1].total_liters, 20.0);
  }

  // ── Idempotence ─────────────────────────────────────────────────────────

  #[test]
  fn reshaping_is_idempotent_over_unchanged_input() {
    let groups = vec![MonthTotal { year: 2025, month: 4, total_liters: 12.5 }];
    let reference = utc(2025, 6, 1, 0, 0, 0);
    assert_eq!(
      monthly_histogram(&groups, reference),
      monthly_histogram(&groups, reference),
    );
  }
}
