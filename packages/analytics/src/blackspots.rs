//! Blackspot zones: DBSCAN clusters of accident locations scored by
//! severity.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use accident_map_accident_models::{AccidentRecord, AccidentSeverity};
use accident_map_analytics_models::{BlackspotCluster, BlackspotParams, RiskLevel};
use accident_map_spatial::{dbscan, haversine_km};

use crate::AnalyticsError;
use crate::tally::{count_by, max_key};

fn validate(params: &BlackspotParams) -> Result<(), AnalyticsError> {
    if !(params.eps_km.is_finite() && params.eps_km > 0.0) {
        return Err(AnalyticsError::InvalidParameter {
            message: format!("eps_km must be a positive number, got {}", params.eps_km),
        });
    }
    if params.min_samples == 0 {
        return Err(AnalyticsError::InvalidParameter {
            message: "min_samples must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Clusters accident locations and returns one scored zone per cluster,
/// highest risk first (ties by accident count, then cluster id).
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `eps_km` is not a
/// positive number or `min_samples` is zero.
pub fn identify_blackspots<R: Borrow<AccidentRecord>>(
    records: &[R],
    params: &BlackspotParams,
) -> Result<Vec<BlackspotCluster>, AnalyticsError> {
    validate(params)?;

    if records.len() < params.min_samples {
        log::debug!(
            "Only {} records, fewer than min_samples={}; no blackspots",
            records.len(),
            params.min_samples
        );
        return Ok(Vec::new());
    }

    let records: Vec<&AccidentRecord> = records.iter().map(Borrow::borrow).collect();
    let points: Vec<(f64, f64)> = records.iter().map(|r| (r.latitude, r.longitude)).collect();
    let labels = dbscan(&points, params.eps_km, params.min_samples);

    let mut members: BTreeMap<usize, Vec<&AccidentRecord>> = BTreeMap::new();
    for (record, label) in records.iter().zip(labels) {
        if let Some(cluster) = label {
            members.entry(cluster).or_default().push(*record);
        }
    }

    let mut clusters: Vec<BlackspotCluster> = members
        .into_iter()
        .filter(|(_, group)| group.len() >= params.min_samples)
        .map(|(id, group)| summarize(id, &group))
        .collect();

    clusters.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| b.accident_count.cmp(&a.accident_count))
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });

    log::info!(
        "Found {} blackspots among {} accidents (eps={}km, min_samples={})",
        clusters.len(),
        records.len(),
        params.eps_km,
        params.min_samples
    );

    Ok(clusters)
}

#[allow(clippy::cast_precision_loss)]
fn summarize(cluster_id: usize, group: &[&AccidentRecord]) -> BlackspotCluster {
    let n = group.len() as f64;
    let center_lat = group.iter().map(|r| r.latitude).sum::<f64>() / n;
    let center_lon = group.iter().map(|r| r.longitude).sum::<f64>() / n;
    let radius_km = group
        .iter()
        .map(|r| haversine_km((center_lat, center_lon), (r.latitude, r.longitude)))
        .fold(0.0, f64::max);

    let severities = count_by(group.iter().map(|r| r.severity));
    let severity = |s: AccidentSeverity| severities.get(&s).copied().unwrap_or(0);
    let (fatal, severe, light) = (
        severity(AccidentSeverity::Fatal),
        severity(AccidentSeverity::SevereInjuries),
        severity(AccidentSeverity::LightInjuries),
    );
    let count = |pred: fn(&AccidentRecord) -> bool| group.iter().filter(|r| pred(r)).count() as u64;

    let risk_score = AccidentSeverity::all()
        .iter()
        .map(|s| s.risk_weight() * severity(*s))
        .sum();

    BlackspotCluster {
        cluster_id,
        center_lat,
        center_lon,
        radius_km,
        accident_count: group.len() as u64,
        fatal,
        severe,
        light,
        property_damage: severity(AccidentSeverity::PropertyDamage),
        bicycle: count(|r| r.involves_bicycle),
        pedestrian: count(|r| r.involves_pedestrian),
        motorcycle: count(|r| r.involves_motorcycle),
        canton: max_key(&count_by(group.iter().map(|r| r.canton.as_str())))
            .unwrap_or_default()
            .to_string(),
        most_common_type: max_key(&count_by(group.iter().map(|r| r.type_label())))
            .unwrap_or_default()
            .to_string(),
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
    }
}
