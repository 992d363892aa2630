// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Quota accounting: resource footprints of shoots and limit checks.
//!
//! Consumption is never stored. Every check recomputes the footprint of all
//! shoots bound to a quota from the current lookup state.

use crate::api::core::{
    CloudProfileSpec, Quota, QuotaMetric, SecretBinding, Shoot, Worker,
    ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP,
};
use crate::api::quantity::Quantity;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

const VOLUME_CLASS_STANDARD: &str = "standard";
const VOLUME_CLASS_PREMIUM: &str = "premium";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("machine type {0:?} not found in cloud profile")]
    UnknownMachineType(String),

    #[error("volume type {0:?} not found in cloud profile")]
    UnknownVolumeType(String),

    #[error("volume type {name:?} has unknown volume class {class:?}")]
    UnknownVolumeClass { name: String, class: String },
}

/// Resources a shoot may consume at its maximum scale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    metrics: BTreeMap<QuotaMetric, Quantity>,
}

impl Footprint {
    pub fn get(&self, metric: QuotaMetric) -> Option<Quantity> {
        self.metrics.get(&metric).copied()
    }

    pub fn add(&mut self, metric: QuotaMetric, amount: Quantity) {
        *self.metrics.entry(metric).or_insert(Quantity::ZERO) += amount;
    }
}

fn storage_metric(name: &str, class: &str) -> Result<QuotaMetric, QuotaError> {
    match class {
        VOLUME_CLASS_STANDARD => Ok(QuotaMetric::StorageStandard),
        VOLUME_CLASS_PREMIUM => Ok(QuotaMetric::StoragePremium),
        _ => Err(QuotaError::UnknownVolumeClass {
            name: name.to_string(),
            class: class.to_string(),
        }),
    }
}

/// Storage class metric and per-machine size of a worker's volume, if any.
fn worker_storage(
    worker: &Worker,
    spec: &CloudProfileSpec,
) -> Result<Option<(QuotaMetric, Quantity)>, QuotaError> {
    let machine_type = spec
        .machine_type(&worker.machine.type_)
        .ok_or_else(|| QuotaError::UnknownMachineType(worker.machine.type_.clone()))?;
    let requested_size = worker.volume.as_ref().and_then(|v| v.volume_size);

    if let Some(type_name) = worker.volume.as_ref().and_then(|v| v.type_.as_deref()) {
        let volume_type = spec
            .volume_type(type_name)
            .ok_or_else(|| QuotaError::UnknownVolumeType(type_name.to_string()))?;
        let metric = storage_metric(&volume_type.name, &volume_type.class)?;
        return Ok(requested_size.map(|size| (metric, size)));
    }

    match &machine_type.storage {
        Some(storage) => {
            let metric = storage_metric(&machine_type.name, &storage.class)?;
            Ok(requested_size
                .or(storage.storage_size)
                .map(|size| (metric, size)))
        }
        None => Ok(None),
    }
}

/// Compute the footprint of a shoot against the cloud profile catalog.
///
/// CPU, GPU and memory are the machine type values times the worker
/// maximum. Storage is the volume size times the maximum, booked on the
/// class of the volume type; workers without volume data book no storage.
/// Every shoot needs one load balancer, plus one for the ingress addon.
pub fn footprint(shoot: &Shoot, spec: &CloudProfileSpec) -> Result<Footprint, QuotaError> {
    let mut result = Footprint::default();
    for metric in [QuotaMetric::Cpu, QuotaMetric::Gpu, QuotaMetric::Memory] {
        result.add(metric, Quantity::ZERO);
    }

    for worker in &shoot.spec.provider.workers {
        let machine_type = spec
            .machine_type(&worker.machine.type_)
            .ok_or_else(|| QuotaError::UnknownMachineType(worker.machine.type_.clone()))?;
        let count = i64::from(worker.maximum);
        result.add(QuotaMetric::Cpu, machine_type.cpu.times(count));
        result.add(QuotaMetric::Gpu, machine_type.gpu.times(count));
        result.add(QuotaMetric::Memory, machine_type.memory.times(count));

        if let Some((metric, size)) = worker_storage(worker, spec)? {
            result.add(metric, size.times(count));
        }
    }

    let load_balancers = if shoot.nginx_ingress_enabled() { 2 } else { 1 };
    result.add(QuotaMetric::LoadBalancer, Quantity::from_units(load_balancers));
    Ok(result)
}

/// Metrics of `quota` that the target would push over their limit.
///
/// Every metric constrained by the quota is checked; the usage is the target
/// plus all others, and a metric absent from a footprint counts as zero.
pub fn exceeded_metrics(quota: &Quota, target: &Footprint, others: &[Footprint]) -> Vec<QuotaMetric> {
    quota
        .spec
        .metrics
        .iter()
        .filter(|(metric, limit)| {
            let required = target.get(**metric).unwrap_or(Quantity::ZERO);
            let used: Quantity = others.iter().filter_map(|f| f.get(**metric)).sum();
            used + required > **limit
        })
        .map(|(metric, _)| *metric)
        .collect()
}

/// One exceeded metric of one quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceededQuota {
    pub quota: String,
    pub metric: QuotaMetric,
}

/// Check the target against every quota together with the footprints of the
/// other shoots bound to that quota.
pub fn check_quota(target: &Footprint, quotas: &[(Quota, Vec<Footprint>)]) -> Vec<ExceededQuota> {
    quotas
        .iter()
        .flat_map(|(quota, others)| {
            exceeded_metrics(quota, target, others)
                .into_iter()
                .map(move |metric| ExceededQuota {
                    quota: quota.metadata.name.clone(),
                    metric,
                })
        })
        .collect()
}

/// Rejection message listing the exceeded metrics, each named once.
pub fn exceeded_message(exceeded: &[ExceededQuota]) -> String {
    let mut seen = HashSet::new();
    let metrics: Vec<&str> = exceeded
        .iter()
        .filter(|e| seen.insert(e.metric))
        .map(|e| e.metric.as_str())
        .collect();
    format!(
        "Quota limits exceeded. Unable to allocate further {}",
        metrics.join(", ")
    )
}

/// Shoots consuming the quota through one of the bindings, excluding the
/// target shoot itself.
pub fn quota_consumers<'a>(
    quota: &Quota,
    bindings: &[SecretBinding],
    shoots: &'a [Shoot],
    target: &Shoot,
) -> Vec<&'a Shoot> {
    let referencing: HashSet<(&str, &str)> = bindings
        .iter()
        .filter(|b| b.references_quota(quota))
        .map(|b| (b.metadata.namespace.as_str(), b.metadata.name.as_str()))
        .collect();

    shoots
        .iter()
        .filter(|s| {
            !(s.metadata.namespace == target.metadata.namespace
                && s.metadata.name == target.metadata.name)
        })
        .filter(|s| match s.spec.secret_binding_name.as_deref() {
            Some(binding) => referencing.contains(&(s.metadata.namespace.as_str(), binding)),
            None => false,
        })
        .collect()
}

/// Conservative change detection for updates: true when the new revision
/// may consume more than the old one.
pub fn quota_verification_needed(new: &Shoot, old: &Shoot) -> bool {
    if new.spec.secret_binding_name != old.spec.secret_binding_name {
        return true;
    }
    if new.nginx_ingress_enabled() && !old.nginx_ingress_enabled() {
        return true;
    }

    let old_workers: HashMap<&str, &Worker> = old
        .spec
        .provider
        .workers
        .iter()
        .map(|w| (w.name.as_str(), w))
        .collect();

    new.spec.provider.workers.iter().any(|worker| {
        let Some(&previous) = old_workers.get(worker.name.as_str()) else {
            return true;
        };
        let volume_type = |w: &Worker| w.volume.as_ref().and_then(|v| v.type_.clone());
        let volume_size = |w: &Worker| w.volume.as_ref().and_then(|v| v.volume_size);

        worker.maximum > previous.maximum
            || worker.machine.type_ != previous.machine.type_
            || volume_type(worker) != volume_type(previous)
            || volume_size(worker) != volume_size(previous)
    })
}

/// Smallest cluster lifetime configured on any of the quotas.
pub fn min_cluster_lifetime_days<'a>(quotas: impl IntoIterator<Item = &'a Quota>) -> Option<i32> {
    quotas
        .into_iter()
        .filter_map(|q| q.spec.cluster_lifetime_days)
        .min()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifetimeError {
    #[error("invalid expiration timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Requested shoot expiration time to long. Can only be extended by {days} day(s)")]
    TooLong { days: i32 },
}

fn expiration(shoot: &Shoot) -> Result<Option<DateTime<Utc>>, LifetimeError> {
    match shoot.metadata.annotation(ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP) {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| LifetimeError::InvalidTimestamp {
                value: value.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Check a changed expiration annotation against the lifetime limit.
///
/// The new expiration may be at most `days` after the old expiration, or
/// after the creation time if the old revision had none. An unchanged or
/// removed annotation always passes, and so does a limit too large to be
/// represented as a point in time.
pub fn check_lifetime(new: &Shoot, old: &Shoot, days: i32) -> Result<(), LifetimeError> {
    let new_value = new.metadata.annotation(ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP);
    let old_value = old.metadata.annotation(ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP);
    if new_value.is_none() || new_value == old_value {
        return Ok(());
    }

    let Some(requested) = expiration(new)? else {
        return Ok(());
    };
    let base = match expiration(old)? {
        Some(previous) => previous,
        None => match old.metadata.creation_timestamp {
            Some(created) => created,
            None => return Ok(()),
        },
    };

    let limit = Duration::try_days(i64::from(days)).and_then(|d| base.checked_add_signed(d));
    match limit {
        Some(limit) if requested > limit => Err(LifetimeError::TooLong { days }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::core::{
        Addons, MachineType, MachineTypeStorage, NginxIngress, Volume, VolumeType,
    };
    use crate::api::meta::{ObjectMeta, ObjectReference};

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn profile() -> CloudProfileSpec {
        let mut large = MachineType::new("large", q("2"), q("0"), q("8Gi"));
        large.storage = Some(MachineTypeStorage {
            class: "standard".to_string(),
            storage_size: Some(q("50Gi")),
            type_: "gp2".to_string(),
        });
        CloudProfileSpec {
            machine_types: vec![
                MachineType::new("small", q("1"), q("0"), q("4Gi")),
                large,
                MachineType::new("gpu", q("4"), q("1"), q("16Gi")),
            ],
            volume_types: vec![
                VolumeType::new("gp2", "standard"),
                VolumeType::new("io1", "premium"),
                VolumeType::new("odd", "exotic"),
            ],
            ..Default::default()
        }
    }

    fn shoot(name: &str, workers: Vec<Worker>) -> Shoot {
        let mut shoot = Shoot::new("garden-dev", name);
        shoot.spec.provider.workers = workers;
        shoot.spec.secret_binding_name = Some("binding".to_string());
        shoot
    }

    fn quota(metrics: &[(QuotaMetric, &str)]) -> Quota {
        let mut quota = Quota {
            metadata: ObjectMeta::namespaced("garden-dev", "q"),
            ..Default::default()
        };
        for (metric, value) in metrics {
            quota.spec.metrics.insert(*metric, q(value));
        }
        quota
    }

    #[test]
    fn test_footprint_scales_with_maximum() {
        let mut worker = Worker::new("w", "small", 1, 3);
        worker.volume = Some(Volume {
            type_: Some("io1".to_string()),
            volume_size: Some(q("20Gi")),
        });
        let fp = footprint(&shoot("a", vec![worker]), &profile()).unwrap();
        assert_eq!(fp.get(QuotaMetric::Cpu), Some(q("3")));
        assert_eq!(fp.get(QuotaMetric::Gpu), Some(q("0")));
        assert_eq!(fp.get(QuotaMetric::Memory), Some(q("12Gi")));
        assert_eq!(fp.get(QuotaMetric::StoragePremium), Some(q("60Gi")));
        assert_eq!(fp.get(QuotaMetric::StorageStandard), None);
        assert_eq!(fp.get(QuotaMetric::LoadBalancer), Some(q("1")));
    }

    #[test]
    fn test_footprint_machine_storage_and_ingress() {
        let mut s = shoot("a", vec![Worker::new("w", "large", 1, 2)]);
        s.spec.addons = Some(Addons {
            nginx_ingress: Some(NginxIngress { enabled: true }),
        });
        let fp = footprint(&s, &profile()).unwrap();
        assert_eq!(fp.get(QuotaMetric::StorageStandard), Some(q("100Gi")));
        assert_eq!(fp.get(QuotaMetric::LoadBalancer), Some(q("2")));
    }

    #[test]
    fn test_footprint_without_volume_data_skips_storage() {
        let fp = footprint(&shoot("a", vec![Worker::new("w", "small", 1, 2)]), &profile()).unwrap();
        assert_eq!(fp.get(QuotaMetric::StorageStandard), None);
        assert_eq!(fp.get(QuotaMetric::StoragePremium), None);
    }

    #[test]
    fn test_footprint_errors() {
        let err = footprint(&shoot("a", vec![Worker::new("w", "huge", 1, 2)]), &profile())
            .unwrap_err();
        assert_eq!(err, QuotaError::UnknownMachineType("huge".to_string()));

        let mut worker = Worker::new("w", "small", 1, 2);
        worker.volume = Some(Volume {
            type_: Some("missing".to_string()),
            volume_size: Some(q("10Gi")),
        });
        assert_eq!(
            footprint(&shoot("a", vec![worker.clone()]), &profile()).unwrap_err(),
            QuotaError::UnknownVolumeType("missing".to_string())
        );

        worker.volume = Some(Volume {
            type_: Some("odd".to_string()),
            volume_size: Some(q("10Gi")),
        });
        assert!(matches!(
            footprint(&shoot("a", vec![worker]), &profile()).unwrap_err(),
            QuotaError::UnknownVolumeClass { .. }
        ));
    }

    #[test]
    fn test_exceeded_metrics_cpu_only() {
        let quota = quota(&[(QuotaMetric::Cpu, "2"), (QuotaMetric::Memory, "100Gi")]);
        let existing = footprint(&shoot("a", vec![Worker::new("w", "small", 1, 1)]), &profile())
            .unwrap();
        let target = footprint(&shoot("b", vec![Worker::new("w", "small", 1, 2)]), &profile())
            .unwrap();
        assert_eq!(
            exceeded_metrics(&quota, &target, &[existing]),
            vec![QuotaMetric::Cpu]
        );
    }

    #[test]
    fn test_exceeded_metrics_at_limit_passes() {
        let quota = quota(&[(QuotaMetric::Cpu, "2")]);
        let one = footprint(&shoot("a", vec![Worker::new("w", "small", 1, 1)]), &profile())
            .unwrap();
        assert!(exceeded_metrics(&quota, &one, &[one.clone()]).is_empty());
        assert_eq!(
            exceeded_metrics(&quota, &one, &[one.clone(), one.clone()]),
            vec![QuotaMetric::Cpu]
        );
    }

    #[test]
    fn test_exceeded_metrics_unused_storage_class_within_limit() {
        let quota = quota(&[(QuotaMetric::StoragePremium, "0")]);
        let target = footprint(&shoot("a", vec![Worker::new("w", "small", 1, 1)]), &profile())
            .unwrap();
        assert!(exceeded_metrics(&quota, &target, &[]).is_empty());
    }

    #[test]
    fn test_exceeded_metrics_over_allocated_by_others() {
        let quota = quota(&[(QuotaMetric::StoragePremium, "10Gi")]);
        let mut other = Footprint::default();
        other.add(QuotaMetric::StoragePremium, q("20Gi"));
        let mut target = Footprint::default();
        target.add(QuotaMetric::Cpu, q("1"));
        assert_eq!(
            exceeded_metrics(&quota, &target, &[other]),
            vec![QuotaMetric::StoragePremium]
        );
    }

    #[test]
    fn test_check_quota_reports_all_quotas() {
        let target = footprint(&shoot("a", vec![Worker::new("w", "gpu", 1, 1)]), &profile())
            .unwrap();
        let mut first = quota(&[(QuotaMetric::Cpu, "1")]);
        first.metadata.name = "first".to_string();
        let mut second = quota(&[(QuotaMetric::Gpu, "0"), (QuotaMetric::Memory, "1Gi")]);
        second.metadata.name = "second".to_string();

        let exceeded = check_quota(&target, &[(first, vec![]), (second, vec![])]);
        assert_eq!(exceeded.len(), 3);
        assert_eq!(
            exceeded_message(&exceeded),
            "Quota limits exceeded. Unable to allocate further cpu, gpu, memory"
        );
    }

    #[test]
    fn test_quota_consumers() {
        let quota = quota(&[(QuotaMetric::Cpu, "10")]);
        let binding = SecretBinding {
            metadata: ObjectMeta::namespaced("garden-dev", "binding"),
            secret_ref: ObjectReference::new("garden-dev", "secret"),
            quotas: vec![ObjectReference::new("garden-dev", "q")],
        };
        let unrelated = SecretBinding {
            metadata: ObjectMeta::namespaced("garden-dev", "other"),
            ..Default::default()
        };
        let mut elsewhere = shoot("c", vec![]);
        elsewhere.spec.secret_binding_name = Some("other".to_string());
        let shoots = vec![shoot("a", vec![]), shoot("target", vec![]), elsewhere];
        let target = shoot("target", vec![]);

        let consumers = quota_consumers(&quota, &[binding, unrelated], &shoots, &target);
        let names: Vec<&str> = consumers.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_quota_verification_needed() {
        let old = shoot("a", vec![Worker::new("w", "small", 1, 2)]);
        assert!(!quota_verification_needed(&old, &old));

        let mut smaller = old.clone();
        smaller.spec.provider.workers[0].maximum = 1;
        assert!(!quota_verification_needed(&smaller, &old));

        let mut larger = old.clone();
        larger.spec.provider.workers[0].maximum = 3;
        assert!(quota_verification_needed(&larger, &old));

        let mut added = old.clone();
        added.spec.provider.workers.push(Worker::new("w2", "small", 1, 1));
        assert!(quota_verification_needed(&added, &old));

        let mut machine = old.clone();
        machine.spec.provider.workers[0].machine.type_ = "large".to_string();
        assert!(quota_verification_needed(&machine, &old));

        let mut binding = old.clone();
        binding.spec.secret_binding_name = Some("other".to_string());
        assert!(quota_verification_needed(&binding, &old));

        let mut ingress = old.clone();
        ingress.spec.addons = Some(Addons {
            nginx_ingress: Some(NginxIngress { enabled: true }),
        });
        assert!(quota_verification_needed(&ingress, &old));
    }

    #[test]
    fn test_min_cluster_lifetime_days() {
        let mut a = quota(&[]);
        a.spec.cluster_lifetime_days = Some(14);
        let mut b = quota(&[]);
        b.spec.cluster_lifetime_days = Some(7);
        let c = quota(&[]);
        assert_eq!(min_cluster_lifetime_days([&a, &b, &c]), Some(7));
        assert_eq!(min_cluster_lifetime_days([&c]), None);
    }

    fn with_expiration(mut shoot: Shoot, value: &str) -> Shoot {
        shoot
            .metadata
            .annotations
            .insert(ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP.to_string(), value.to_string());
        shoot
    }

    #[test]
    fn test_check_lifetime() {
        let old = with_expiration(shoot("a", vec![]), "2024-01-10T00:00:00Z");

        let within = with_expiration(old.clone(), "2024-01-17T00:00:00Z");
        assert!(check_lifetime(&within, &old, 7).is_ok());

        let beyond = with_expiration(old.clone(), "2024-01-17T00:00:01Z");
        let err = check_lifetime(&beyond, &old, 7).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Requested shoot expiration time to long. Can only be extended by 7 day(s)"
        );

        assert!(check_lifetime(&old, &old, 0).is_ok());
    }

    #[test]
    fn test_check_lifetime_unrepresentable_limit() {
        let old = with_expiration(shoot("a", vec![]), "2024-01-01T00:00:00Z");
        let new = with_expiration(old.clone(), "2024-01-02T00:00:00Z");
        assert!(check_lifetime(&new, &old, 100_000_000).is_ok());
        assert!(check_lifetime(&new, &old, i32::MAX).is_ok());
    }

    #[test]
    fn test_check_lifetime_from_creation() {
        let mut old = shoot("a", vec![]);
        old.metadata.creation_timestamp = "2024-01-01T00:00:00Z".parse().ok();
        let new = with_expiration(old.clone(), "2024-01-05T00:00:00Z");
        assert!(check_lifetime(&new, &old, 3).is_err());
        assert!(check_lifetime(&new, &old, 4).is_ok());

        let garbage = with_expiration(old.clone(), "tomorrow");
        assert!(matches!(
            check_lifetime(&garbage, &old, 4),
            Err(LifetimeError::InvalidTimestamp { .. })
        ));
    }
}
