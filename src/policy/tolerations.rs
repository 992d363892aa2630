// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Toleration default merging and allowlist validation.

use crate::admission::errors::{field_forbidden, FieldError};
use crate::api::core::Toleration;
use std::collections::HashSet;

/// Merge layers of default tolerations into `existing`.
///
/// Keys already present win, and among the layers the first occurrence of a
/// key wins; later entries for the same key are dropped entirely. The result
/// is a new vector with `existing` unchanged at its front.
pub fn merge_defaults(existing: &[Toleration], layers: &[&[Toleration]]) -> Vec<Toleration> {
    let mut merged = existing.to_vec();
    let mut keys: HashSet<String> = existing.iter().map(|t| t.key.clone()).collect();

    for layer in layers {
        for default in layer.iter() {
            if keys.insert(default.key.clone()) {
                merged.push(default.clone());
            }
        }
    }
    merged
}

/// Identifier used to compare tolerations across revisions.
///
/// NOTE: an unset value and an empty value produce the same identifier, so
/// changing one into the other is not seen as a change.
fn identifier(toleration: &Toleration) -> String {
    format!(
        "{}={}",
        toleration.key,
        toleration.value.as_deref().unwrap_or("")
    )
}

/// Tolerations of `new` (with their index in `new`) whose identifier does not
/// occur in `old`.
pub fn changed_tolerations<'a>(
    new: &'a [Toleration],
    old: &[Toleration],
) -> Vec<(usize, &'a Toleration)> {
    let previous: HashSet<String> = old.iter().map(identifier).collect();
    new.iter()
        .enumerate()
        .filter(|(_, t)| !previous.contains(&identifier(t)))
        .collect()
}

/// Returns true if some allowlist entry permits the toleration.
pub fn is_allowed(toleration: &Toleration, allowlist: &[Toleration]) -> bool {
    allowlist.iter().any(|entry| entry.permits(toleration))
}

/// Validate indexed candidates against an allowlist. Every disallowed
/// candidate yields one Forbidden error at `<path>[<index>]`.
pub fn validate_against_allowlist<'a>(
    candidates: impl IntoIterator<Item = (usize, &'a Toleration)>,
    allowlist: &[Toleration],
    path: &str,
) -> Vec<FieldError> {
    candidates
        .into_iter()
        .filter(|(_, t)| !is_allowed(t, allowlist))
        .map(|(index, t)| {
            field_forbidden(
                &format!("{}[{}]", path, index),
                &format!("toleration \"{}\" is not in the list of allowed tolerations", t),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(key: &str) -> Toleration {
        Toleration::new(key)
    }

    fn tv(key: &str, value: &str) -> Toleration {
        Toleration::with_value(key, value)
    }

    #[test]
    fn test_merge_defaults_first_occurrence_wins() {
        let merged = merge_defaults(&[t("baz")], &[&[t("foo")], &[t("bar"), tv("baz", "foo")]]);
        assert_eq!(merged, vec![t("baz"), t("foo"), t("bar")]);
    }

    #[test]
    fn test_merge_defaults_existing_wins() {
        let merged = merge_defaults(&[tv("a", "mine")], &[&[tv("a", "default"), t("b")]]);
        assert_eq!(merged, vec![tv("a", "mine"), t("b")]);
    }

    #[test]
    fn test_merge_defaults_earlier_layer_wins() {
        let merged = merge_defaults(&[], &[&[tv("a", "global")], &[tv("a", "project")]]);
        assert_eq!(merged, vec![tv("a", "global")]);
    }

    #[test]
    fn test_merge_defaults_idempotent() {
        let layer = [t("a"), tv("b", "1")];
        let once = merge_defaults(&[t("c")], &[&layer]);
        let twice = merge_defaults(&once, &[&layer]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_defaults_no_layers() {
        assert_eq!(merge_defaults(&[t("a")], &[]), vec![t("a")]);
    }

    #[test]
    fn test_changed_tolerations() {
        let old = [t("foo")];
        let new = [t("foo"), t("bar")];
        let changed = changed_tolerations(&new, &old);
        assert_eq!(changed, vec![(1, &new[1])]);
    }

    #[test]
    fn test_changed_tolerations_value_change() {
        let old = [tv("foo", "a")];
        let new = [tv("foo", "b")];
        assert_eq!(changed_tolerations(&new, &old).len(), 1);
    }

    #[test]
    fn test_changed_tolerations_unset_and_empty_value_conflated() {
        let old = [t("foo")];
        let new = [tv("foo", "")];
        assert!(changed_tolerations(&new, &old).is_empty());
    }

    #[test]
    fn test_validate_against_allowlist() {
        let allowlist = [t("foo"), tv("bar", "1")];
        let candidates = [t("foo"), tv("foo", "x"), tv("bar", "2"), tv("bar", "1"), t("baz")];
        let errors = validate_against_allowlist(
            candidates.iter().enumerate(),
            &allowlist,
            "spec.tolerations",
        );
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["spec.tolerations[2]", "spec.tolerations[4]"]);
    }

    #[test]
    fn test_validate_against_empty_allowlist() {
        let errors =
            validate_against_allowlist([(0, &t("foo"))], &[], "spec.tolerations");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("toleration \"foo\""));
    }

    #[test]
    fn test_validate_on_update_only_checks_changed() {
        let allowlist = [t("foo")];
        let old = [t("foo"), t("legacy")];
        let new = [t("foo"), t("legacy"), t("bar")];
        let errors = validate_against_allowlist(
            changed_tolerations(&new, &old),
            &allowlist,
            "spec.tolerations",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "spec.tolerations[2]");
    }
}
