// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! CIDR disjointness between shoot and seed networks.

use ipnet::IpNet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CIDR {field} {value:?}: {reason}")]
pub struct NetworkError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

/// A named CIDR, e.g. `("pods", 100.96.0.0/11)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedNetwork<'a> {
    pub name: &'a str,
    pub net: IpNet,
}

/// Parse a CIDR, naming the field it came from on failure.
pub fn parse_cidr(field: &str, value: &str) -> Result<IpNet, NetworkError> {
    value.trim().parse::<IpNet>().map_err(|e| NetworkError {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse the set fields of a list of `(name, Option<cidr>)` pairs.
pub fn parse_networks<'a>(
    fields: &[(&'a str, Option<&str>)],
) -> Result<Vec<NamedNetwork<'a>>, NetworkError> {
    fields
        .iter()
        .filter_map(|(name, value)| value.map(|v| (*name, v)))
        .map(|(name, value)| {
            parse_cidr(name, value).map(|net| NamedNetwork { name, net })
        })
        .collect()
}

/// Two networks overlap when either contains the other's network address.
/// IPv4 and IPv6 networks never overlap.
pub fn networks_overlap(a: &IpNet, b: &IpNet) -> bool {
    match (a, b) {
        (IpNet::V4(_), IpNet::V4(_)) | (IpNet::V6(_), IpNet::V6(_)) => {
            a.contains(&b.network()) || b.contains(&a.network())
        }
        _ => false,
    }
}

/// All pairs `(shoot network, seed network)` that overlap.
pub fn overlapping_pairs<'a, 'b>(
    shoot: &[NamedNetwork<'a>],
    seed: &[NamedNetwork<'b>],
) -> Vec<(NamedNetwork<'a>, NamedNetwork<'b>)> {
    shoot
        .iter()
        .flat_map(|s| {
            seed.iter()
                .filter(move |d| networks_overlap(&s.net, &d.net))
                .map(move |d| (*s, *d))
        })
        .collect()
}

/// Returns true if no shoot network overlaps any seed network.
pub fn disjoint(shoot: &[NamedNetwork<'_>], seed: &[NamedNetwork<'_>]) -> bool {
    overlapping_pairs(shoot, seed).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_overlap_contained() {
        assert!(networks_overlap(&net("10.0.0.0/8"), &net("10.1.0.0/16")));
        assert!(networks_overlap(&net("10.1.0.0/16"), &net("10.0.0.0/8")));
    }

    #[test]
    fn test_overlap_disjoint() {
        assert!(!networks_overlap(&net("10.0.0.0/16"), &net("10.1.0.0/16")));
        assert!(!networks_overlap(&net("100.64.0.0/13"), &net("100.96.0.0/11")));
    }

    #[test]
    fn test_overlap_mixed_families() {
        assert!(!networks_overlap(&net("10.0.0.0/8"), &net("fd00::/8")));
        assert!(networks_overlap(&net("fd00::/8"), &net("fd00:1::/32")));
    }

    #[test]
    fn test_parse_networks_skips_unset() {
        let parsed =
            parse_networks(&[("pods", Some("100.96.0.0/11")), ("nodes", None)]).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "pods");
    }

    #[test]
    fn test_parse_networks_invalid() {
        let err = parse_networks(&[("services", Some("not-a-cidr"))]).unwrap_err();
        assert_eq!(err.field, "services");
        assert!(err.to_string().contains("not-a-cidr"));
    }

    #[test]
    fn test_overlapping_pairs() {
        let shoot = parse_networks(&[
            ("pods", Some("100.96.0.0/11")),
            ("services", Some("100.64.0.0/13")),
        ])
        .unwrap();
        let seed = parse_networks(&[("pods", Some("100.64.0.0/12"))]).unwrap();
        let pairs = overlapping_pairs(&shoot, &seed);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.name, "services");
        assert!(!disjoint(&shoot, &seed));
    }
}
