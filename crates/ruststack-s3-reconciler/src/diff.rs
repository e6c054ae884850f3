//! Change detection between two bucket configurations.

use std::collections::BTreeSet;

use crate::facets::{BucketConfig, FacetName, SyncPass};

/// Facets whose canonical value differs between `old` and `new`.
///
/// With no `old` snapshot every facet that differs from its remote default
/// is reported. The ACL is never reported on the creation pass since the
/// create call already carried it.
///
/// The result iterates in apply order.
#[must_use]
pub fn changed_facets(
    old: Option<&BucketConfig>,
    new: &BucketConfig,
    pass: SyncPass,
) -> BTreeSet<FacetName> {
    FacetName::ALL
        .into_iter()
        .filter(|facet| !(pass == SyncPass::Create && *facet == FacetName::Acl))
        .filter(|facet| match old {
            Some(old) => !BucketConfig::equivalent(*facet, old, new),
            None => new.is_present(*facet),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ruststack_s3_model::types::{BucketAccelerateStatus, BucketCannedAcl};

    use super::*;
    use crate::facets::{CorsRule, PolicyDocument, Versioning};

    fn sample() -> BucketConfig {
        BucketConfig {
            acl: Some(BucketCannedAcl::PublicRead),
            tags: BTreeMap::from([("env".to_owned(), "prod".to_owned())]),
            versioning: Some(Versioning {
                enabled: true,
                mfa_delete: false,
            }),
            cors_rules: vec![CorsRule {
                allowed_methods: vec!["GET".into()],
                allowed_origins: vec!["*".into()],
                ..CorsRule::default()
            }],
            policy: Some(PolicyDocument::parse(r#"{"Version":"2012-10-17"}"#).unwrap()),
            ..BucketConfig::default()
        }
    }

    #[test]
    fn test_should_report_nothing_for_identical_snapshots() {
        let config = sample();
        assert!(changed_facets(Some(&config), &config, SyncPass::Update).is_empty());
    }

    #[test]
    fn test_should_report_every_present_facet_without_prior() {
        let changed = changed_facets(None, &sample(), SyncPass::Update);
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![
                FacetName::Tags,
                FacetName::Policy,
                FacetName::Cors,
                FacetName::Versioning,
                FacetName::Acl,
            ]
        );
    }

    #[test]
    fn test_should_skip_acl_on_creation_pass() {
        let changed = changed_facets(None, &sample(), SyncPass::Create);
        assert!(!changed.contains(&FacetName::Acl));
        assert!(changed.contains(&FacetName::Tags));
    }

    #[test]
    fn test_should_report_removed_facet() {
        let old = sample();
        let mut new = sample();
        new.cors_rules.clear();
        new.policy = None;
        let changed = changed_facets(Some(&old), &new, SyncPass::Update);
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![FacetName::Policy, FacetName::Cors]
        );
    }

    #[test]
    fn test_should_ignore_explicit_defaults() {
        let old = BucketConfig::default();
        let new = BucketConfig {
            acceleration_status: Some(BucketAccelerateStatus::Suspended),
            acl: Some(BucketCannedAcl::Private),
            ..BucketConfig::default()
        };
        assert!(changed_facets(Some(&old), &new, SyncPass::Update).is_empty());
    }
}
