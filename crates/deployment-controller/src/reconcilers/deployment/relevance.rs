//! # Metadata Relevance
//!
//! Pod template metadata is written by several actors: the serving platform,
//! the orchestration platform itself, admission webhooks, users and other
//! operators. Only keys owned by the first two are reconciled. Classification
//! is per key; the rest of the map never influences whether a key counts.

use crate::config::{DomainMatch, RelevanceConfig};
use std::collections::{BTreeMap, BTreeSet};

/// Which metadata map a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Annotation,
    Label,
}

impl MetadataKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKind::Annotation => "annotations",
            MetadataKind::Label => "labels",
        }
    }
}

/// Relevant and irrelevant halves of a metadata map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub relevant: BTreeMap<String, String>,
    pub irrelevant: BTreeMap<String, String>,
}

/// Classifies metadata keys as relevant (reconciled) or irrelevant (foreign).
#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    annotations: BTreeSet<String>,
    labels: BTreeSet<String>,
    infrastructure_domain: String,
    domain_match: DomainMatch,
}

impl Default for RelevanceClassifier {
    fn default() -> Self {
        Self::new(&RelevanceConfig::default())
    }
}

impl RelevanceClassifier {
    #[must_use]
    pub fn new(config: &RelevanceConfig) -> Self {
        Self {
            annotations: config.annotations.clone(),
            labels: config.labels.clone(),
            infrastructure_domain: config.infrastructure_domain.clone(),
            domain_match: config.domain_match,
        }
    }

    /// Whether the key is owned by the orchestration platform.
    ///
    /// In suffix mode the key's prefix (the part before `/`) must equal the
    /// domain or end with `.<domain>`. Keys without a prefix never match.
    #[must_use]
    pub fn is_infrastructure_key(&self, key: &str) -> bool {
        let domain = self.infrastructure_domain.as_str();
        match self.domain_match {
            DomainMatch::Substring => key.contains(domain),
            DomainMatch::Suffix => match key.split_once('/') {
                Some((prefix, _)) => {
                    prefix == domain
                        || prefix
                            .strip_suffix(domain)
                            .is_some_and(|rest| rest.ends_with('.'))
                }
                None => false,
            },
        }
    }

    #[must_use]
    pub fn is_relevant(&self, kind: MetadataKind, key: &str) -> bool {
        let allow_list = match kind {
            MetadataKind::Annotation => &self.annotations,
            MetadataKind::Label => &self.labels,
        };
        allow_list.contains(key) || self.is_infrastructure_key(key)
    }

    /// Keep only relevant entries. Values are preserved; `None` is empty.
    #[must_use]
    pub fn filter_relevant(
        &self,
        kind: MetadataKind,
        map: Option<&BTreeMap<String, String>>,
    ) -> BTreeMap<String, String> {
        map.into_iter()
            .flatten()
            .filter(|(key, _)| self.is_relevant(kind, key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// True if at least one key is irrelevant.
    #[must_use]
    pub fn has_irrelevant(&self, kind: MetadataKind, map: Option<&BTreeMap<String, String>>) -> bool {
        map.into_iter()
            .flatten()
            .any(|(key, _)| !self.is_relevant(kind, key))
    }

    /// Split a map into its relevant and irrelevant entries.
    #[must_use]
    pub fn partition(&self, kind: MetadataKind, map: Option<&BTreeMap<String, String>>) -> Partition {
        let (relevant, irrelevant): (BTreeMap<_, _>, BTreeMap<_, _>) = map
            .into_iter()
            .flatten()
            .map(|(key, value)| (key.clone(), value.clone()))
            .partition(|(key, _)| self.is_relevant(kind, key));
        Partition {
            relevant,
            irrelevant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn substring_classifier() -> RelevanceClassifier {
        RelevanceClassifier::new(&RelevanceConfig {
            domain_match: DomainMatch::Substring,
            ..RelevanceConfig::default()
        })
    }

    #[test]
    fn test_allow_listed_keys_are_relevant() {
        let classifier = RelevanceClassifier::default();
        assert!(classifier.is_relevant(
            MetadataKind::Annotation,
            "serving.kserve.io/targetUtilizationPercentage"
        ));
        assert!(classifier.is_relevant(MetadataKind::Label, "component"));
        assert!(!classifier.is_relevant(MetadataKind::Annotation, "annotation.custom.io/my-annotation"));
        assert!(!classifier.is_relevant(MetadataKind::Label, "label.custom.io/my-label"));
    }

    #[test]
    fn test_allow_lists_are_per_kind() {
        let classifier = RelevanceClassifier::default();
        // a label key is not automatically a relevant annotation and vice versa
        assert!(!classifier.is_relevant(MetadataKind::Annotation, "component"));
        assert!(!classifier.is_relevant(
            MetadataKind::Label,
            "serving.kserve.io/deploymentMode"
        ));
    }

    #[test]
    fn test_infrastructure_keys_are_relevant_for_both_kinds() {
        let classifier = RelevanceClassifier::default();
        for key in [
            "deployment.kubernetes.io/revision",
            "app.kubernetes.io/instance",
            "kubernetes.io/arch",
        ] {
            assert!(classifier.is_relevant(MetadataKind::Annotation, key), "{key}");
            assert!(classifier.is_relevant(MetadataKind::Label, key), "{key}");
        }
    }

    #[test]
    fn test_suffix_match_rejects_lookalike_domains() {
        let classifier = RelevanceClassifier::default();
        for key in [
            "mykubernetes.io/thing",
            "kubernetes.io.example.com/thing",
            "example.com/kubernetes.io",
            "kubernetes.io",
        ] {
            assert!(!classifier.is_infrastructure_key(key), "{key}");
        }
    }

    #[test]
    fn test_substring_match_accepts_lookalike_domains() {
        let classifier = substring_classifier();
        for key in [
            "mykubernetes.io/thing",
            "kubernetes.io.example.com/thing",
            "example.com/kubernetes.io",
            "deployment.kubernetes.io/revision",
        ] {
            assert!(classifier.is_infrastructure_key(key), "{key}");
        }
        assert!(!classifier.is_infrastructure_key("label.custom.io/my-label"));
    }

    #[test]
    fn test_filter_relevant_preserves_values() {
        let classifier = RelevanceClassifier::default();
        let labels = map(&[
            ("component", "predictor"),
            ("app.kubernetes.io/name", "my-app"),
            ("label.custom.io/my-label", "hello"),
        ]);

        let relevant = classifier.filter_relevant(MetadataKind::Label, Some(&labels));
        assert_eq!(
            relevant,
            map(&[("component", "predictor"), ("app.kubernetes.io/name", "my-app")])
        );
    }

    #[test]
    fn test_empty_and_absent_maps() {
        let classifier = RelevanceClassifier::default();
        let empty = BTreeMap::new();
        assert!(classifier
            .filter_relevant(MetadataKind::Annotation, None)
            .is_empty());
        assert!(classifier
            .filter_relevant(MetadataKind::Annotation, Some(&empty))
            .is_empty());
        assert!(!classifier.has_irrelevant(MetadataKind::Annotation, None));
        assert!(!classifier.has_irrelevant(MetadataKind::Label, Some(&empty)));
    }

    #[test]
    fn test_has_irrelevant() {
        let classifier = RelevanceClassifier::default();
        let relevant_only = map(&[("model", "sklearn"), ("app.kubernetes.io/name", "my-app")]);
        let mixed = map(&[("model", "sklearn"), ("team", "ml")]);

        assert!(!classifier.has_irrelevant(MetadataKind::Label, Some(&relevant_only)));
        assert!(classifier.has_irrelevant(MetadataKind::Label, Some(&mixed)));
    }

    #[test]
    fn test_partition() {
        let classifier = RelevanceClassifier::default();
        let annotations = map(&[
            ("serving.kserve.io/metrics", "cpu"),
            ("annotation.custom.io/my-annotation", "hello"),
        ]);

        let partition = classifier.partition(MetadataKind::Annotation, Some(&annotations));
        assert_eq!(partition.relevant, map(&[("serving.kserve.io/metrics", "cpu")]));
        assert_eq!(
            partition.irrelevant,
            map(&[("annotation.custom.io/my-annotation", "hello")])
        );
    }

    #[test]
    fn test_custom_allow_list() {
        let mut config = RelevanceConfig::default();
        config.labels.insert("team".to_string());
        let classifier = RelevanceClassifier::new(&config);
        assert!(classifier.is_relevant(MetadataKind::Label, "team"));
    }
}
