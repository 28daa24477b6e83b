//! Data domain catalog for keyword-based intent classification
//!
//! A domain groups the vocabulary users reach for when asking about one
//! area of the warehouse, together with the tables that serve it. The
//! catalog is what lets the offline classifier map a vague question to
//! concrete tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One data domain: keywords, backing tables, and a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDomain {
    pub name: String,
    pub keywords: Vec<String>,
    pub tables: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Ordered collection of data domains
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainCatalog {
    domains: Vec<DataDomain>,
}

impl DomainCatalog {
    /// Create a catalog from explicit domains
    pub fn new(domains: Vec<DataDomain>) -> Self {
        Self { domains }
    }

    /// Catalog with the built-in user-activity domain
    pub fn default_catalog() -> Self {
        Self::new(vec![DataDomain {
            name: "user_activity".to_string(),
            keywords: [
                "visitors",
                "visitor",
                "visit",
                "visited",
                "onsite",
                "website",
                "unique visitors",
                "unique users",
                "daily active",
                "weekly active",
                "monthly active",
                "active users",
                "user activity",
                "engagement",
                "active days",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            tables: vec!["weekly_active_users_agg_vw".to_string()],
            description: "Website visit and user activity count data".to_string(),
        }])
    }

    /// Build a catalog from config-supplied `domain -> keywords` pairs.
    /// Config domains carry no table hints; they only steer classification.
    pub fn from_config(map: &BTreeMap<String, Vec<String>>) -> Self {
        Self::new(
            map.iter()
                .map(|(name, keywords)| DataDomain {
                    name: name.clone(),
                    keywords: keywords.clone(),
                    tables: Vec::new(),
                    description: String::new(),
                })
                .collect(),
        )
    }

    /// All domains, in declaration order
    pub fn domains(&self) -> &[DataDomain] {
        &self.domains
    }

    /// First domain with a keyword contained in the query (case-insensitive)
    pub fn match_domain(&self, query: &str) -> Option<&DataDomain> {
        let query = query.to_lowercase();
        self.domains.iter().find(|domain| {
            domain
                .keywords
                .iter()
                .any(|keyword| query.contains(&keyword.to_lowercase()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_catalog_matches_activity_vocabulary() {
        let catalog = DomainCatalog::default_catalog();
        let domain = catalog
            .match_domain("How many weekly active users did we have?")
            .unwrap();
        assert_eq!(domain.name, "user_activity");
        assert_eq!(domain.tables, vec!["weekly_active_users_agg_vw"]);
    }

    #[test]
    fn unmatched_query_has_no_domain() {
        let catalog = DomainCatalog::default_catalog();
        assert!(catalog.match_domain("what does the orders model do?").is_none());
    }

    #[test]
    fn config_domains_participate_in_matching() {
        let mut map = BTreeMap::new();
        map.insert("billing".to_string(), vec!["invoice".to_string()]);
        let catalog = DomainCatalog::from_config(&map);

        let domain = catalog.match_domain("show me invoice totals").unwrap();
        assert_eq!(domain.name, "billing");
        assert!(domain.tables.is_empty());
    }
}
