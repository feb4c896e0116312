// dataguard-core/src/domain/graph/reference.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::model::DomainName;
use crate::domain::policy::PolicyRegistry;

/// Foreign-key edges between domains: `referrer -> referenced`.
/// Cycles, self references included, are legal: snapshots are fixed before any check runs.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    edges: BTreeMap<DomainName, BTreeSet<DomainName>>,
}

impl ReferenceGraph {
    pub fn from_registry(registry: &PolicyRegistry) -> Self {
        let edges = registry
            .domains()
            .map(|p| (p.name.clone(), p.referenced_domains()))
            .collect();
        Self { edges }
    }

    pub fn references(&self, domain: &DomainName) -> impl Iterator<Item = &DomainName> {
        self.edges.get(domain).into_iter().flatten()
    }

    /// Requested domains plus every domain they transitively reference.
    pub fn closure(&self, roots: &BTreeSet<DomainName>) -> BTreeSet<DomainName> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<DomainName> = roots.iter().cloned().collect();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for next in self.references(&current) {
                if !seen.contains(next) {
                    queue.push_back(next.clone());
                }
            }
        }
        seen
    }

    /// Loading plan for `domains`: referenced domains come before their referrers.
    /// Each layer can be loaded in parallel. Members of a cycle share the last layer.
    pub fn load_layers(&self, domains: &BTreeSet<DomainName>) -> Vec<Vec<DomainName>> {
        let mut in_degree: BTreeMap<&DomainName, usize> = domains.iter().map(|d| (d, 0)).collect();
        let mut dependents: BTreeMap<&DomainName, Vec<&DomainName>> = BTreeMap::new();

        for domain in domains {
            for target in self.references(domain) {
                if target == domain || !domains.contains(target) {
                    continue;
                }
                dependents.entry(target).or_default().push(domain);
                *in_degree.entry(domain).or_insert(0) += 1;
            }
        }

        // Kahn, layer by layer
        let mut layers = Vec::new();
        let mut ready: Vec<&DomainName> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(d, _)| *d)
            .collect();
        let mut resolved = BTreeSet::new();

        while !ready.is_empty() {
            let mut next = Vec::new();
            for current in &ready {
                resolved.insert(*current);
                for dependent in dependents.get(current).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(*dependent);
                        }
                    }
                }
            }
            layers.push(ready.iter().map(|d| (*d).clone()).collect());
            next.sort();
            ready = next;
        }

        let cyclic: Vec<DomainName> = domains
            .iter()
            .filter(|d| !resolved.contains(d))
            .cloned()
            .collect();
        if !cyclic.is_empty() {
            layers.push(cyclic);
        }
        layers
    }

    /// Domains that sit on a reference cycle, self references included.
    pub fn cyclic_members(&self) -> BTreeSet<DomainName> {
        self.edges
            .keys()
            .filter(|d| {
                let start: BTreeSet<DomainName> = self.references(d).cloned().collect();
                self.closure(&start).contains(*d)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, Vec<&str>)]) -> ReferenceGraph {
        ReferenceGraph {
            edges: edges
                .iter()
                .map(|(from, to)| {
                    (
                        DomainName::new(from),
                        to.iter().map(DomainName::new).collect(),
                    )
                })
                .collect(),
        }
    }

    fn names(list: &[&str]) -> BTreeSet<DomainName> {
        list.iter().map(DomainName::new).collect()
    }

    #[test]
    fn test_closure_pulls_referenced_domains() {
        let g = graph(&[
            ("sales", vec!["customers", "products"]),
            ("customers", vec![]),
            ("products", vec!["suppliers"]),
            ("suppliers", vec![]),
        ]);
        let closure = g.closure(&names(&["sales"]));
        assert_eq!(closure, names(&["sales", "customers", "products", "suppliers"]));
        assert_eq!(g.closure(&names(&["customers"])), names(&["customers"]));
    }

    #[test]
    fn test_layers_put_references_first() {
        let g = graph(&[
            ("sales", vec!["customers", "products"]),
            ("customers", vec![]),
            ("products", vec!["suppliers"]),
            ("suppliers", vec![]),
        ]);
        let layers = g.load_layers(&names(&["sales", "customers", "products", "suppliers"]));
        assert_eq!(layers.len(), 3);
        assert!(layers[0].contains(&DomainName::new("customers")));
        assert!(layers[0].contains(&DomainName::new("suppliers")));
        assert_eq!(layers[1], vec![DomainName::new("products")]);
        assert_eq!(layers[2], vec![DomainName::new("sales")]);
    }

    #[test]
    fn test_cycles_are_loaded_not_rejected() {
        let g = graph(&[
            ("employees", vec!["employees", "departments"]),
            ("departments", vec!["employees"]),
            ("audit", vec![]),
        ]);
        let all = names(&["employees", "departments", "audit"]);
        let layers = g.load_layers(&all);
        let loaded: BTreeSet<DomainName> = layers.into_iter().flatten().collect();
        assert_eq!(loaded, all);
        assert_eq!(g.cyclic_members(), names(&["employees", "departments"]));
    }
}
