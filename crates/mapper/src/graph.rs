//! Dependency-topological ordering for `depends_on` / `computed.dependencies`
//! (§3, §8 invariant 3, §9 "cyclic references").

use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency cycle detected involving {0:?}")]
    Cycle(String),
    #[error("{0:?} depends on undefined property {1:?}")]
    UndefinedDependency(String, String),
}

/// Kahn's algorithm with deterministic tie-breaking (insertion order of
/// `edges`), so mapper loads are reproducible (§8 invariant 5, parser
/// determinism).
pub fn topological_order(
    nodes: &[String],
    edges: &HashMap<String, Vec<String>>,
) -> Result<Vec<String>, GraphError> {
    let node_set: HashSet<&str> = nodes.iter().map(String::as_str).collect();
    for (name, deps) in edges {
        for dep in deps {
            if !node_set.contains(dep.as_str()) {
                return Err(GraphError::UndefinedDependency(name.clone(), dep.clone()));
            }
        }
    }

    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for name in nodes {
        let deps = edges.get(name).map(Vec::as_slice).unwrap_or(&[]);
        *in_degree.get_mut(name.as_str()).unwrap() += deps.len();
        for dep in deps {
            dependents.entry(dep.as_str()).or_default().push(name.as_str());
        }
    }

    let mut ready: Vec<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|n| in_degree[n] == 0)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(name) = ready.first().copied() {
        ready.remove(0);
        order.push(name.to_string());
        if let Some(children) = dependents.get(name) {
            for &child in children {
                let degree = in_degree.get_mut(child).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.push(child);
                }
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = nodes
            .iter()
            .find(|n| !order.contains(n))
            .cloned()
            .unwrap_or_default();
        return Err(GraphError::Cycle(stuck));
    }

    Ok(order)
}
