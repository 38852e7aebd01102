//! Node selection: `score = compute_power * (1 - current_load)`,
//! required nodes first, then preferred, then by score until `min_nodes`
//! is reached (spec §4.4).

use crate::error::{Error, Result};

use super::node::NodeEntry;

pub struct SelectionRequest<'a> {
    pub protocol: &'a str,
    pub required: &'a [String],
    pub preferred: &'a [String],
    pub min_nodes: usize,
    pub max_nodes: usize,
}

fn score(node: &NodeEntry) -> f64 {
    node.capabilities.compute_power * (1.0 - node.current_load())
}

/// Selects up to `max_nodes` from `candidates` (the full registry
/// snapshot): eligible nodes are those supporting `protocol` and not
/// Busy. Required nodes are included unconditionally (even if currently
/// Busy, the caller asked for them by name); preferred nodes come
/// next; the remainder is filled by descending score.
pub fn select_nodes(candidates: &[NodeEntry], req: &SelectionRequest) -> Result<Vec<String>> {
    let mut selected: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for id in req.required {
        if seen.insert(id.clone()) {
            selected.push(id.clone());
        }
    }

    let eligible: Vec<&NodeEntry> = candidates
        .iter()
        .filter(|n| n.supports(req.protocol) && n.is_selectable())
        .collect();

    for id in req.preferred {
        if selected.len() >= req.max_nodes {
            break;
        }
        if seen.contains(id) {
            continue;
        }
        if eligible.iter().any(|n| &n.id == id) {
            seen.insert(id.clone());
            selected.push(id.clone());
        }
    }

    let mut ranked: Vec<&NodeEntry> = eligible
        .into_iter()
        .filter(|n| !seen.contains(&n.id))
        .collect();
    ranked.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal));

    for node in ranked {
        if selected.len() >= req.max_nodes {
            break;
        }
        seen.insert(node.id.clone());
        selected.push(node.id.clone());
    }

    if selected.len() < req.min_nodes {
        return Err(Error::InsufficientNodes {
            needed: req.min_nodes,
            have: selected.len(),
        });
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::node::{NodeCapabilities, NodeState};
    use std::collections::HashSet;

    fn node(id: &str, power: f64, load_computations: u32, max_concurrent: u32) -> NodeEntry {
        let mut n = NodeEntry::new(
            id,
            "addr",
            NodeCapabilities {
                max_concurrent,
                compute_power: power,
            },
            HashSet::from(["mean".to_string()]),
        );
        n.state = NodeState::Idle;
        for i in 0..load_computations {
            n.active_computations.insert(format!("c{i}"));
        }
        n
    }

    #[test]
    fn picks_highest_score_first() {
        let candidates = vec![node("low", 1.0, 1, 2), node("high", 2.0, 0, 2)];
        let req = SelectionRequest {
            protocol: "mean",
            required: &[],
            preferred: &[],
            min_nodes: 1,
            max_nodes: 1,
        };
        let selected = select_nodes(&candidates, &req).unwrap();
        assert_eq!(selected, vec!["high".to_string()]);
    }

    #[test]
    fn required_nodes_always_included() {
        let candidates = vec![node("a", 2.0, 0, 2), node("b", 1.0, 0, 2)];
        let req = SelectionRequest {
            protocol: "mean",
            required: &["b".to_string()],
            preferred: &[],
            min_nodes: 1,
            max_nodes: 1,
        };
        let selected = select_nodes(&candidates, &req).unwrap();
        assert_eq!(selected, vec!["b".to_string()]);
    }

    #[test]
    fn fails_below_min_nodes() {
        let candidates = vec![node("a", 1.0, 2, 2)]; // Busy, ineligible
        let req = SelectionRequest {
            protocol: "mean",
            required: &[],
            preferred: &[],
            min_nodes: 1,
            max_nodes: 3,
        };
        let err = select_nodes(&candidates, &req).unwrap_err();
        assert!(matches!(err, Error::InsufficientNodes { needed: 1, have: 0 }));
    }

    #[test]
    fn excludes_nodes_without_the_protocol() {
        let mut other = node("c", 5.0, 0, 2);
        other.supported_protocols = HashSet::from(["variance".to_string()]);
        let candidates = vec![node("a", 1.0, 0, 2), other];
        let req = SelectionRequest {
            protocol: "mean",
            required: &[],
            preferred: &[],
            min_nodes: 1,
            max_nodes: 5,
        };
        let selected = select_nodes(&candidates, &req).unwrap();
        assert_eq!(selected, vec!["a".to_string()]);
    }
}
