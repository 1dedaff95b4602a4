use super::{Balancer, NodeSnapshot};

/// Honors `preferred` when its load is under the sticky threshold;
/// otherwise argmin over `active/capacity`, ties broken by iteration
/// order (i.e. first node encountered with the minimum load).
pub struct LeastLoadedBalancer {
    sticky_threshold: f64,
}

impl LeastLoadedBalancer {
    pub fn new() -> Self {
        Self { sticky_threshold: 0.8 }
    }
}

impl Default for LeastLoadedBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for LeastLoadedBalancer {
    fn select_node(&self, preferred: &str, available: &[NodeSnapshot]) -> String {
        if available.is_empty() {
            return String::new();
        }
        if let Some(node) = available.iter().find(|n| n.id == preferred) {
            if node.load() < self.sticky_threshold {
                return node.id.clone();
            }
        }
        available
            .iter()
            .min_by(|a, b| a.load().partial_cmp(&b.load()).unwrap())
            .map(|n| n.id.clone())
            .unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "least-loaded"
    }
}
