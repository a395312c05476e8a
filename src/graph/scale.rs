const MAX_SCALE: f64 = 3.0;
const NODES_PER_DECADE: f64 = 500.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleController {
    scale: f64,
}

impl Default for ScaleController {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl ScaleController {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn target_for(total_nodes: usize) -> f64 {
        (1.0 + (1.0 + total_nodes as f64 / NODES_PER_DECADE).log10()).min(MAX_SCALE)
    }

    /// Returns whether the stored scale changed. Callers own the
    /// repositioning pass that must follow a change.
    pub fn recompute(&mut self, total_nodes: usize) -> bool {
        let target = Self::target_for(total_nodes);
        if target == self.scale {
            return false;
        }
        log::debug!(
            "scale {:.4} -> {:.4} for {total_nodes} nodes",
            self.scale,
            target
        );
        self.scale = target;
        true
    }
}
