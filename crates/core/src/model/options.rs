/// Flags resolved once when a decomposition starts.
///
/// All three default to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompositionOptions {
    /// The first between-cluster estimate is a fixed intercept.
    pub has_intercept: bool,
    /// Level-1 predictors are centered within cluster. Without centering only
    /// the pooled measures (`f`, `v`, `m`, `fv`, `fvm`) are defined.
    pub cluster_mean_centered: bool,
    /// Render an SVG bar chart alongside the tables.
    pub with_graph: bool,
}

impl DecompositionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_intercept(mut self, yes: bool) -> Self {
        self.has_intercept = yes;
        self
    }

    pub fn cluster_mean_centered(mut self, yes: bool) -> Self {
        self.cluster_mean_centered = yes;
        self
    }

    pub fn with_graph(mut self, yes: bool) -> Self {
        self.with_graph = yes;
        self
    }
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            has_intercept: true,
            cluster_mean_centered: true,
            with_graph: true,
        }
    }
}
