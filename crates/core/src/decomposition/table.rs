use std::fmt;

/// Level a proportion or R-squared is expressed relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Total,
    Within,
    Between,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Total, Level::Within, Level::Between];

    pub fn name(self) -> &'static str {
        match self {
            Level::Total => "total",
            Level::Within => "within",
            Level::Between => "between",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of outcome variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Fixed slopes of level-1 predictors.
    FixedWithin,
    /// Fixed slopes of level-2 predictors.
    FixedBetween,
    /// All fixed slopes together, used when level-1 predictors are not
    /// cluster-mean-centered.
    Fixed,
    /// Random-slope variation.
    SlopeVariation,
    /// Random intercept (and slope) means variation.
    MeanVariation,
    /// Level-1 residual.
    Residual,
}

impl Component {
    pub fn name(self) -> &'static str {
        match self {
            Component::FixedWithin => "fixed, within",
            Component::FixedBetween => "fixed, between",
            Component::Fixed => "fixed",
            Component::SlopeVariation => "slope variation",
            Component::MeanVariation => "mean variation",
            Component::Residual => "sigma2",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// R-squared measure, named after the components in its numerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    F1,
    F2,
    V,
    M,
    F,
    Fv,
    Fvm,
}

impl Measure {
    pub fn name(self) -> &'static str {
        match self {
            Measure::F1 => "f1",
            Measure::F2 => "f2",
            Measure::V => "v",
            Measure::M => "m",
            Measure::F => "f",
            Measure::Fv => "fv",
            Measure::Fvm => "fvm",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of a level table. `None` marks a cell with no meaning at that level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelRow {
    pub total: f64,
    pub within: Option<f64>,
    pub between: Option<f64>,
}

impl LevelRow {
    pub fn total_only(total: f64) -> Self {
        Self {
            total,
            within: None,
            between: None,
        }
    }

    pub fn get(&self, level: Level) -> Option<f64> {
        match level {
            Level::Total => Some(self.total),
            Level::Within => self.within,
            Level::Between => self.between,
        }
    }
}

/// Rows keyed by component or measure, in a fixed order, with one column per
/// level present.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTable<K> {
    levels: Vec<Level>,
    rows: Vec<(K, LevelRow)>,
}

impl<K: Copy + PartialEq + fmt::Display> LevelTable<K> {
    pub fn new(levels: Vec<Level>, rows: Vec<(K, LevelRow)>) -> Self {
        Self { levels, rows }
    }

    /// Columns present in this table.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn rows(&self) -> &[(K, LevelRow)] {
        &self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.rows.iter().map(|(k, _)| *k)
    }

    pub fn row(&self, key: K) -> Option<&LevelRow> {
        self.rows.iter().find(|(k, _)| *k == key).map(|(_, r)| r)
    }

    /// Cell value, `None` if the row is absent or not applicable at `level`.
    pub fn value(&self, key: K, level: Level) -> Option<f64> {
        self.row(key).and_then(|r| r.get(level))
    }

    /// Plain-text rendering with `NA` for not-applicable cells.
    pub fn format(&self, title: &str) -> String {
        let mut s = String::new();
        s.push_str(&format!("--- {} ---\n", title));
        s.push_str(&format!("{:<18}", ""));
        for level in &self.levels {
            s.push_str(&format!(" {:>10}", level.name()));
        }
        s.push('\n');
        s.push_str(&format!("{}\n", "-".repeat(18 + 11 * self.levels.len())));

        for (key, row) in &self.rows {
            s.push_str(&format!("{:<18}", key.to_string()));
            for &level in &self.levels {
                match row.get(level) {
                    Some(v) => s.push_str(&format!(" {:>10.6}", v)),
                    None => s.push_str(&format!(" {:>10}", "NA")),
                }
            }
            s.push('\n');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LevelTable<Measure> {
        LevelTable::new(
            Level::ALL.to_vec(),
            vec![
                (
                    Measure::F1,
                    LevelRow {
                        total: 0.2,
                        within: Some(0.4),
                        between: None,
                    },
                ),
                (Measure::F, LevelRow::total_only(0.3)),
            ],
        )
    }

    #[test]
    fn test_lookup() {
        let t = table();
        assert_eq!(t.value(Measure::F1, Level::Within), Some(0.4));
        assert_eq!(t.value(Measure::F1, Level::Between), None);
        assert_eq!(t.value(Measure::F, Level::Total), Some(0.3));
        assert_eq!(t.value(Measure::Fvm, Level::Total), None);
        assert_eq!(t.keys().collect::<Vec<_>>(), vec![Measure::F1, Measure::F]);
    }

    #[test]
    fn test_format_marks_na() {
        let text = table().format("R-squared");
        assert!(text.starts_with("--- R-squared ---\n"));
        let f1_line = text.lines().find(|l| l.starts_with("f1")).unwrap();
        assert!(f1_line.contains("0.200000"));
        assert!(f1_line.contains("0.400000"));
        assert!(f1_line.trim_end().ends_with("NA"));
    }

    #[test]
    fn test_names() {
        assert_eq!(Component::Residual.to_string(), "sigma2");
        assert_eq!(Component::FixedWithin.to_string(), "fixed, within");
        assert_eq!(Measure::Fvm.to_string(), "fvm");
        assert_eq!(Level::Between.to_string(), "between");
    }
}
