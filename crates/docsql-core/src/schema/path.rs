use std::fmt;

/// A dotted field reference split into its top-level column and the path
/// below it: `"c.d.0"` is column `c` with steps `d`, `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub column: String,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl FieldPath {
    /// Returns `None` when any segment is empty or contains characters other
    /// than ASCII alphanumerics, `_` and `-`.
    pub fn parse(name: &str) -> Option<FieldPath> {
        let mut segments = name.split('.');
        let column = segments.next().filter(|column| is_segment(column))?;

        let steps = segments
            .map(|segment| {
                if !is_segment(segment) {
                    None
                } else if let Ok(index) = segment.parse::<usize>() {
                    Some(PathStep::Index(index))
                } else {
                    Some(PathStep::Key(segment.to_string()))
                }
            })
            .collect::<Option<Vec<_>>>()?;

        Some(FieldPath {
            column: column.to_string(),
            steps,
        })
    }

    pub fn is_column(&self) -> bool {
        self.steps.is_empty()
    }

    /// The path below the column as a PostgreSQL text-array literal,
    /// `'{d, e}'`.
    pub fn steps_literal(&self) -> String {
        let steps = self
            .steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        format!("'{{{}}}'", steps.join(", "))
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => f.write_str(key),
            PathStep::Index(index) => write!(f, "{index}"),
        }
    }
}
