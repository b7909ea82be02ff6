use serde::{Deserialize, Serialize};
use std::fmt;

/// How an index cell relates to a query shape.
///
/// Only [`Relation::Inside`] and [`Relation::Outside`] allow a caller to skip
/// per-point tests, so anything that answers them must be certain.
/// [`Relation::Crosses`] is always a safe answer: it only costs work.
///
/// # Examples
///
/// ```
/// use spatio_types::Relation;
///
/// let r = Relation::Inside;
/// assert!(r.is_inside());
/// assert!(!r.needs_exact_test());
/// assert_eq!(r.to_string(), "inside");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// The cell lies entirely within the query shape.
    Inside,
    /// The cell and the query shape do not intersect.
    Outside,
    /// The shape boundary may pass through the cell.
    Crosses,
}

impl Relation {
    #[inline]
    pub fn is_inside(self) -> bool {
        self == Relation::Inside
    }

    #[inline]
    pub fn is_outside(self) -> bool {
        self == Relation::Outside
    }

    /// True when the points of the cell must be tested one by one.
    #[inline]
    pub fn needs_exact_test(self) -> bool {
        self == Relation::Crosses
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Inside => "inside",
            Relation::Outside => "outside",
            Relation::Crosses => "crosses",
        };
        f.write_str(name)
    }
}
