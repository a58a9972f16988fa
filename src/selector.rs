// Result Filter/Selector: budget ceiling plus top-N view over ranked packages

use crate::composer::Package;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_TOP_N: usize = 5;

// Why a selection came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAdvisory {
    // The composer produced no packages at all
    NoPairings,
    // There were packages, but all of them exceed the budget
    NothingWithinBudget,
}

impl fmt::Display for SelectionAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionAdvisory::NoPairings => f.write_str("no flight and hotel could be paired"),
            SelectionAdvisory::NothingWithinBudget => {
                f.write_str("no package fits within the budget")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub packages: Vec<Package>,
    pub advisory: Option<SelectionAdvisory>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

// Keep packages with total_price <= max_price in their incoming order, then
// cut to the first top_n. An empty outcome is not an error; the advisory
// says whether there was nothing to filter or nothing survived the budget.
// It is decided before the cut, so a zero top_n never blames the budget.
pub fn select(packages: Vec<Package>, max_price: f64, top_n: usize) -> Selection {
    if packages.is_empty() {
        return Selection {
            packages,
            advisory: Some(SelectionAdvisory::NoPairings),
        };
    }

    let mut packages: Vec<Package> = packages
        .into_iter()
        .filter(|package| package.total_price() <= max_price)
        .collect();

    let advisory = if packages.is_empty() {
        Some(SelectionAdvisory::NothingWithinBudget)
    } else {
        None
    };

    packages.truncate(top_n);
    Selection { packages, advisory }
}
