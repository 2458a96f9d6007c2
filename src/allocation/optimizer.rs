use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::math::squared_difference;

/// One symbol's target and achievable order values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub symbol: String,
    pub target: Decimal,
    pub candidates: Vec<Decimal>,
}

/// Symbols to allocate, in enumeration order, under an optional capital cap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationProblem {
    pub entries: Vec<AllocationEntry>,
    #[serde(default)]
    pub capital_cap: Option<Decimal>,
}

impl AllocationProblem {
    pub fn new(capital_cap: Option<Decimal>) -> Self {
        Self {
            entries: Vec::new(),
            capital_cap,
        }
    }

    pub fn with_entry(
        mut self,
        symbol: impl Into<String>,
        target: Decimal,
        candidates: impl IntoIterator<Item = Decimal>,
    ) -> Self {
        self.entries.push(AllocationEntry {
            symbol: symbol.into(),
            target,
            candidates: candidates.into_iter().collect(),
        });
        self
    }
}

/// Chosen candidate for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationChoice {
    pub symbol: String,
    pub index: usize,
    pub value: Decimal,
}

/// Best feasible combination, or empty when none exists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSolution {
    pub choices: Vec<AllocationChoice>,
    pub rmse: Option<Decimal>,
    pub total: Decimal,
}

impl AllocationSolution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Chosen candidate index for `symbol`
    pub fn get(&self, symbol: &str) -> Option<usize> {
        self.choices
            .iter()
            .find(|c| c.symbol == symbol)
            .map(|c| c.index)
    }

    /// Chosen indices in entry order
    pub fn indices(&self) -> Vec<usize> {
        self.choices.iter().map(|c| c.index).collect()
    }
}

struct Search<'a> {
    entries: &'a [AllocationEntry],
    cap: Option<Decimal>,
    /// `min_remaining[d]` is the smallest sum entries `d..` can add; empty without a cap
    min_remaining: Vec<Decimal>,
    path: Vec<usize>,
    best: Option<Best>,
}

struct Best {
    squared_error: Decimal,
    total: Decimal,
    indices: Vec<usize>,
}

impl Search<'_> {
    fn visit(&mut self, depth: usize, sum: Decimal, squared_error: Decimal) {
        if let Some(best) = &self.best {
            // Ties keep the earlier combination, so an equal partial error can never win.
            if squared_error >= best.squared_error {
                return;
            }
        }

        if depth == self.entries.len() {
            self.best = Some(Best {
                squared_error,
                total: sum,
                indices: self.path.clone(),
            });
            return;
        }

        let entry = &self.entries[depth];
        for (index, value) in entry.candidates.iter().enumerate() {
            // Sums or errors that overflow a Decimal make the branch infeasible.
            let Some(next_sum) = sum.checked_add(*value) else {
                continue;
            };
            if let Some(cap) = self.cap {
                match next_sum.checked_add(self.min_remaining[depth + 1]) {
                    Some(bound) if bound <= cap => {}
                    _ => continue,
                }
            }
            let Some(next_error) = squared_difference(entry.target, *value)
                .and_then(|square| squared_error.checked_add(square))
            else {
                continue;
            };
            self.path.push(index);
            self.visit(depth + 1, next_sum, next_error);
            self.path.pop();
        }
    }
}

/// Suffix sums of each entry's smallest candidate, `None` on overflow
fn lower_bounds(entries: &[AllocationEntry]) -> Option<Vec<Decimal>> {
    let mut bounds = vec![Decimal::ZERO; entries.len() + 1];
    for depth in (0..entries.len()).rev() {
        let smallest = entries[depth]
            .candidates
            .iter()
            .copied()
            .min()
            .unwrap_or(Decimal::ZERO);
        bounds[depth] = bounds[depth + 1].checked_add(smallest)?;
    }
    Some(bounds)
}

/// Pick one candidate per symbol minimizing RMSE against the targets.
///
/// Combinations whose summed values exceed the cap are infeasible. Among
/// feasible ones the strictly smallest RMSE wins; ties keep the first in
/// enumeration order (first symbol most significant). Returns an empty
/// solution for empty input, an empty candidate list, a cap at or below
/// zero, or when nothing fits under the cap. Combinations whose sum or
/// squared error does not fit in a `Decimal` are treated as infeasible.
pub fn find_minimum_error(problem: &AllocationProblem) -> AllocationSolution {
    let entries = &problem.entries;
    if entries.is_empty() {
        return AllocationSolution::empty();
    }
    if let Some(entry) = entries.iter().find(|e| e.candidates.is_empty()) {
        warn!(symbol = %entry.symbol, "No candidate order sizes");
        return AllocationSolution::empty();
    }
    if let Some(cap) = problem.capital_cap {
        if cap <= Decimal::ZERO {
            warn!(%cap, "Capital cap must be positive");
            return AllocationSolution::empty();
        }
    }

    let min_remaining = match problem.capital_cap {
        Some(cap) => match lower_bounds(entries) {
            Some(bounds) => bounds,
            None => {
                warn!(%cap, "Smallest candidate sum is out of range");
                return AllocationSolution::empty();
            }
        },
        None => Vec::new(),
    };

    let mut search = Search {
        entries,
        cap: problem.capital_cap,
        min_remaining,
        path: Vec::with_capacity(entries.len()),
        best: None,
    };
    search.visit(0, Decimal::ZERO, Decimal::ZERO);

    let Some(best) = search.best else {
        debug!(cap = ?problem.capital_cap, "No allocation fits under the capital cap");
        return AllocationSolution::empty();
    };

    let choices = entries
        .iter()
        .zip(&best.indices)
        .map(|(entry, &index)| AllocationChoice {
            symbol: entry.symbol.clone(),
            index,
            value: entry.candidates[index],
        })
        .collect();

    AllocationSolution {
        choices,
        rmse: (best.squared_error / Decimal::from(entries.len())).sqrt(),
        total: best.total,
    }
}
