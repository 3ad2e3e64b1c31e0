//! Truncation selection: keep the best-ranked individuals.

/// Selection contract violations.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Population has {population} individuals but {fitnesses} fitness values")]
    LengthMismatch { population: usize, fitnesses: usize },
    #[error("Cannot select {requested} out of {available} individuals")]
    TooMany { requested: usize, available: usize },
}

/// Return the `n` fittest individuals, best first.
///
/// The sort is stable: individuals with equal fitness keep their population
/// order, so repeated runs with the same inputs select the same individuals.
pub fn select<T: Clone>(population: &[T], fitnesses: &[f64], n: usize) -> Result<Vec<T>, SelectionError> {
    if population.len() != fitnesses.len() {
        return Err(SelectionError::LengthMismatch {
            population: population.len(),
            fitnesses: fitnesses.len(),
        });
    }
    if n > population.len() {
        return Err(SelectionError::TooMany {
            requested: n,
            available: population.len(),
        });
    }

    Ok(rank(fitnesses)
        .into_iter()
        .take(n)
        .map(|i| population[i].clone())
        .collect())
}

/// Indices ordered by descending fitness, ties in population order.
pub fn rank(fitnesses: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitnesses.len()).collect();
    order.sort_by(|&a, &b| fitnesses[b].total_cmp(&fitnesses[a]));
    order
}
