use crate::session::Solve;
use crate::util::mean;

pub const RECENT_SOLVES: usize = 5;

/// A solve as shown in the recent list, with its 1-based position in the live window
#[derive(Debug, Clone, PartialEq)]
pub struct RecentSolve {
    pub position: usize,
    pub solve: Solve,
}

/// Rolling statistics over the live window. Always rebuilt from scratch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionStats {
    pub solve_count: usize,
    pub best_ms: Option<u64>,
    pub ao5: Option<f64>,
    pub ao12: Option<f64>,
    pub session_mean: Option<f64>,
    /// Most recent first
    pub recent: Vec<RecentSolve>,
}

impl SessionStats {
    pub fn compute(window: &[Solve]) -> Self {
        let recent = window
            .iter()
            .enumerate()
            .rev()
            .take(RECENT_SOLVES)
            .map(|(idx, solve)| RecentSolve {
                position: idx + 1,
                solve: solve.clone(),
            })
            .collect();

        Self {
            solve_count: window.len(),
            best_ms: window.iter().map(|s| s.duration_ms).min(),
            ao5: average_of(window, 5),
            ao12: average_of(window, 12),
            session_mean: mean(&durations(window)),
            recent,
        }
    }
}

/// Straight mean of the last `n` durations; `None` until `n` solves exist
pub fn average_of(window: &[Solve], n: usize) -> Option<f64> {
    if n == 0 || window.len() < n {
        return None;
    }
    mean(&durations(&window[window.len() - n..]))
}

fn durations(solves: &[Solve]) -> Vec<f64> {
    solves.iter().map(|s| s.duration_ms as f64).collect()
}
