use serde::{Deserialize, Serialize};

use crate::config::StaircaseConfig;
use crate::numerics;

/// Bookkeeping for the staircase baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaircaseState {
    /// Design row issued by the most recent selection.
    pub idx_prev: usize,
    /// Most recent observed response; `None` before the first update.
    pub y_prev: Option<i64>,
}

impl StaircaseState {
    /// Starts at `idx_prev` with no response history.
    pub fn new(idx_prev: usize) -> Self {
        Self {
            idx_prev,
            y_prev: None,
        }
    }
}

/// Next design row for the staircase walking `axis` of a grid with `shape`.
///
/// Only the `axis` coordinate moves; the others stay where `idx_prev` put
/// them. Without a previous response the current row is repeated.
pub fn next_index(
    state: &StaircaseState,
    shape: &[usize],
    axis: usize,
    step: usize,
    config: &StaircaseConfig,
) -> usize {
    let Some(previous) = state.y_prev else {
        return state.idx_prev;
    };
    let mut positions = numerics::unravel(state.idx_prev, shape);
    let last = shape[axis].saturating_sub(1);
    let current = positions[axis];
    positions[axis] = if previous == config.correct_response {
        current.saturating_sub(config.down_multiplier.saturating_mul(step))
    } else {
        current
            .saturating_add(config.up_multiplier.saturating_mul(step))
            .min(last)
    };
    numerics::ravel(&positions, shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(start: usize, responses: &[i64], shape: &[usize], axis: usize) -> Vec<usize> {
        let config = StaircaseConfig::default();
        let mut state = StaircaseState::new(start);
        let mut visited = vec![next_index(&state, shape, axis, 1, &config)];
        for &response in responses {
            state.idx_prev = *visited.last().unwrap();
            state.y_prev = Some(response);
            visited.push(next_index(&state, shape, axis, 1, &config));
        }
        visited
    }

    #[test]
    fn one_down_two_up_on_a_line() {
        assert_eq!(walk(5, &[1, 1, 0, 1], &[11], 0), vec![5, 4, 3, 5, 4]);
    }

    #[test]
    fn clamps_at_both_ends() {
        assert_eq!(walk(0, &[1, 1], &[4], 0), vec![0, 0, 0]);
        assert_eq!(walk(2, &[0, 0], &[4], 0), vec![2, 3, 3]);
    }

    #[test]
    fn moves_only_the_designated_axis() {
        // shape 3x4: row = 4 * a + b; start at (1, 2) = 6, walk axis 1.
        let path = walk(6, &[1, 0], &[3, 4], 1);
        assert_eq!(path, vec![6, 5, 7]);
        // walking axis 0 instead: (1,2) -> (0,2) -> (2,2)
        let path = walk(6, &[1, 0], &[3, 4], 0);
        assert_eq!(path, vec![6, 2, 10]);
    }
}
