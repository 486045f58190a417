//! Completion percentage formulas.
//!
//! Two formulas are in play and must not be merged: application cards weight
//! essays against recommendations 60/40, while the deadline board reports a
//! flat done/total ratio across both task kinds. Call sites pick one
//! explicitly.

/// 60/40 essay/recommendation weighting used on application cards. A term
/// with a zero denominator contributes nothing.
pub fn weighted_completion(
    essays_completed: i32,
    essays_required: i32,
    recs_submitted: i32,
    recs_required: i32,
) -> i32 {
    let essay_term = if essays_required > 0 {
        60.0 * essays_completed as f64 / essays_required as f64
    } else {
        0.0
    };
    let rec_term = if recs_required > 0 {
        40.0 * recs_submitted as f64 / recs_required as f64
    } else {
        0.0
    };
    (essay_term + rec_term).round() as i32
}

/// Flat done/total percentage used on the deadline board.
pub fn combined_progress(done: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_completion_splits_sixty_forty() {
        assert_eq!(weighted_completion(2, 4, 1, 2), 50);
        assert_eq!(weighted_completion(4, 4, 2, 2), 100);
        assert_eq!(weighted_completion(0, 4, 0, 2), 0);
    }

    #[test]
    fn weighted_completion_drops_zero_denominator_terms() {
        assert_eq!(weighted_completion(3, 0, 2, 2), 40);
        assert_eq!(weighted_completion(2, 4, 1, 0), 30);
        assert_eq!(weighted_completion(0, 0, 0, 0), 0);
    }

    #[test]
    fn weighted_completion_rounds_to_nearest() {
        // 60 * 1/3 = 20, 40 * 1/3 = 13.33 -> 33
        assert_eq!(weighted_completion(1, 3, 1, 3), 33);
        // 60 * 2/3 = 40, 40 * 1/2 = 20 -> 60
        assert_eq!(weighted_completion(2, 3, 1, 2), 60);
    }

    #[test]
    fn combined_progress_counts_both_task_kinds() {
        assert_eq!(combined_progress(2, 4), 50);
        assert_eq!(combined_progress(1, 3), 33);
        assert_eq!(combined_progress(3, 3), 100);
    }

    #[test]
    fn combined_progress_is_zero_without_tasks() {
        assert_eq!(combined_progress(0, 0), 0);
    }
}
