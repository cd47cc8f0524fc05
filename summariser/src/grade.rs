use load_audit_summary_model::Grade;

struct GradeBand {
    grade: Grade,
    /// Average response time must be strictly below this, in milliseconds
    below_avg_response_ms: f64,
    /// Success rate must be strictly above this, in percent
    above_success_rate: f64,
}

/// Ordered strictest first. Anything that matches no band is graded [Grade::C].
const GRADE_TABLE: [GradeBand; 4] = [
    GradeBand {
        grade: Grade::APlus,
        below_avg_response_ms: 1000.0,
        above_success_rate: 99.0,
    },
    GradeBand {
        grade: Grade::A,
        below_avg_response_ms: 2000.0,
        above_success_rate: 98.0,
    },
    GradeBand {
        grade: Grade::BPlus,
        below_avg_response_ms: 3000.0,
        above_success_rate: 95.0,
    },
    GradeBand {
        grade: Grade::B,
        below_avg_response_ms: 5000.0,
        above_success_rate: 90.0,
    },
];

/// Grade load test performance. The first band whose bounds are both met wins.
pub fn grade(avg_response_time: f64, success_rate: f64) -> Grade {
    GRADE_TABLE
        .iter()
        .find(|band| {
            avg_response_time < band.below_avg_response_ms
                && success_rate > band.above_success_rate
        })
        .map(|band| band.grade)
        .unwrap_or(Grade::C)
}

pub fn response_time_band_score(avg_response_time: f64) -> f64 {
    if avg_response_time < 1000.0 {
        100.0
    } else if avg_response_time < 3000.0 {
        70.0
    } else if avg_response_time < 5000.0 {
        50.0
    } else {
        30.0
    }
}

pub fn success_rate_band_score(success_rate: f64) -> f64 {
    if success_rate > 99.0 {
        100.0
    } else if success_rate > 95.0 {
        85.0
    } else if success_rate > 90.0 {
        60.0
    } else {
        30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_follow_the_table() {
        assert_eq!(Grade::APlus, grade(900.0, 99.5));
        assert_eq!(Grade::A, grade(1500.0, 99.5));
        assert_eq!(Grade::BPlus, grade(2500.0, 96.0));
        assert_eq!(Grade::B, grade(4000.0, 91.0));
        assert_eq!(Grade::C, grade(9000.0, 80.0));
    }

    #[test]
    fn both_bounds_must_hold() {
        // Fast but unreliable
        assert_eq!(Grade::C, grade(100.0, 85.0));
        // Reliable but slow
        assert_eq!(Grade::C, grade(6000.0, 100.0));
        // Bounds are strict
        assert_eq!(Grade::A, grade(1000.0, 99.5));
        assert_eq!(Grade::A, grade(900.0, 99.0));
    }

    #[test]
    fn band_scores() {
        assert_eq!(100.0, response_time_band_score(999.0));
        assert_eq!(70.0, response_time_band_score(1000.0));
        assert_eq!(50.0, response_time_band_score(4999.0));
        assert_eq!(30.0, response_time_band_score(5000.0));

        assert_eq!(100.0, success_rate_band_score(99.5));
        assert_eq!(85.0, success_rate_band_score(99.0));
        assert_eq!(60.0, success_rate_band_score(92.0));
        assert_eq!(30.0, success_rate_band_score(90.0));
    }
}
