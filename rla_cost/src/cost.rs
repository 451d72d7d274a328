use crate::config::*;

/// Number of ballots to audit for a given margin: `ceil(K / margin) + 1`.
///
/// A margin of zero (or any margin that is not a positive number) cannot be
/// confirmed by sampling and requires a full hand count.
pub fn sample_size(margin: f64, risk_limit_constant: f64) -> AuditSampleSize {
    if !(margin.is_finite() && margin > 0.0) {
        return AuditSampleSize::FullHandCount;
    }
    // Saturates for vanishing margins.
    let n = (risk_limit_constant / margin).ceil() as u64;
    AuditSampleSize::Ballots(n.saturating_add(1))
}

impl CostModel {
    pub fn validate(&self) -> Result<(), AuditErrors> {
        let fields = [
            ("riskLimitConstant", self.risk_limit_constant),
            ("perBallotMinutes", self.per_ballot_minutes),
            ("perMinuteWage", self.per_minute_wage),
            ("clerkHourlyWage", self.clerk_hourly_wage),
            ("prepHoursPerCounty", self.prep_hours_per_county),
            ("hoursToIndexPer500Ballots", self.hours_to_index_per_500_ballots),
            ("centralCost", self.central_cost),
        ];
        for (name, value) in fields.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(AuditErrors::InvalidCostModel(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.risk_limit_constant == 0.0 {
            return Err(AuditErrors::InvalidCostModel(
                "riskLimitConstant must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sample_size(&self, margin: f64) -> AuditSampleSize {
        sample_size(margin, self.risk_limit_constant)
    }

    /// Labor cost of auditing the given number of ballots.
    pub fn procedural_cost(&self, ballots: u64) -> f64 {
        ballots as f64 * self.per_ballot_minutes * self.per_minute_wage
    }

    /// Per-county overhead plus the indexing volume term.
    ///
    /// An unknown number of ballots cast contributes nothing to the volume term.
    pub fn preparation_cost(&self, counties: u32, total_ballots_cast: Option<u64>) -> f64 {
        let overhead = self.prep_hours_per_county * self.clerk_hourly_wage * counties as f64;
        let volume = total_ballots_cast
            .map(|b| (b as f64 / 500.0) * self.hours_to_index_per_500_ballots)
            .unwrap_or(0.0);
        overhead + volume
    }

    pub fn central_cost(&self) -> f64 {
        self.central_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_size_five_percent() {
        assert_eq!(sample_size(0.05, 7.0), AuditSampleSize::Ballots(141));
        let m = CostModel::DEFAULT;
        assert!((m.procedural_cost(141) - 98.70).abs() < 1e-9);
    }

    #[test]
    fn sample_size_matches_formula() {
        for i in 1..=1000 {
            let margin = i as f64 / 1000.0;
            let expected = (7.0 / margin).ceil() as u64 + 1;
            assert_eq!(sample_size(margin, 7.0), AuditSampleSize::Ballots(expected));
        }
        assert_eq!(sample_size(1.0, 7.0), AuditSampleSize::Ballots(8));
    }

    #[test]
    fn sample_size_is_non_increasing() {
        let mut prev = u64::MAX;
        for i in 1..=10_000 {
            let margin = i as f64 / 10_000.0;
            match sample_size(margin, 7.0) {
                AuditSampleSize::Ballots(n) => {
                    assert!(n >= 1);
                    assert!(n <= prev, "margin {}: {} > {}", margin, n, prev);
                    prev = n;
                }
                AuditSampleSize::FullHandCount => panic!("margin {}", margin),
            }
        }
    }

    #[test]
    fn zero_margin_is_full_hand_count() {
        assert_eq!(sample_size(0.0, 7.0), AuditSampleSize::FullHandCount);
        assert_eq!(sample_size(-0.0, 7.0), AuditSampleSize::FullHandCount);
        assert_eq!(sample_size(f64::NAN, 7.0), AuditSampleSize::FullHandCount);
        assert_eq!(AuditSampleSize::FullHandCount.resolve(Some(1234)), Some(1234));
        assert_eq!(AuditSampleSize::FullHandCount.resolve(None), None);
        assert_eq!(AuditSampleSize::Ballots(3).resolve(None), Some(3));
    }

    #[test]
    fn tiny_margin_saturates() {
        assert_eq!(
            sample_size(f64::MIN_POSITIVE, 7.0),
            AuditSampleSize::Ballots(u64::MAX)
        );
    }

    #[test]
    fn preparation_cost_formula() {
        let m = CostModel::DEFAULT;
        // 8 * 21.23 * 3 + (100000 / 500) * 2
        let expected = 8.0 * 21.23 * 3.0 + 200.0 * 2.0;
        assert!((m.preparation_cost(3, Some(100_000)) - expected).abs() < 1e-9);
        assert!((m.preparation_cost(3, None) - 8.0 * 21.23 * 3.0).abs() < 1e-9);
        assert_eq!(m.central_cost(), 33580.0);
    }

    #[test]
    fn validate_rejects_bad_constants() {
        assert!(CostModel::DEFAULT.validate().is_ok());
        let mut m = CostModel::DEFAULT;
        m.per_minute_wage = -1.0;
        assert!(m.validate().is_err());
        let mut m = CostModel::DEFAULT;
        m.risk_limit_constant = 0.0;
        assert!(m.validate().is_err());
    }
}
