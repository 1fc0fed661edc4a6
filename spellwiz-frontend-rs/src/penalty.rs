pub const PENALTY_STEP: f64 = 0.25;
pub const MAX_PENALTY: f64 = 0.5;

/// Failure bookkeeping for one word. The first failure is free; every later one costs
/// [`PENALTY_STEP`], up to [`MAX_PENALTY`].
#[derive(Copy, Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempts {
    pub count: u32,
    pub penalty: f64,
}

impl Attempts {
    #[must_use]
    pub fn on_failure(self) -> Self {
        let penalty = if self.count >= 1 {
            (self.penalty + PENALTY_STEP).min(MAX_PENALTY)
        } else {
            self.penalty
        };
        Self {
            count: self.count + 1,
            penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_sequence() {
        let mut attempts = Attempts::default();
        let mut penalties = Vec::new();
        for _ in 0..5 {
            attempts = attempts.on_failure();
            penalties.push(attempts.penalty);
        }
        assert_eq!(penalties, vec![0.0, 0.25, 0.5, 0.5, 0.5]);
        assert_eq!(attempts.count, 5);
    }
}
