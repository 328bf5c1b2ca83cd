/// Plain-vanilla option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OptionType {
    /// Call option payoff profile.
    Call,
    /// Put option payoff profile.
    Put,
}

impl OptionType {
    /// Returns +1.0 for calls and -1.0 for puts.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Self::Call => 1.0,
            Self::Put => -1.0,
        }
    }

    /// Intrinsic payoff at a given underlying level.
    #[inline]
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

/// Exercise rights for an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExerciseStyle {
    /// Exercise only at expiry.
    European,
    /// Exercise at any time up to expiry.
    American,
}

/// Barrier crossing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierDirection {
    /// Barrier is breached when spot moves upward through the level.
    Up,
    /// Barrier is breached when spot moves downward through the level.
    Down,
}

/// Barrier knock behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierStyle {
    /// Option activates once the barrier is hit.
    In,
    /// Option deactivates once the barrier is hit.
    Out,
}
