use std::ops::Div;

quantity!(
    /// Amount of money in the configured currency.
    Cost, suffix: "", precision: 2
);

impl Cost {
    /// Round to the display precision.
    #[must_use]
    pub fn round_to_cents(self) -> Self {
        self.round_to(2)
    }
}

impl Div<u32> for Cost {
    type Output = Self;

    fn div(self, rhs: u32) -> Self::Output {
        Self(self.0 / f64::from(rhs))
    }
}
