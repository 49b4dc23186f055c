use serde::Serialize;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTag {
    Food,
}

/// A tagged, non-negative amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resource {
    tag: ResourceTag,
    amount: f32,
}

impl Resource {
    pub fn new(tag: ResourceTag, amount: f32) -> Result<Self> {
        if amount < 0.0 || amount.is_nan() {
            return Err(CoreError::NegativeAmount(amount));
        }
        Ok(Self { tag, amount })
    }

    pub fn food(amount: f32) -> Result<Self> {
        Self::new(ResourceTag::Food, amount)
    }

    pub fn empty(tag: ResourceTag) -> Self {
        Self { tag, amount: 0.0 }
    }

    pub fn tag(&self) -> ResourceTag {
        self.tag
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn is_empty(&self) -> bool {
        self.amount <= 0.0
    }

    /// Removes up to `amount`, returning what was actually taken.
    pub fn withdraw(&mut self, amount: f32) -> Result<f32> {
        if amount < 0.0 || amount.is_nan() {
            return Err(CoreError::NegativeAmount(amount));
        }
        let taken = amount.min(self.amount);
        self.amount -= taken;
        Ok(taken)
    }
}

/// Moves `min(source.amount, amount)` from `source` into `target`.
///
/// The transaction never overdraws the source, so the sum of both amounts is
/// preserved and the source stays non-negative.
pub fn transfer(source: &mut Resource, target: &mut Resource, amount: f32) -> Result<f32> {
    let moved = source.withdraw(amount)?;
    target.amount += moved;
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn transfer_caps_at_source_amount() {
        let mut source = Resource::food(3.0).unwrap();
        let mut target = Resource::food(1.0).unwrap();
        let moved = transfer(&mut source, &mut target, 10.0).unwrap();
        assert_eq!(moved, 3.0);
        assert_eq!(source.amount(), 0.0);
        assert_eq!(target.amount(), 4.0);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert_eq!(Resource::food(-1.0), Err(CoreError::NegativeAmount(-1.0)));
        let mut source = Resource::food(3.0).unwrap();
        let mut target = Resource::empty(ResourceTag::Food);
        assert!(transfer(&mut source, &mut target, -2.0).is_err());
        assert_eq!(source.amount(), 3.0);
        assert_eq!(target.amount(), 0.0);
    }

    #[test]
    fn transfer_conserves_total_amount() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            // Integral amounts keep the float sums exact.
            let before_source = rng.gen_range(0..100) as f32;
            let before_target = rng.gen_range(0..100) as f32;
            let requested = rng.gen_range(0..150) as f32;
            let mut source = Resource::food(before_source).unwrap();
            let mut target = Resource::food(before_target).unwrap();

            transfer(&mut source, &mut target, requested).unwrap();

            assert_eq!(
                source.amount() + target.amount(),
                before_source + before_target
            );
            assert!(source.amount() >= 0.0);
        }
    }
}
