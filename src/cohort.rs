/*!

The subpopulations a trial is split into. Every model draws its cohorts from [`Cohort`]; a
model decides which ones it populates, in which order they are considered when an event is
selected, and what per-capita multiplier each one carries.

Counts live in [`CohortCounts`], a fixed-size table indexed by cohort. Counts only ever go down.

*/

use crate::error::SimError;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Cohort {
    /// Unvaccinated individuals. Multiplier 1.
    Control,
    /// Vaccinees of the Leaky model. Multiplier `1 - eps`.
    Leaky,
    /// Fully immune All-or-Nothing vaccinees. Multiplier 0.
    Protected,
    /// Vaccinees the vaccine did nothing for. Multiplier 1.
    Unprotected,
    /// Partially protected vaccinees of the intermediate model. Multiplier `1 - mu`.
    MixedProtected,
}

impl Cohort {
    pub const COUNT: usize = 5;

    pub const ALL: [Cohort; Cohort::COUNT] = [
        Cohort::Control,
        Cohort::Leaky,
        Cohort::Protected,
        Cohort::Unprotected,
        Cohort::MixedProtected,
    ];

    #[inline(always)]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn is_vaccinated(self) -> bool {
        self != Cohort::Control
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct CohortCounts([u32; Cohort::COUNT]);

impl CohortCounts {
    #[must_use]
    pub fn new() -> Self {
        CohortCounts::default()
    }

    /// Builder-style setter used when deriving an initial split.
    #[must_use]
    pub fn with(mut self, cohort: Cohort, count: u32) -> Self {
        self.0[cohort.index()] = count;
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, cohort: Cohort) -> u32 {
        self.0[cohort.index()]
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&count| u64::from(count)).sum()
    }

    /// Removes one member of `cohort`.
    pub fn decrement(&mut self, cohort: Cohort) -> Result<(), SimError> {
        let count = &mut self.0[cohort.index()];
        *count = count
            .checked_sub(1)
            .ok_or(SimError::CohortUnderflow(cohort))?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cohort, u32)> + '_ {
        Cohort::ALL.iter().map(|&cohort| (cohort, self.get(cohort)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_control_is_unvaccinated() {
        for cohort in Cohort::ALL {
            assert_eq!(cohort.is_vaccinated(), cohort != Cohort::Control);
        }
    }

    #[test]
    fn indices_follow_declaration_order() {
        for (expected, cohort) in Cohort::ALL.iter().enumerate() {
            assert_eq!(cohort.index(), expected);
        }
    }

    #[test]
    fn decrement_stops_at_zero() {
        let mut counts = CohortCounts::new()
            .with(Cohort::Control, 1)
            .with(Cohort::Unprotected, 2);
        assert_eq!(counts.total(), 3);

        counts.decrement(Cohort::Control).unwrap();
        assert_eq!(counts.get(Cohort::Control), 0);
        assert!(matches!(
            counts.decrement(Cohort::Control),
            Err(SimError::CohortUnderflow(Cohort::Control))
        ));
        // A failed decrement leaves the table untouched.
        assert_eq!(counts.total(), 2);
    }
}
