use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::event::DogEvent;

pub const DOG_NAMES: &[&str] = &[
    "Nimeria", "Duke", "Rex", "Louie", "Bubba", "Daisy", "Harley", "Bailey",
];

pub const DOG_BREEDS: &[&str] = &[
    "Golden Retriever",
    "Labrador",
    "German Shepherd",
    "Poodle",
    "Bulldog",
    "Beagle",
];

pub const DOG_TOYS: &[&str] = &[
    "Tennis ball",
    "Rope",
    "Squeaky toy",
    "Frisbee",
    "Stick",
    "Stuffie",
];

pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 15;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator domain has no {0} to pick from")]
    EmptyDomain(&'static str),
    #[error("invalid age range {0}..={1}")]
    InvalidAgeRange(i64, i64),
}

/// The value sets events are drawn from.
#[derive(Debug, Clone)]
pub struct EventDomain {
    pub names: Vec<String>,
    pub breeds: Vec<String>,
    pub toys: Vec<String>,
    pub min_age: i64,
    pub max_age: i64,
}

impl Default for EventDomain {
    fn default() -> Self {
        let owned =
            |values: &[&str]| -> Vec<String> { values.iter().map(|v| v.to_string()).collect() };
        Self {
            names: owned(DOG_NAMES),
            breeds: owned(DOG_BREEDS),
            toys: owned(DOG_TOYS),
            min_age: MIN_AGE,
            max_age: MAX_AGE,
        }
    }
}

impl EventDomain {
    fn validate(&self) -> Result<(), GeneratorError> {
        if self.names.is_empty() {
            return Err(GeneratorError::EmptyDomain("names"));
        }
        if self.breeds.is_empty() {
            return Err(GeneratorError::EmptyDomain("breeds"));
        }
        if self.toys.is_empty() {
            return Err(GeneratorError::EmptyDomain("toys"));
        }
        if self.min_age > self.max_age {
            return Err(GeneratorError::InvalidAgeRange(self.min_age, self.max_age));
        }
        Ok(())
    }
}

/// Endless source of random [`DogEvent`]s. Every field is drawn
/// independently and uniformly from its value set.
pub struct DogEventGenerator<R = StdRng> {
    domain: EventDomain,
    rng: R,
}

impl DogEventGenerator<StdRng> {
    pub fn new() -> Self {
        Self {
            domain: EventDomain::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, for tests and fixtures.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            domain: EventDomain::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for DogEventGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DogEventGenerator<R> {
    pub fn with_domain(domain: EventDomain, rng: R) -> Result<Self, GeneratorError> {
        domain.validate()?;
        Ok(Self { domain, rng })
    }

    pub fn next_event(&mut self) -> DogEvent {
        // validate() guarantees every set is non-empty, so choose() never misses
        let pick = |values: &[String], rng: &mut R| {
            values.choose(rng).cloned().unwrap_or_default()
        };

        let event = DogEvent {
            name: pick(self.domain.names.as_slice(), &mut self.rng),
            breed: pick(self.domain.breeds.as_slice(), &mut self.rng),
            age: Some(self.rng.gen_range(self.domain.min_age..=self.domain.max_age)),
            favorite_toy: Some(pick(self.domain.toys.as_slice(), &mut self.rng)),
        };
        debug!(?event, "generated dog event");
        event
    }
}

impl<R: Rng> Iterator for DogEventGenerator<R> {
    type Item = DogEvent;

    fn next(&mut self) -> Option<DogEvent> {
        Some(self.next_event())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_field_comes_from_its_value_set() {
        for event in DogEventGenerator::with_seed(42).take(1_000) {
            assert!(DOG_NAMES.contains(&event.name.as_str()));
            assert!(DOG_BREEDS.contains(&event.breed.as_str()));
            let age = event.age.unwrap();
            assert!((MIN_AGE..=MAX_AGE).contains(&age));
            assert!(DOG_TOYS.contains(&event.favorite_toy.as_deref().unwrap()));
        }
    }

    #[test]
    fn eventually_covers_every_toy_and_age() {
        let events: Vec<DogEvent> = DogEventGenerator::with_seed(1).take(5_000).collect();

        let toys: HashSet<_> = events
            .iter()
            .filter_map(|e| e.favorite_toy.clone())
            .collect();
        assert_eq!(toys.len(), DOG_TOYS.len());

        let ages: HashSet<_> = events.iter().filter_map(|e| e.age).collect();
        assert_eq!(ages.len(), (MAX_AGE - MIN_AGE + 1) as usize);
    }

    #[test]
    fn same_seed_same_sequence() {
        let a: Vec<_> = DogEventGenerator::with_seed(9).take(50).collect();
        let b: Vec<_> = DogEventGenerator::with_seed(9).take(50).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_domains() {
        let domain = EventDomain {
            toys: vec![],
            ..EventDomain::default()
        };
        let result = DogEventGenerator::with_domain(domain, StdRng::seed_from_u64(0));
        assert_eq!(result.err(), Some(GeneratorError::EmptyDomain("toys")));

        let domain = EventDomain {
            min_age: 5,
            max_age: 2,
            ..EventDomain::default()
        };
        let result = DogEventGenerator::with_domain(domain, StdRng::seed_from_u64(0));
        assert_eq!(result.err(), Some(GeneratorError::InvalidAgeRange(5, 2)));
    }

    #[test]
    fn single_value_domain_is_constant() {
        let domain = EventDomain {
            names: vec!["Rex".to_string()],
            breeds: vec!["Beagle".to_string()],
            toys: vec!["Rope".to_string()],
            min_age: 3,
            max_age: 3,
        };
        let mut generator =
            DogEventGenerator::with_domain(domain, StdRng::seed_from_u64(0)).unwrap();
        for _ in 0..10 {
            assert_eq!(
                generator.next(),
                Some(DogEvent::new("Rex", "Beagle", 3, "Rope"))
            );
        }
    }
}
