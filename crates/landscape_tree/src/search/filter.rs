use super::SpeciesRegistry;
use landscape_types::{AnimalKey, AnimalSpeciesId, Gender, Instar, LifeStage};
use std::collections::{HashMap, HashSet};

/// Arguments for [`SearchFilter::add_search_params`].
///
/// A `None` level means every value enumerated at that level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub life_stages: Option<Vec<LifeStage>>,
    pub species: Option<Vec<AnimalSpeciesId>>,
    pub instars: Option<Vec<Instar>>,
    pub genders: Option<Vec<Gender>>,
}

impl SearchParams {
    /// Every category the registry knows about
    pub fn all() -> Self {
        Self::default()
    }

    pub fn life_stages(mut self, stages: impl IntoIterator<Item = LifeStage>) -> Self {
        self.life_stages = Some(stages.into_iter().collect());
        self
    }

    pub fn species(mut self, species: impl IntoIterator<Item = AnimalSpeciesId>) -> Self {
        self.species = Some(species.into_iter().collect());
        self
    }

    pub fn instars(mut self, instars: impl IntoIterator<Item = Instar>) -> Self {
        self.instars = Some(instars.into_iter().collect());
        self
    }

    pub fn genders(mut self, genders: impl IntoIterator<Item = Gender>) -> Self {
        self.genders = Some(genders.into_iter().collect());
        self
    }
}

type GenderSet = HashSet<Gender>;
type InstarLevel = HashMap<Instar, GenderSet>;
type SpeciesLevel = HashMap<AnimalSpeciesId, InstarLevel>;

/// Nested permission set over (life stage, species, instar, gender).
///
/// A new filter matches nothing. [`SearchFilter::add_search_params`] only ever
/// inserts, so the matched set grows monotonically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    stages: HashMap<LifeStage, SpeciesLevel>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter accepting every registered category
    pub fn everything(registry: &SpeciesRegistry) -> Self {
        let mut filter = Self::new();
        filter.add_search_params(&SearchParams::all(), registry);
        filter
    }

    /// Widens the filter by the cartesian product of the given levels.
    ///
    /// Omitted species expand to the registered species, omitted instars to each
    /// species' registered instars, omitted genders to each species' genders.
    /// Explicit instars outside a registered species' range are ignored.
    pub fn add_search_params(&mut self, params: &SearchParams, registry: &SpeciesRegistry) {
        let stages: Vec<LifeStage> = match &params.life_stages {
            Some(stages) => stages.clone(),
            None => LifeStage::ALL.to_vec(),
        };
        let species: Vec<AnimalSpeciesId> = match &params.species {
            Some(species) => species.clone(),
            None => registry.animal_species().collect(),
        };

        for stage in stages {
            for &species_id in &species {
                let instars: Vec<Instar> = match &params.instars {
                    Some(instars) => instars
                        .iter()
                        .copied()
                        .filter(|instar| registry.is_valid_instar(species_id, *instar))
                        .collect(),
                    None => registry.instars_of(species_id).collect(),
                };
                if instars.is_empty() {
                    continue;
                }
                let genders: Vec<Gender> = match &params.genders {
                    Some(genders) => genders.clone(),
                    None => registry.genders_of(species_id),
                };
                if genders.is_empty() {
                    continue;
                }

                let instar_level = self
                    .stages
                    .entry(stage)
                    .or_default()
                    .entry(species_id)
                    .or_default();
                for instar in instars {
                    instar_level
                        .entry(instar)
                        .or_default()
                        .extend(genders.iter().copied());
                }
            }
        }
    }

    /// Four nested membership tests, stopping at the first miss
    pub fn matches(
        &self,
        life_stage: LifeStage,
        species: AnimalSpeciesId,
        instar: Instar,
        gender: Gender,
    ) -> bool {
        self.stages
            .get(&life_stage)
            .and_then(|level| level.get(&species))
            .and_then(|level| level.get(&instar))
            .is_some_and(|genders| genders.contains(&gender))
    }

    pub fn matches_key(&self, key: &AnimalKey) -> bool {
        self.matches(key.life_stage, key.species, key.instar, key.gender)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of (life stage, species, instar, gender) combinations accepted
    pub fn len(&self) -> usize {
        self.stages
            .values()
            .flat_map(|species| species.values())
            .flat_map(|instars| instars.values())
            .map(HashSet::len)
            .sum()
    }

    /// Every accepted bucket key
    pub fn keys(&self) -> impl Iterator<Item = AnimalKey> + '_ {
        self.stages.iter().flat_map(|(&stage, species)| {
            species.iter().flat_map(move |(&species_id, instars)| {
                instars.iter().flat_map(move |(&instar, genders)| {
                    genders
                        .iter()
                        .map(move |&gender| AnimalKey::new(stage, species_id, instar, gender))
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        registry.register_animal(AnimalSpeciesId(1), "spider", 3, &[Gender::Male, Gender::Female]);
        registry.register_animal(AnimalSpeciesId(2), "mite", 2, &[Gender::Female]);
        registry
    }

    fn matched(filter: &SearchFilter) -> BTreeSet<AnimalKey> {
        filter.keys().collect()
    }

    #[test]
    fn test_default_filter_matches_nothing() {
        let filter = SearchFilter::new();
        assert!(filter.is_empty());
        assert!(!filter.matches(LifeStage::Active, AnimalSpeciesId(1), Instar(1), Gender::Male));
        assert_eq!(filter.len(), 0);
    }

    #[test]
    fn test_omitted_levels_expand_from_registry() {
        let registry = registry();
        let mut filter = SearchFilter::new();
        filter.add_search_params(&SearchParams::all().life_stages([LifeStage::Active]), &registry);

        // spider: 3 instars x 2 genders, mite: 2 instars x 1 gender
        assert_eq!(filter.len(), 8);
        assert!(filter.matches(LifeStage::Active, AnimalSpeciesId(2), Instar(2), Gender::Female));
        assert!(!filter.matches(LifeStage::Active, AnimalSpeciesId(2), Instar(2), Gender::Male));
        assert!(!filter.matches(LifeStage::Satiated, AnimalSpeciesId(1), Instar(1), Gender::Male));
    }

    #[test]
    fn test_explicit_instars_out_of_range_are_ignored() {
        let registry = registry();
        let mut filter = SearchFilter::new();
        let params = SearchParams::all()
            .life_stages([LifeStage::Active])
            .species([AnimalSpeciesId(2)])
            .instars([Instar(1), Instar(5)]);
        filter.add_search_params(&params, &registry);
        assert_eq!(filter.len(), 1);
        assert!(filter.matches(LifeStage::Active, AnimalSpeciesId(2), Instar(1), Gender::Female));
    }

    #[test]
    fn test_repeated_params_are_idempotent() {
        let registry = registry();
        let params = SearchParams::all()
            .life_stages([LifeStage::Active, LifeStage::Handling])
            .species([AnimalSpeciesId(1)]);
        let mut once = SearchFilter::new();
        once.add_search_params(&params, &registry);
        let mut twice = once.clone();
        twice.add_search_params(&params, &registry);
        assert_eq!(matched(&once), matched(&twice));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_superset_never_shrinks() {
        let registry = registry();
        let mut filter = SearchFilter::new();
        filter.add_search_params(
            &SearchParams::all()
                .life_stages([LifeStage::Active])
                .species([AnimalSpeciesId(1)])
                .genders([Gender::Male]),
            &registry,
        );
        let before = matched(&filter);
        filter.add_search_params(&SearchParams::all().species([AnimalSpeciesId(1)]), &registry);
        let after = matched(&filter);
        assert!(before.is_subset(&after));
        assert!(after.len() > before.len());
    }

    #[test]
    fn test_everything_covers_every_stage() {
        let filter = SearchFilter::everything(&registry());
        for stage in LifeStage::ALL {
            assert!(filter.matches(stage, AnimalSpeciesId(1), Instar(3), Gender::Female));
        }
    }
}
