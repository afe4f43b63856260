//! Per-tribe aggregate state: member counts and research progress.
//!
//! Member counts are maintained by the `TribeMember` component hooks, so
//! they only change at flush points.

use log::debug;
use shared::TechType;
use std::collections::{BTreeMap, BTreeSet};

pub type TribeId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct Research {
    pub tech: TechType,
    pub progress: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tribe {
    pub id: TribeId,
    pub member_count: u32,
    pub research: Option<Research>,
    pub unlocked: BTreeSet<TechType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchCompletion {
    pub tribe_id: TribeId,
    pub tech: TechType,
}

#[derive(Debug)]
pub struct Tribes {
    tribes: BTreeMap<TribeId, Tribe>,
    next_id: TribeId,
}

impl Default for Tribes {
    fn default() -> Self {
        Self::new()
    }
}

impl Tribes {
    pub fn new() -> Self {
        Self {
            tribes: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn create_tribe(&mut self) -> TribeId {
        let id = self.next_id;
        self.next_id += 1;
        self.tribes.insert(
            id,
            Tribe {
                id,
                ..Default::default()
            },
        );
        debug!("Created tribe {}", id);
        id
    }

    pub fn get(&self, id: TribeId) -> Option<&Tribe> {
        self.tribes.get(&id)
    }

    pub fn get_mut(&mut self, id: TribeId) -> Option<&mut Tribe> {
        self.tribes.get_mut(&id)
    }

    pub fn add_member(&mut self, id: TribeId) {
        if let Some(tribe) = self.tribes.get_mut(&id) {
            tribe.member_count += 1;
        }
    }

    /// Drops the tribe once its last member is gone.
    pub fn remove_member(&mut self, id: TribeId) {
        let Some(tribe) = self.tribes.get_mut(&id) else {
            return;
        };
        tribe.member_count = tribe.member_count.saturating_sub(1);
        if tribe.member_count == 0 {
            self.tribes.remove(&id);
            debug!("Tribe {} disbanded", id);
        }
    }

    /// Returns false if the tech is already unlocked or being researched.
    pub fn start_research(&mut self, id: TribeId, tech: TechType) -> bool {
        let Some(tribe) = self.tribes.get_mut(&id) else {
            return false;
        };
        if tribe.unlocked.contains(&tech) || tribe.research.is_some() {
            return false;
        }
        tribe.research = Some(Research { tech, progress: 0 });
        true
    }

    /// Advances every tribe's research by its member count.
    pub fn advance_research(&mut self) -> Vec<ResearchCompletion> {
        let mut completions = Vec::new();
        for tribe in self.tribes.values_mut() {
            let Some(research) = tribe.research.as_mut() else {
                continue;
            };
            research.progress += tribe.member_count;
            if research.progress >= research.tech.research_cost() {
                let tech = research.tech;
                tribe.unlocked.insert(tech);
                tribe.research = None;
                completions.push(ResearchCompletion {
                    tribe_id: tribe.id,
                    tech,
                });
            }
        }
        completions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tribe> {
        self.tribes.values()
    }

    pub fn len(&self) -> usize {
        self.tribes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tribes.is_empty()
    }

    pub fn clear(&mut self) {
        self.tribes.clear();
        self.next_id = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_advances_by_member_count() {
        let mut tribes = Tribes::new();
        let id = tribes.create_tribe();
        tribes.add_member(id);
        tribes.add_member(id);
        assert!(tribes.start_research(id, TechType::Woodworking));
        assert!(!tribes.start_research(id, TechType::Herding));

        let ticks = TechType::Woodworking.research_cost() / 2;
        for _ in 0..ticks - 1 {
            assert!(tribes.advance_research().is_empty());
        }
        let completions = tribes.advance_research();
        assert_eq!(
            completions,
            vec![ResearchCompletion {
                tribe_id: id,
                tech: TechType::Woodworking
            }]
        );
        assert!(tribes.get(id).unwrap().unlocked.contains(&TechType::Woodworking));
        assert!(!tribes.start_research(id, TechType::Woodworking));
    }

    #[test]
    fn test_empty_tribe_is_disbanded() {
        let mut tribes = Tribes::new();
        let id = tribes.create_tribe();
        tribes.add_member(id);
        tribes.remove_member(id);
        assert!(tribes.get(id).is_none());
        assert!(tribes.is_empty());
    }
}
