//! Dense per-type component storage.
//!
//! Each component type lives in its own [`ComponentArray`]: a packed `Vec` of
//! values, a parallel `Vec` of owning entity ids, and an id -> slot index.
//! New components are staged and only become visible when the join buffer is
//! pushed; removal swaps the last slot into the hole.

use crate::world::tribes::Tribes;
use crate::world::EntityId;
use shared::{ComponentPayload, ComponentType};
use std::collections::HashMap;

/// World state lifecycle hooks may touch.
pub struct HookContext<'a> {
    pub tribes: &'a mut Tribes,
}

/// Callbacks registered per component type.
pub struct ComponentHooks<T> {
    pub on_join: Option<fn(&mut HookContext<'_>, EntityId, &mut T)>,
    pub on_remove: Option<fn(&mut HookContext<'_>, EntityId, &T)>,
    pub serialize: Option<fn(&T) -> ComponentPayload>,
}

impl<T> ComponentHooks<T> {
    pub const fn none() -> Self {
        Self {
            on_join: None,
            on_remove: None,
            serialize: None,
        }
    }
}

pub struct ComponentArray<T> {
    component_type: ComponentType,
    values: Vec<T>,
    owners: Vec<EntityId>,
    index: HashMap<EntityId, usize>,
    staged: Vec<(EntityId, T)>,
    hooks: ComponentHooks<T>,
}

impl<T> ComponentArray<T> {
    pub fn new(component_type: ComponentType, hooks: ComponentHooks<T>) -> Self {
        Self {
            component_type,
            values: Vec::new(),
            owners: Vec::new(),
            index: HashMap::new(),
            staged: Vec::new(),
            hooks,
        }
    }

    /// Stages a component for `entity_id`. It joins the array on the next
    /// [`push_join_buffer`](Self::push_join_buffer).
    ///
    /// # Panics
    ///
    /// If the entity already has, or has staged, a component of this type.
    pub fn add_component(&mut self, entity_id: EntityId, value: T) {
        if self.index.contains_key(&entity_id) || self.staged.iter().any(|(id, _)| *id == entity_id) {
            panic!(
                "entity {} already has a {:?} component",
                entity_id, self.component_type
            );
        }
        self.staged.push((entity_id, value));
    }

    /// Moves every staged component into the dense array, running `on_join`.
    pub fn push_join_buffer(&mut self, ctx: &mut HookContext<'_>) {
        for (entity_id, mut value) in std::mem::take(&mut self.staged) {
            if let Some(on_join) = self.hooks.on_join {
                on_join(ctx, entity_id, &mut value);
            }
            self.index.insert(entity_id, self.values.len());
            self.values.push(value);
            self.owners.push(entity_id);
        }
    }

    /// # Panics
    ///
    /// If the entity has no active component of this type.
    pub fn get_component(&self, entity_id: EntityId) -> &T {
        match self.index.get(&entity_id) {
            Some(&slot) => &self.values[slot],
            None => panic!(
                "entity {} has no {:?} component",
                entity_id, self.component_type
            ),
        }
    }

    /// # Panics
    ///
    /// If the entity has no active component of this type.
    pub fn get_component_mut(&mut self, entity_id: EntityId) -> &mut T {
        match self.index.get(&entity_id) {
            Some(&slot) => &mut self.values[slot],
            None => panic!(
                "entity {} has no {:?} component",
                entity_id, self.component_type
            ),
        }
    }

    /// The one lookup allowed to answer "no". Staged components do not count.
    pub fn has_component(&self, entity_id: EntityId) -> bool {
        self.index.contains_key(&entity_id)
    }

    /// Runs `on_remove` and evicts the slot. Only called from the removal flush.
    pub fn remove_component(&mut self, entity_id: EntityId, ctx: &mut HookContext<'_>) {
        if let Some(pos) = self.staged.iter().position(|(id, _)| *id == entity_id) {
            self.staged.remove(pos);
            return;
        }
        let Some(slot) = self.index.remove(&entity_id) else {
            return;
        };
        if let Some(on_remove) = self.hooks.on_remove {
            on_remove(ctx, entity_id, &self.values[slot]);
        }
        self.values.swap_remove(slot);
        self.owners.swap_remove(slot);
        if let Some(&moved) = self.owners.get(slot) {
            self.index.insert(moved, slot);
        }
    }

    pub fn serialize(&self, entity_id: EntityId) -> Option<ComponentPayload> {
        let serialize = self.hooks.serialize?;
        self.index
            .get(&entity_id)
            .map(|&slot| serialize(&self.values[slot]))
    }

    /// Active components with their owners, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.values.iter())
    }

    /// Owners of all active components, in slot order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.owners.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Drops everything without running hooks.
    pub fn clear(&mut self) {
        self.values.clear();
        self.owners.clear();
        self.index.clear();
        self.staged.clear();
    }
}

/// Type-erased view of a [`ComponentArray`], used where code walks an entity
/// type's component list without knowing the concrete types.
pub trait ComponentStore {
    fn component_type(&self) -> ComponentType;
    fn has_component(&self, entity_id: EntityId) -> bool;
    fn push_join_buffer(&mut self, ctx: &mut HookContext<'_>);
    fn remove_component(&mut self, entity_id: EntityId, ctx: &mut HookContext<'_>);
    fn serialize(&self, entity_id: EntityId) -> Option<ComponentPayload>;
    fn len(&self) -> usize;
    fn clear(&mut self);
}

impl<T> ComponentStore for ComponentArray<T> {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn has_component(&self, entity_id: EntityId) -> bool {
        ComponentArray::has_component(self, entity_id)
    }

    fn push_join_buffer(&mut self, ctx: &mut HookContext<'_>) {
        ComponentArray::push_join_buffer(self, ctx)
    }

    fn remove_component(&mut self, entity_id: EntityId, ctx: &mut HookContext<'_>) {
        ComponentArray::remove_component(self, entity_id, ctx)
    }

    fn serialize(&self, entity_id: EntityId) -> Option<ComponentPayload> {
        ComponentArray::serialize(self, entity_id)
    }

    fn len(&self) -> usize {
        ComponentArray::len(self)
    }

    fn clear(&mut self) {
        ComponentArray::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::payload::HealthPayload;

    #[derive(Debug, Clone, PartialEq)]
    struct Hp(f32);

    fn serialize_hp(hp: &Hp) -> ComponentPayload {
        ComponentPayload::Health(HealthPayload {
            health: hp.0,
            max_health: 10.0,
        })
    }

    fn count_join(ctx: &mut HookContext<'_>, _id: EntityId, _hp: &mut Hp) {
        ctx.tribes.create_tribe();
    }

    fn array() -> ComponentArray<Hp> {
        ComponentArray::new(
            ComponentType::Health,
            ComponentHooks {
                on_join: Some(count_join),
                on_remove: None,
                serialize: Some(serialize_hp),
            },
        )
    }

    #[test]
    fn test_staged_component_is_invisible_until_join() {
        let mut tribes = Tribes::new();
        let mut components = array();
        components.add_component(1, Hp(5.0));
        assert!(!components.has_component(1));
        assert_eq!(components.staged_len(), 1);

        components.push_join_buffer(&mut HookContext {
            tribes: &mut tribes,
        });
        assert!(components.has_component(1));
        assert_eq!(components.get_component(1), &Hp(5.0));
        assert_eq!(tribes.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already has")]
    fn test_duplicate_add_panics() {
        let mut components = array();
        components.add_component(1, Hp(5.0));
        components.add_component(1, Hp(6.0));
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_missing_lookup_panics() {
        let components = array();
        components.get_component(3);
    }

    #[test]
    fn test_swap_remove_keeps_index_consistent() {
        let mut tribes = Tribes::new();
        let mut ctx = HookContext {
            tribes: &mut tribes,
        };
        let mut components = array();
        for id in 1..=3 {
            components.add_component(id, Hp(id as f32));
        }
        components.push_join_buffer(&mut ctx);

        components.remove_component(1, &mut ctx);
        assert!(!components.has_component(1));
        assert_eq!(components.get_component(3), &Hp(3.0));
        assert_eq!(components.get_component(2), &Hp(2.0));
        assert_eq!(components.len(), 2);

        components.get_component_mut(3).0 = 9.0;
        assert_eq!(
            components.serialize(3),
            Some(ComponentPayload::Health(HealthPayload {
                health: 9.0,
                max_health: 10.0
            }))
        );
    }

    #[test]
    fn test_type_erased_store() {
        let mut tribes = Tribes::new();
        let mut components = array();
        let store: &mut dyn ComponentStore = &mut components;
        assert_eq!(store.component_type(), ComponentType::Health);
        store.push_join_buffer(&mut HookContext {
            tribes: &mut tribes,
        });
        assert_eq!(store.len(), 0);
        assert_eq!(store.serialize(1), None);
    }
}
