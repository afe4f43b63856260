//! The set of component arrays owned by a world.

use crate::content::components::{
    health_hooks, inventory_hooks, item_hooks, limbs_hooks, player_link_hooks, resource_hooks,
    tribe_member_hooks, wander_hooks, Health, Inventory, Item, Limbs, PlayerLink, Resource,
    TribeMember, Wander,
};
use crate::world::component_array::{ComponentArray, ComponentStore, HookContext};
use shared::ComponentType;

pub struct Components {
    pub health: ComponentArray<Health>,
    pub inventory: ComponentArray<Inventory>,
    pub player_link: ComponentArray<PlayerLink>,
    pub tribe_member: ComponentArray<TribeMember>,
    pub limbs: ComponentArray<Limbs>,
    pub wander: ComponentArray<Wander>,
    pub item: ComponentArray<Item>,
    pub resource: ComponentArray<Resource>,
}

impl Default for Components {
    fn default() -> Self {
        Self::new()
    }
}

impl Components {
    pub fn new() -> Self {
        Self {
            health: ComponentArray::new(ComponentType::Health, health_hooks()),
            inventory: ComponentArray::new(ComponentType::Inventory, inventory_hooks()),
            player_link: ComponentArray::new(ComponentType::PlayerLink, player_link_hooks()),
            tribe_member: ComponentArray::new(ComponentType::TribeMember, tribe_member_hooks()),
            limbs: ComponentArray::new(ComponentType::Limbs, limbs_hooks()),
            wander: ComponentArray::new(ComponentType::Wander, wander_hooks()),
            item: ComponentArray::new(ComponentType::Item, item_hooks()),
            resource: ComponentArray::new(ComponentType::Resource, resource_hooks()),
        }
    }

    pub fn store(&self, component_type: ComponentType) -> &dyn ComponentStore {
        match component_type {
            ComponentType::Health => &self.health,
            ComponentType::Inventory => &self.inventory,
            ComponentType::PlayerLink => &self.player_link,
            ComponentType::TribeMember => &self.tribe_member,
            ComponentType::Limbs => &self.limbs,
            ComponentType::Wander => &self.wander,
            ComponentType::Item => &self.item,
            ComponentType::Resource => &self.resource,
        }
    }

    pub fn store_mut(&mut self, component_type: ComponentType) -> &mut dyn ComponentStore {
        match component_type {
            ComponentType::Health => &mut self.health,
            ComponentType::Inventory => &mut self.inventory,
            ComponentType::PlayerLink => &mut self.player_link,
            ComponentType::TribeMember => &mut self.tribe_member,
            ComponentType::Limbs => &mut self.limbs,
            ComponentType::Wander => &mut self.wander,
            ComponentType::Item => &mut self.item,
            ComponentType::Resource => &mut self.resource,
        }
    }

    pub fn push_join_buffer(&mut self, ctx: &mut HookContext<'_>) {
        for component_type in ComponentType::ALL {
            self.store_mut(component_type).push_join_buffer(ctx);
        }
    }

    /// Active components across every array.
    pub fn total_len(&self) -> usize {
        ComponentType::ALL
            .iter()
            .map(|&component_type| self.store(component_type).len())
            .sum()
    }

    pub fn clear(&mut self) {
        for component_type in ComponentType::ALL {
            self.store_mut(component_type).clear();
        }
    }
}
