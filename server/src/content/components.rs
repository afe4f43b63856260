//! Component value types, their lifecycle hooks and wire serializers.

use crate::world::component_array::{ComponentHooks, HookContext};
use crate::world::tribes::TribeId;
use crate::world::EntityId;
use shared::payload::{
    HealthPayload, ItemPayload, LimbsPayload, PlayerLinkPayload, ResourcePayload,
    TribeMemberPayload,
};
use shared::protocol::{InventoryState, ItemStack};
use shared::{ComponentPayload, ItemType, LimbAction, Point};

/// Ticks without damage before health starts regenerating.
pub const REGEN_DELAY_TICKS: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub health: f32,
    pub max_health: f32,
    pub regen_per_tick: f32,
    pub ticks_since_damage: u32,
}

impl Health {
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            regen_per_tick: max_health / 400.0,
            ticks_since_damage: 0,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    pub slots: Vec<Option<ItemStack>>,
    pub selected_slot: usize,
}

impl Inventory {
    pub const SLOT_COUNT: usize = 10;

    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
            selected_slot: 0,
        }
    }

    /// Adds as much as fits: existing stacks first, then empty slots.
    /// Returns the amount that did not fit.
    pub fn add_item(&mut self, item_type: ItemType, amount: u32) -> u32 {
        let stack_size = item_type.stack_size();
        let mut left = amount;

        for stack in self.slots.iter_mut().flatten() {
            if left == 0 {
                break;
            }
            if stack.item_type == item_type && stack.amount < stack_size {
                let moved = left.min(stack_size - stack.amount);
                stack.amount += moved;
                left -= moved;
            }
        }

        for slot in self.slots.iter_mut() {
            if left == 0 {
                break;
            }
            if slot.is_none() {
                let moved = left.min(stack_size);
                *slot = Some(ItemStack {
                    item_type,
                    amount: moved,
                });
                left -= moved;
            }
        }
        left
    }

    /// Takes `amount` from one slot. Returns false if the slot holds less.
    pub fn remove_from_slot(&mut self, slot: usize, amount: u32) -> bool {
        let Some(Some(stack)) = self.slots.get_mut(slot) else {
            return false;
        };
        if stack.amount < amount {
            return false;
        }
        stack.amount -= amount;
        if stack.amount == 0 {
            self.slots[slot] = None;
        }
        true
    }

    pub fn count(&self, item_type: ItemType) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.item_type == item_type)
            .map(|stack| stack.amount)
            .sum()
    }

    pub fn selected(&self) -> Option<ItemStack> {
        self.slots.get(self.selected_slot).copied().flatten()
    }

    pub fn select(&mut self, slot: usize) {
        if slot < self.slots.len() {
            self.selected_slot = slot;
        }
    }

    /// Empties every slot, returning what was held.
    pub fn drain(&mut self) -> Vec<ItemStack> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    pub fn to_state(&self) -> InventoryState {
        InventoryState {
            selected_slot: self.selected_slot as u32,
            slots: self.slots.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLink {
    pub session_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TribeMember {
    pub tribe_id: TribeId,
}

pub const WINDUP_TICKS: u32 = 3;
pub const RETURN_TICKS: u32 = 4;
pub const EAT_TICKS: u32 = 10;

/// Attack: `Idle -> Windup -> Swing -> Return -> Idle`.
/// Eat: `Idle -> Eating -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimbState {
    #[default]
    Idle,
    Windup {
        ticks_left: u32,
    },
    Swing,
    Return {
        ticks_left: u32,
    },
    Eating {
        ticks_left: u32,
    },
}

impl LimbState {
    fn wire_tag(self) -> u32 {
        match self {
            LimbState::Idle => 0,
            LimbState::Windup { .. } => 1,
            LimbState::Swing => 2,
            LimbState::Return { .. } => 3,
            LimbState::Eating { .. } => 4,
        }
    }

    /// Fraction of the current state already elapsed, for client animation.
    fn progress(self) -> f32 {
        match self {
            LimbState::Idle | LimbState::Swing => 0.0,
            LimbState::Windup { ticks_left } => 1.0 - ticks_left as f32 / WINDUP_TICKS as f32,
            LimbState::Return { ticks_left } => 1.0 - ticks_left as f32 / RETURN_TICKS as f32,
            LimbState::Eating { ticks_left } => 1.0 - ticks_left as f32 / EAT_TICKS as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Limb {
    /// Action the owner currently asks for.
    pub action: LimbAction,
    pub state: LimbState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limbs {
    pub main: Limb,
    pub offhand: Limb,
    pub reach: f32,
    pub hit_radius: f32,
    pub damage: f32,
}

impl Default for Limbs {
    fn default() -> Self {
        Self {
            main: Limb::default(),
            offhand: Limb::default(),
            reach: 48.0,
            hit_radius: 28.0,
            damage: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WanderState {
    Idle { ticks_left: u32 },
    Moving { target: Point, ticks_left: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wander {
    pub state: WanderState,
    pub radius: f32,
}

impl Default for Wander {
    fn default() -> Self {
        Self {
            state: WanderState::Idle { ticks_left: 20 },
            radius: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub item_type: ItemType,
    pub amount: u32,
}

/// Harvestable material handed to whoever hits the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub item_type: ItemType,
    pub remaining: u32,
    pub yield_per_hit: u32,
}

fn tribe_member_join(ctx: &mut HookContext<'_>, _entity_id: EntityId, member: &mut TribeMember) {
    ctx.tribes.add_member(member.tribe_id);
}

fn tribe_member_remove(ctx: &mut HookContext<'_>, _entity_id: EntityId, member: &TribeMember) {
    ctx.tribes.remove_member(member.tribe_id);
}

fn serialize_health(h: &Health) -> ComponentPayload {
    ComponentPayload::Health(HealthPayload {
        health: h.health,
        max_health: h.max_health,
    })
}

fn serialize_player_link(p: &PlayerLink) -> ComponentPayload {
    ComponentPayload::PlayerLink(PlayerLinkPayload {
        session_id: p.session_id,
    })
}

fn serialize_tribe_member(m: &TribeMember) -> ComponentPayload {
    ComponentPayload::TribeMember(TribeMemberPayload {
        tribe_id: m.tribe_id,
    })
}

fn serialize_limbs(l: &Limbs) -> ComponentPayload {
    ComponentPayload::Limbs(LimbsPayload {
        main_action: l.main.action.tag(),
        main_state: l.main.state.wire_tag(),
        main_progress: l.main.state.progress(),
        offhand_action: l.offhand.action.tag(),
        offhand_state: l.offhand.state.wire_tag(),
        offhand_progress: l.offhand.state.progress(),
    })
}

fn serialize_item(i: &Item) -> ComponentPayload {
    ComponentPayload::Item(ItemPayload {
        item_type: i.item_type.tag(),
        amount: i.amount,
    })
}

fn serialize_resource(r: &Resource) -> ComponentPayload {
    ComponentPayload::Resource(ResourcePayload {
        item_type: r.item_type.tag(),
        remaining: r.remaining,
    })
}

pub fn health_hooks() -> ComponentHooks<Health> {
    ComponentHooks {
        serialize: Some(serialize_health),
        ..ComponentHooks::none()
    }
}

pub fn inventory_hooks() -> ComponentHooks<Inventory> {
    ComponentHooks::none()
}

pub fn player_link_hooks() -> ComponentHooks<PlayerLink> {
    ComponentHooks {
        serialize: Some(serialize_player_link),
        ..ComponentHooks::none()
    }
}

pub fn tribe_member_hooks() -> ComponentHooks<TribeMember> {
    ComponentHooks {
        on_join: Some(tribe_member_join),
        on_remove: Some(tribe_member_remove),
        serialize: Some(serialize_tribe_member),
    }
}

pub fn limbs_hooks() -> ComponentHooks<Limbs> {
    ComponentHooks {
        serialize: Some(serialize_limbs),
        ..ComponentHooks::none()
    }
}

pub fn wander_hooks() -> ComponentHooks<Wander> {
    ComponentHooks::none()
}

pub fn item_hooks() -> ComponentHooks<Item> {
    ComponentHooks {
        serialize: Some(serialize_item),
        ..ComponentHooks::none()
    }
}

pub fn resource_hooks() -> ComponentHooks<Resource> {
    ComponentHooks {
        serialize: Some(serialize_resource),
        ..ComponentHooks::none()
    }
}
