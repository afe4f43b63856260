//! Component type tags and the fixed-shape wire payloads of serializable
//! components. Every payload field is 4 bytes wide.

use crate::codec::{CodecError, PacketReader, PacketWriter};
use serde::{Deserialize, Serialize};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    Health = 1,
    Inventory = 2,
    PlayerLink = 3,
    TribeMember = 4,
    Limbs = 5,
    Wander = 6,
    Item = 7,
    Resource = 8,
}

impl ComponentType {
    pub const ALL: [ComponentType; 8] = [
        ComponentType::Health,
        ComponentType::Inventory,
        ComponentType::PlayerLink,
        ComponentType::TribeMember,
        ComponentType::Limbs,
        ComponentType::Wander,
        ComponentType::Item,
        ComponentType::Resource,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::InvalidValue {
                field: "component type",
                value: tag,
            })
    }

    /// Wire size of the component's payload, or `None` for components that
    /// are never serialized into entity records.
    pub fn payload_size(self) -> Option<usize> {
        match self {
            ComponentType::Health => Some(8),
            ComponentType::PlayerLink => Some(4),
            ComponentType::TribeMember => Some(4),
            ComponentType::Limbs => Some(24),
            ComponentType::Item => Some(8),
            ComponentType::Resource => Some(8),
            ComponentType::Inventory | ComponentType::Wander => None,
        }
    }
}

/// Set of component types a decoder wants materialized. Payloads of the
/// other types are skipped with `pad_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentMask(u32);

impl ComponentMask {
    pub const ALL: ComponentMask = ComponentMask(u32::MAX);
    pub const NONE: ComponentMask = ComponentMask(0);

    pub fn with(self, component_type: ComponentType) -> Self {
        Self(self.0 | (1 << component_type.tag()))
    }

    pub fn contains(self, component_type: ComponentType) -> bool {
        self.0 & (1 << component_type.tag()) != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthPayload {
    pub health: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerLinkPayload {
    pub session_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TribeMemberPayload {
    pub tribe_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LimbsPayload {
    pub main_action: u32,
    pub main_state: u32,
    pub main_progress: f32,
    pub offhand_action: u32,
    pub offhand_state: u32,
    pub offhand_progress: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemPayload {
    pub item_type: u32,
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourcePayload {
    pub item_type: u32,
    pub remaining: u32,
}

/// One serialized component inside an entity record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentPayload {
    Health(HealthPayload),
    PlayerLink(PlayerLinkPayload),
    TribeMember(TribeMemberPayload),
    Limbs(LimbsPayload),
    Item(ItemPayload),
    Resource(ResourcePayload),
}

impl ComponentPayload {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentPayload::Health(_) => ComponentType::Health,
            ComponentPayload::PlayerLink(_) => ComponentType::PlayerLink,
            ComponentPayload::TribeMember(_) => ComponentType::TribeMember,
            ComponentPayload::Limbs(_) => ComponentType::Limbs,
            ComponentPayload::Item(_) => ComponentType::Item,
            ComponentPayload::Resource(_) => ComponentType::Resource,
        }
    }

    /// Size on the wire, including the leading component type tag.
    pub fn encoded_len(&self) -> usize {
        4 + self.component_type().payload_size().unwrap_or(0)
    }

    pub fn write_to(&self, writer: &mut PacketWriter) -> Result<(), CodecError> {
        writer.write_u32(self.component_type().tag());
        match self {
            ComponentPayload::Health(p) => writer.write_payload(p),
            ComponentPayload::PlayerLink(p) => writer.write_payload(p),
            ComponentPayload::TribeMember(p) => writer.write_payload(p),
            ComponentPayload::Limbs(p) => writer.write_payload(p),
            ComponentPayload::Item(p) => writer.write_payload(p),
            ComponentPayload::Resource(p) => writer.write_payload(p),
        }
    }

    /// Reads one tagged payload. Returns `Ok(None)` when the type is not in
    /// `mask`; the payload bytes are skipped in that case.
    pub fn read_from(
        reader: &mut PacketReader<'_>,
        mask: ComponentMask,
    ) -> Result<Option<Self>, CodecError> {
        let tag = reader.read_u32()?;
        let component_type = ComponentType::from_tag(tag)?;
        let size = component_type
            .payload_size()
            .ok_or(CodecError::InvalidValue {
                field: "serialized component type",
                value: tag,
            })?;

        if !mask.contains(component_type) {
            reader.pad_offset(size)?;
            return Ok(None);
        }

        let payload = match component_type {
            ComponentType::Health => ComponentPayload::Health(reader.read_payload()?),
            ComponentType::PlayerLink => ComponentPayload::PlayerLink(reader.read_payload()?),
            ComponentType::TribeMember => ComponentPayload::TribeMember(reader.read_payload()?),
            ComponentType::Limbs => ComponentPayload::Limbs(reader.read_payload()?),
            ComponentType::Item => ComponentPayload::Item(reader.read_payload()?),
            ComponentType::Resource => ComponentPayload::Resource(reader.read_payload()?),
            ComponentType::Inventory | ComponentType::Wander => unreachable!(),
        };
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::payload_size;

    #[test]
    fn test_declared_sizes_match_encoding() {
        assert_eq!(
            payload_size(&HealthPayload::default()).ok(),
            ComponentType::Health.payload_size()
        );
        assert_eq!(
            payload_size(&PlayerLinkPayload::default()).ok(),
            ComponentType::PlayerLink.payload_size()
        );
        assert_eq!(
            payload_size(&TribeMemberPayload::default()).ok(),
            ComponentType::TribeMember.payload_size()
        );
        assert_eq!(
            payload_size(&LimbsPayload::default()).ok(),
            ComponentType::Limbs.payload_size()
        );
        assert_eq!(
            payload_size(&ItemPayload::default()).ok(),
            ComponentType::Item.payload_size()
        );
        assert_eq!(
            payload_size(&ResourcePayload::default()).ok(),
            ComponentType::Resource.payload_size()
        );
    }

    #[test]
    fn test_masked_components_are_skipped() {
        let mut writer = PacketWriter::new(1);
        ComponentPayload::Limbs(LimbsPayload {
            main_action: 1,
            main_state: 2,
            main_progress: 0.5,
            ..Default::default()
        })
        .write_to(&mut writer)
        .unwrap();
        ComponentPayload::Health(HealthPayload {
            health: 12.0,
            max_health: 20.0,
        })
        .write_to(&mut writer)
        .unwrap();
        let packet = writer.finish();

        let mask = ComponentMask::NONE.with(ComponentType::Health);
        let mut reader = packet.reader();
        assert_eq!(ComponentPayload::read_from(&mut reader, mask).unwrap(), None);
        let health = ComponentPayload::read_from(&mut reader, mask).unwrap();
        assert_eq!(
            health,
            Some(ComponentPayload::Health(HealthPayload {
                health: 12.0,
                max_health: 20.0
            }))
        );
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_unserializable_component_tag_is_rejected() {
        let mut writer = PacketWriter::new(1);
        writer.write_u32(ComponentType::Inventory.tag());
        let packet = writer.finish();

        let mut reader = packet.reader();
        assert!(ComponentPayload::read_from(&mut reader, ComponentMask::ALL).is_err());
    }
}
