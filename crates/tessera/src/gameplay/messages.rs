//! Messages exchanged by the sample components.

use tessera_core::{MessageType, MessageTypeId};

/// A projectile hit a ship.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Damage {
    /// Health to remove.
    pub amount: u32,
    /// Player whose projectile hit.
    pub from_player: u8,
}

impl MessageType for Damage {
    const ID: MessageTypeId = MessageTypeId(1_000);
}

/// A ship lost its last health point. Routed up to the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShipDestroyed {
    /// Player who lost the ship.
    pub player: u8,
    /// Player credited with the kill.
    pub by_player: u8,
}

impl MessageType for ShipDestroyed {
    const ID: MessageTypeId = MessageTypeId(1_001);
}
