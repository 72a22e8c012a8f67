//! Tallies kills. Lives on the arena root and hears `ShipDestroyed` from
//! every ship below it.

use tessera_core::{Component, Message, WorldContext};

use super::messages::ShipDestroyed;

/// Kill counts per player and the order ships went down.
#[derive(Clone, Debug, Default)]
pub struct Scoreboard {
    kills: Vec<u32>,
    destroyed: Vec<u8>,
}

impl Scoreboard {
    /// Empty scoreboard for `players` players.
    #[must_use]
    pub fn new(players: u8) -> Self {
        Self {
            kills: vec![0; usize::from(players)],
            destroyed: Vec::new(),
        }
    }

    /// Kills credited to `player`.
    #[must_use]
    pub fn kills(&self, player: u8) -> u32 {
        self.kills.get(usize::from(player)).copied().unwrap_or(0)
    }

    /// Players whose ships were destroyed, in order.
    #[must_use]
    pub fn destroyed(&self) -> &[u8] {
        &self.destroyed
    }
}

impl Component for Scoreboard {
    fn on_message(&mut self, msg: &dyn Message, _ctx: &mut WorldContext<'_>) {
        let Some(event) = msg.downcast_ref::<ShipDestroyed>() else {
            return;
        };
        if let Some(kills) = self.kills.get_mut(usize::from(event.by_player)) {
            *kills += 1;
        }
        self.destroyed.push(event.player);
        tracing::info!(
            "Player {} destroyed player {}",
            event.by_player,
            event.player
        );
    }
}
