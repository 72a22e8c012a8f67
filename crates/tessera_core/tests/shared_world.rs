//! # Shared World Tests
//!
//! Several threads reading, one writer ticking, and message posting from
//! threads that never take a marker.
//!
//! Run with: cargo test --package tessera_core --test shared_world

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tessera_core::{
    Component, GameObjectDesc, Message, MessageType, MessageTypeId, MsgRouting, SharedWorld,
    World, WorldConfig, WorldContext,
};

#[derive(Debug, Clone)]
struct Hit {
    amount: u32,
}

impl MessageType for Hit {
    const ID: MessageTypeId = MessageTypeId(200);
}

struct Health {
    total_damage: Arc<AtomicUsize>,
}

impl Component for Health {
    fn on_message(&mut self, msg: &dyn Message, _ctx: &mut WorldContext<'_>) {
        if let Some(hit) = msg.downcast_ref::<Hit>() {
            self.total_damage
                .fetch_add(hit.amount as usize, Ordering::Relaxed);
        }
    }
}

#[test]
fn readers_and_posters_with_one_writer() {
    const POSTERS: usize = 4;
    const HITS_PER_POSTER: usize = 250;

    let total_damage = Arc::new(AtomicUsize::new(0));
    let shared = SharedWorld::new(World::default());
    let target = {
        let mut world = shared.write();
        let target = world.create_object(GameObjectDesc::new("target")).unwrap();
        let health = world
            .create_component(Health {
                total_damage: Arc::clone(&total_damage),
            })
            .unwrap();
        world.add_component(target, health).unwrap();
        for i in 0..16 {
            let desc = GameObjectDesc::new(format!("debris_{i}")).with_parent(target);
            world.create_object(desc).unwrap();
        }
        target
    };

    let posters: Vec<_> = (0..POSTERS)
        .map(|_| {
            let sender = shared.message_sender();
            thread::spawn(move || {
                for _ in 0..HITS_PER_POSTER {
                    assert!(sender.post(target, Hit { amount: 1 }, MsgRouting::DEFAULT));
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..POSTERS)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let world = shared.read();
                    assert_eq!(world.children(target).unwrap().count(), 16);
                }
            })
        })
        .collect();

    for _ in 0..10 {
        shared.write().tick(1.0 / 60.0);
    }
    for handle in posters.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    shared.write().tick(1.0 / 60.0);

    assert_eq!(total_damage.load(Ordering::Relaxed), POSTERS * HITS_PER_POSTER);
    assert_eq!(shared.active_readers(), 0);
    assert_eq!(shared.active_writers(), 0);
    assert!(shared.try_unwrap().is_ok());
}

#[test]
fn configured_world_enforces_object_limit() {
    let config = WorldConfig::from_toml_str(
        r#"
        initial_object_capacity = 4
        max_objects = 4
        queue_warning_threshold = 8
        "#,
    )
    .unwrap();
    let shared = SharedWorld::new(World::new(config).unwrap());

    let mut world = shared.write();
    for i in 0..4 {
        world
            .create_object(GameObjectDesc::new(format!("slot_{i}")))
            .unwrap();
    }
    let err = world.create_object(GameObjectDesc::new("overflow")).unwrap_err();
    assert!(matches!(
        err,
        tessera_core::WorldError::CapacityExceeded { capacity: 4, .. }
    ));
}
