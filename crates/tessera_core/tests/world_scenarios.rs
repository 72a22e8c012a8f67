//! # World Scenario Tests
//!
//! End-to-end checks of handles, ownership, hierarchy and message routing
//! through the public API only.
//!
//! Run with: cargo test --package tessera_core --test world_scenarios

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::{
    Component, ComponentContext, ComponentError, GameObjectDesc, GameObjectHandle,
    InvariantViolation, Message, MessageType, MessageTypeId, MsgRouting, Vec3, World,
    WorldConfig, WorldContext, WorldError,
};

// ============================================================================
// FIXTURES
// ============================================================================

#[derive(Debug, Clone)]
struct Ping;

impl MessageType for Ping {
    const ID: MessageTypeId = MessageTypeId(100);
}

#[derive(Debug, Clone)]
struct Echo {
    remaining: u32,
}

impl MessageType for Echo {
    const ID: MessageTypeId = MessageTypeId(101);
}

#[derive(Debug, Clone)]
struct SelfDestruct;

impl MessageType for SelfDestruct {
    const ID: MessageTypeId = MessageTypeId(102);
}

type Log = Arc<Mutex<Vec<(GameObjectHandle, MsgRouting)>>>;

/// Logs every `Ping` it sees, re-queues `Echo` to its owner, deletes its
/// owner on `SelfDestruct`.
struct Recorder {
    log: Log,
}

impl Component for Recorder {
    fn on_message(&mut self, msg: &dyn Message, ctx: &mut WorldContext<'_>) {
        if msg.is::<Ping>() {
            self.log.lock().push((ctx.owner(), ctx.routing()));
        } else if let Some(echo) = msg.downcast_ref::<Echo>() {
            self.log.lock().push((ctx.owner(), ctx.routing()));
            if echo.remaining > 0 {
                let next = Echo {
                    remaining: echo.remaining - 1,
                };
                ctx.send_message(ctx.owner(), next, MsgRouting::QUEUED);
            }
        } else if msg.is::<SelfDestruct>() {
            ctx.delete_object(ctx.owner());
        }
    }
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn owners(log: &Log) -> Vec<GameObjectHandle> {
    log.lock().iter().map(|(owner, _)| *owner).collect()
}

fn recorded(world: &mut World, log: &Log, parent: Option<GameObjectHandle>) -> GameObjectHandle {
    let mut desc = GameObjectDesc::new("recorded");
    desc.parent = parent;
    let object = world.create_object(desc).unwrap();
    let recorder = world
        .create_component(Recorder {
            log: Arc::clone(log),
        })
        .unwrap();
    world.add_component(object, recorder).unwrap();
    object
}

/// Needs a dynamic owner.
struct Thruster;

impl Component for Thruster {
    fn is_dynamic(&self) -> bool {
        true
    }
}

// ============================================================================
// HANDLES AND OWNERSHIP
// ============================================================================

#[test]
fn stale_handles_never_resolve_after_reuse() {
    let mut world = World::default();

    let old_object = world.create_object(GameObjectDesc::new("old")).unwrap();
    world.delete_object(old_object).unwrap();
    let new_object = world.create_object(GameObjectDesc::new("new")).unwrap();
    assert_eq!(old_object.index(), new_object.index());
    assert!(matches!(
        world.try_get_object(old_object),
        Err(WorldError::NotFound { .. })
    ));
    assert!(world.try_get_object(new_object).is_ok());

    let old_component = world.create_component(Thruster).unwrap();
    world.delete_component(old_component).unwrap();
    let new_component = world.create_component(Thruster).unwrap();
    assert_eq!(old_component.slot().index(), new_component.slot().index());
    assert!(world.try_get_component::<Thruster>(old_component).is_err());
    assert!(world.component_owner(old_component).is_err());
}

#[test]
fn add_and_remove_keep_ownership_consistent() {
    let mut world = World::default();
    let log = new_log();
    let object = world.create_object(GameObjectDesc::new("holder")).unwrap();
    let recorder = world.create_component(Recorder { log }).unwrap();

    world.add_component(object, recorder).unwrap();
    assert_eq!(world.component_owner(recorder).unwrap(), Some(object));
    let listed = world
        .try_get_object(object)
        .unwrap()
        .components()
        .iter()
        .filter(|&&c| c == recorder)
        .count();
    assert_eq!(listed, 1);

    world.remove_component(object, recorder).unwrap();
    assert_eq!(world.component_owner(recorder).unwrap(), None);
    assert!(!world.try_get_object(object).unwrap().has_component(recorder));
}

#[test]
fn dynamic_component_requires_promotion() {
    let mut world = World::default();
    let a = world.create_object(GameObjectDesc::new("A")).unwrap();
    let x = world.create_component(Thruster).unwrap();

    let err = world.add_component(a, x).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(InvariantViolation::DynamicComponentOnStaticObject)
    );
    assert!(world.try_get_object(a).unwrap().components().is_empty());
    assert_eq!(world.component_owner(x).unwrap(), None);

    world.make_dynamic(a).unwrap();
    world.add_component(a, x).unwrap();
    assert_eq!(world.component_owner(x).unwrap(), Some(a));
}

// ============================================================================
// HIERARCHY
// ============================================================================

#[test]
fn reparent_to_descendant_is_rejected() {
    let mut world = World::default();
    let root = world.create_object(GameObjectDesc::new("root")).unwrap();
    let child = world
        .create_object(GameObjectDesc::new("child").with_parent(root))
        .unwrap();
    let grandchild = world
        .create_object(GameObjectDesc::new("grandchild").with_parent(child))
        .unwrap();

    let err = world.set_parent(root, Some(grandchild)).unwrap_err();
    assert_eq!(err.violation(), Some(InvariantViolation::HierarchyCycle));
    assert_eq!(world.parent(root).unwrap(), None);
    assert_eq!(world.children(root).unwrap().collect::<Vec<_>>(), vec![child]);
}

#[test]
fn reparent_respects_max_depth() {
    let config = WorldConfig::from_toml_str("max_hierarchy_depth = 2").unwrap();
    let mut world = World::new(config).unwrap();
    let a = world.create_object(GameObjectDesc::new("a")).unwrap();
    let b = world.create_object(GameObjectDesc::new("b").with_parent(a)).unwrap();
    let c = world.create_object(GameObjectDesc::new("c")).unwrap();
    let d = world.create_object(GameObjectDesc::new("d").with_parent(c)).unwrap();

    // c would land on level 2, d on level 3.
    let err = world.set_parent(c, Some(b)).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(InvariantViolation::HierarchyTooDeep { depth: 3, max: 2 })
    );
    world.set_parent(d, Some(b)).unwrap();
    assert_eq!(world.try_get_object(d).unwrap().hierarchy_level(), 2);
}

#[test]
fn deleting_parent_cascades_to_children() {
    let mut world = World::default();
    let log = new_log();
    let p = recorded(&mut world, &log, None);
    let c1 = recorded(&mut world, &log, Some(p));
    let c2 = recorded(&mut world, &log, Some(p));
    let grandchild = recorded(&mut world, &log, Some(c2));
    let bystander = recorded(&mut world, &log, None);
    assert_eq!(world.component_count(), 5);

    world.delete_object(p).unwrap();

    for handle in [p, c1, c2, grandchild] {
        assert!(world.try_get_object(handle).unwrap_err().is_not_found());
    }
    assert!(world.is_alive(bystander));
    assert_eq!(world.object_count(), 1);
    assert_eq!(world.component_count(), 1);
}

// ============================================================================
// MESSAGE ROUTING
// ============================================================================

#[test]
fn to_children_reaches_each_child_once_in_order() {
    let mut world = World::default();
    let log = new_log();
    let parent = recorded(&mut world, &log, None);
    let children: Vec<_> = (0..3)
        .map(|_| recorded(&mut world, &log, Some(parent)))
        .collect();

    world.send_message(parent, Ping, MsgRouting::TO_CHILDREN).unwrap();

    let mut expected = vec![parent];
    expected.extend(&children);
    assert_eq!(owners(&log), expected);
}

#[test]
fn to_children_walks_whole_subtree_pre_order() {
    let mut world = World::default();
    let log = new_log();
    let root = recorded(&mut world, &log, None);
    let a = recorded(&mut world, &log, Some(root));
    let a1 = recorded(&mut world, &log, Some(a));
    let b = recorded(&mut world, &log, Some(root));

    world.send_message(root, Ping, MsgRouting::TO_CHILDREN).unwrap();
    assert_eq!(owners(&log), vec![root, a, a1, b]);
}

#[test]
fn parent_and_children_routing_reaches_every_object_once() {
    let mut world = World::default();
    let log = new_log();
    let root = recorded(&mut world, &log, None);
    let middle = recorded(&mut world, &log, Some(root));
    let sibling = recorded(&mut world, &log, Some(middle));
    let target = recorded(&mut world, &log, Some(middle));
    let child = recorded(&mut world, &log, Some(target));
    let grandchild = recorded(&mut world, &log, Some(child));

    world
        .send_message(target, Ping, MsgRouting::TO_PARENT | MsgRouting::TO_CHILDREN)
        .unwrap();

    // Ancestors do not fan out again, so the sibling stays out of scope.
    assert_eq!(owners(&log), vec![target, middle, root, child, grandchild]);
    assert!(!owners(&log).contains(&sibling));
}

#[test]
fn queued_message_waits_for_drain() {
    let mut world = World::default();
    let log = new_log();
    let target = recorded(&mut world, &log, None);
    let child = recorded(&mut world, &log, Some(target));

    world
        .queue_message(target, Ping, MsgRouting::TO_CHILDREN)
        .unwrap();
    assert_eq!(world.pending_message_count(), 1);
    assert!(log.lock().is_empty());

    let stats = world.tick(0.016);
    assert_eq!(stats.drain.delivered, 1);
    assert_eq!(stats.drain.recipients, 2);
    assert_eq!(
        *log.lock(),
        vec![
            (target, MsgRouting::TO_CHILDREN),
            (child, MsgRouting::TO_CHILDREN)
        ]
    );

    world.tick(0.016);
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn send_with_queued_flag_is_deferred() {
    let mut world = World::default();
    let log = new_log();
    let target = recorded(&mut world, &log, None);

    world.send_message(target, Ping, MsgRouting::QUEUED).unwrap();
    assert!(log.lock().is_empty());
    assert_eq!(world.drain_messages().delivered, 1);
    assert_eq!(owners(&log), vec![target]);
}

#[test]
fn messages_queued_during_drain_go_to_next_tick() {
    let mut world = World::default();
    let log = new_log();
    let target = recorded(&mut world, &log, None);

    world
        .queue_message(target, Echo { remaining: 2 }, MsgRouting::DEFAULT)
        .unwrap();

    let first = world.tick(0.016);
    assert_eq!(first.drain.delivered, 1);
    assert_eq!(first.drain.deferred, 1);
    assert_eq!(log.lock().len(), 1);

    let second = world.tick(0.016);
    assert_eq!(second.drain.delivered, 1);
    assert_eq!(log.lock().len(), 2);

    let third = world.tick(0.016);
    assert_eq!(third.drain.delivered, 1);
    assert_eq!(third.drain.deferred, 0);
    assert_eq!(world.pending_message_count(), 0);
}

#[test]
fn queued_message_to_deleted_target_is_dropped() {
    let mut world = World::default();
    let log = new_log();
    let target = recorded(&mut world, &log, None);

    world.queue_message(target, Ping, MsgRouting::DEFAULT).unwrap();
    world.delete_object(target).unwrap();

    let stats = world.tick(0.016);
    assert_eq!(stats.drain.dropped, 1);
    assert_eq!(stats.drain.delivered, 0);
    assert!(log.lock().is_empty());
}

#[test]
fn deletion_from_handler_is_deferred_until_dispatch_ends() {
    let mut world = World::default();
    let log = new_log();
    let parent = recorded(&mut world, &log, None);
    let child = recorded(&mut world, &log, Some(parent));

    world
        .send_message(parent, SelfDestruct, MsgRouting::DEFAULT)
        .unwrap();
    assert!(!world.is_alive(parent));
    assert!(!world.is_alive(child));

    let survivor = recorded(&mut world, &log, None);
    world.send_message(survivor, Ping, MsgRouting::DEFAULT).unwrap();
    assert_eq!(owners(&log), vec![survivor]);
}

// ============================================================================
// TICK
// ============================================================================

/// Moves its owner along +X and removes it after `lifetime` seconds.
struct Mover {
    speed: f32,
    lifetime: f32,
    position: Vec3,
}

impl Component for Mover {
    fn is_dynamic(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut WorldContext<'_>) {
        self.lifetime -= ctx.delta_seconds();
        if self.lifetime <= 0.0 {
            ctx.delete_object(ctx.owner());
            return;
        }
        self.position += Vec3::X * (self.speed * ctx.delta_seconds());
        ctx.set_local_position(ctx.owner(), self.position);
    }
}

#[test]
fn dynamic_components_update_and_move_their_owner() {
    let mut world = World::default();
    let bullet = world
        .create_object(GameObjectDesc::new("bullet").dynamic())
        .unwrap();
    let mover = world
        .create_component(Mover {
            speed: 10.0,
            lifetime: 0.35,
            position: Vec3::ZERO,
        })
        .unwrap();
    world.add_component(bullet, mover).unwrap();

    let stats = world.tick(0.1);
    assert_eq!(stats.components_updated, 1);
    assert_eq!(stats.commands.applied, 1);
    let global = world.global_transform(bullet).unwrap();
    assert!(global.position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));

    for _ in 0..3 {
        world.tick(0.1);
    }
    assert!(!world.is_alive(bullet));
    assert_eq!(world.component_count(), 0);
}

#[test]
fn static_objects_are_skipped_by_propagation() {
    let mut world = World::default();
    let _scenery = world.create_object(GameObjectDesc::new("scenery")).unwrap();
    let ship = world
        .create_object(GameObjectDesc::new("ship").dynamic())
        .unwrap();
    let cockpit = world
        .create_object(GameObjectDesc::new("cockpit").with_parent(ship))
        .unwrap();
    let _turret = world
        .create_object(GameObjectDesc::new("turret").dynamic().with_parent(cockpit))
        .unwrap();

    world.set_local_position(ship, Vec3::new(0.0, 0.0, 5.0)).unwrap();
    let stats = world.tick(0.016);

    // ship, cockpit through ship, turret on its own turn.
    assert_eq!(stats.transforms_propagated, 3);
    assert_eq!(
        world.global_transform(cockpit).unwrap().position,
        Vec3::new(0.0, 0.0, 5.0)
    );
}

/// Spawns a child with a recorder when pinged.
struct Spawner {
    log: Log,
}

impl Component for Spawner {
    fn on_message(&mut self, msg: &dyn Message, ctx: &mut WorldContext<'_>) {
        if !msg.is::<Ping>() {
            return;
        }
        let log = Arc::clone(&self.log);
        let desc = GameObjectDesc::new("spawned").with_parent(ctx.owner());
        ctx.spawn(desc, move |world, object| {
            let recorder = world.create_component(Recorder { log })?;
            world.add_component(object, recorder)
        });
    }
}

#[test]
fn handlers_can_spawn_objects() {
    let mut world = World::default();
    let log = new_log();
    let factory = world.create_object(GameObjectDesc::new("factory")).unwrap();
    let spawner = world.create_component(Spawner { log: Arc::clone(&log) }).unwrap();
    world.add_component(factory, spawner).unwrap();

    world.send_message(factory, Ping, MsgRouting::DEFAULT).unwrap();
    let spawned: Vec<_> = world.children(factory).unwrap().collect();
    assert_eq!(spawned.len(), 1);
    assert_eq!(world.get_object_name(spawned[0]).unwrap(), Some("spawned"));

    // The spawned child hears pings routed down from the factory.
    world.send_message(factory, Ping, MsgRouting::TO_CHILDREN).unwrap();
    assert_eq!(owners(&log), vec![spawned[0]]);
}

// ============================================================================
// CLONING
// ============================================================================

/// Duplicates fine, but copies refuse to initialize.
#[derive(Clone)]
struct Original {
    copy: bool,
}

impl Component for Original {
    fn initialize(&mut self, _ctx: &ComponentContext) -> Result<(), ComponentError> {
        if self.copy {
            return Err(ComponentError::Failed("copies not allowed".to_string()));
        }
        Ok(())
    }

    fn duplicate(&self) -> Option<Self> {
        Some(Self { copy: true })
    }
}

#[test]
fn failed_clone_leaves_world_unchanged() {
    let mut world = World::default();
    let source = world.create_object(GameObjectDesc::new("source")).unwrap();
    let original = world.create_component(Original { copy: false }).unwrap();
    world.add_component(source, original).unwrap();
    let objects = world.object_count();
    let components = world.component_count();

    let err = world.clone_object(source, None).unwrap_err();
    assert!(matches!(err, WorldError::InitializationFailed { .. }));
    assert_eq!(world.object_count(), objects);
    assert_eq!(world.component_count(), components);
    assert_eq!(world.find_objects_by_name("source").count(), 1);
}
