use bevy::anti_alias::fxaa::Fxaa;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions};

use terravox::physics::{Agent, PhysicsParams, PhysicsSystem, reject_structure_contact};
use terravox::voxel::{StreamingAnchor, VoxelWorld};

#[derive(Component)]
pub struct PlayerCamera;

#[derive(Component, Debug, Default)]
pub struct LookAngles {
    pub yaw: f32,
    pub pitch: f32,
}

/// The physics body driven by this camera.
#[derive(Component, Deref, DerefMut)]
pub struct PlayerAgent(pub Agent);

#[derive(Resource)]
pub struct PlayerSettings {
    pub walk_speed: f32,
    pub look_sensitivity: f32,
    /// Camera height above the cylinder centre.
    pub eye_offset: f32,
}

#[derive(Resource, Deref, DerefMut)]
pub struct PhysicsClock(pub PhysicsSystem);

/// Physics waits until the ground under the spawn point has been generated.
#[derive(Resource, Default)]
pub struct SpawnState {
    pub placed: bool,
}

#[derive(Default)]
pub struct PlayerPlugin {
    pub physics: PhysicsParams,
}

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        let physics = self.physics;
        app.insert_resource(PlayerSettings {
            walk_speed: physics.walk_speed,
            look_sensitivity: 0.0025,
            eye_offset: physics.agent_height / 2.0 - 0.1,
        })
        .insert_resource(PhysicsClock(PhysicsSystem::new(&physics)))
        .init_resource::<SpawnState>()
        .add_systems(
            Startup,
            move |commands: Commands, cursor: Single<&mut CursorOptions>| {
                setup_player(commands, cursor, &physics)
            },
        )
        .add_systems(
            Update,
            (
                toggle_cursor,
                player_look,
                place_on_surface,
                (player_input, step_physics)
                    .chain()
                    .run_if(|spawn: Res<SpawnState>| spawn.placed),
                follow_agent,
            )
                .chain(),
        );
    }
}

fn setup_player(
    mut commands: Commands,
    mut cursor_options: Single<&mut CursorOptions>,
    params: &PhysicsParams,
) {
    let yaw = 0.0;
    let pitch = -0.15;
    let rotation = Quat::from_axis_angle(Vec3::Y, yaw) * Quat::from_axis_angle(Vec3::X, pitch);

    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(params.spawn_position).with_rotation(rotation),
        PlayerCamera,
        LookAngles { yaw, pitch },
        PlayerAgent(Agent::from_params(params)),
        StreamingAnchor,
        Tonemapping::AcesFitted,
        Msaa::Off,
        Fxaa::default(),
    ));

    cursor_options.grab_mode = CursorGrabMode::Locked;
    cursor_options.visible = false;
}

fn toggle_cursor(keys: Res<ButtonInput<KeyCode>>, mut cursor_options: Single<&mut CursorOptions>) {
    if !keys.just_pressed(KeyCode::Escape) {
        return;
    }
    if cursor_options.grab_mode == CursorGrabMode::Locked {
        cursor_options.grab_mode = CursorGrabMode::None;
        cursor_options.visible = true;
    } else {
        cursor_options.grab_mode = CursorGrabMode::Locked;
        cursor_options.visible = false;
    }
}

fn player_look(
    mouse_motion: Res<AccumulatedMouseMotion>,
    mut query: Query<(&mut Transform, &mut LookAngles), With<PlayerCamera>>,
    settings: Res<PlayerSettings>,
    cursor_options: Single<&CursorOptions>,
) {
    if cursor_options.grab_mode != CursorGrabMode::Locked {
        return;
    }
    let delta = mouse_motion.delta;
    if delta == Vec2::ZERO {
        return;
    }
    let Ok((mut transform, mut angles)) = query.single_mut() else {
        return;
    };
    angles.yaw -= delta.x * settings.look_sensitivity;
    angles.pitch = (angles.pitch - delta.y * settings.look_sensitivity).clamp(-1.54, 1.54);
    let yaw = Quat::from_axis_angle(Vec3::Y, angles.yaw);
    let pitch = Quat::from_axis_angle(Vec3::X, angles.pitch);
    transform.rotation = yaw * pitch;
}

/// Drops the agent just above the surface once its column is loaded.
fn place_on_surface(
    world: Res<VoxelWorld>,
    mut spawn: ResMut<SpawnState>,
    mut query: Query<&mut PlayerAgent, With<PlayerCamera>>,
) {
    if spawn.placed {
        return;
    }
    let Ok(mut agent) = query.single_mut() else {
        return;
    };
    let column = agent.position.floor().as_ivec3();
    let Some(surface) = world.surface_height(column.x, column.z) else {
        return;
    };

    let standing = (surface + 1) as f32 + agent.height / 2.0;
    agent.position.y = agent.position.y.max(standing);
    spawn.placed = true;
    info!("Player spawned at {}", agent.position);
}

/// WASD walks in the camera's yaw frame, Space jumps.
fn player_input(
    keys: Res<ButtonInput<KeyCode>>,
    settings: Res<PlayerSettings>,
    mut query: Query<(&mut PlayerAgent, &LookAngles), With<PlayerCamera>>,
) {
    let Ok((mut agent, angles)) = query.single_mut() else {
        return;
    };

    let mut input = Vec3::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        input.z -= 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        input.z += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }

    agent.yaw = angles.yaw;
    agent.input = input.normalize_or_zero() * settings.walk_speed;
    if keys.just_pressed(KeyCode::Space) {
        agent.jump();
    }
}

fn step_physics(
    time: Res<Time>,
    world: Res<VoxelWorld>,
    mut clock: ResMut<PhysicsClock>,
    mut query: Query<&mut PlayerAgent, With<PlayerCamera>>,
) {
    let Ok(mut agent) = query.single_mut() else {
        return;
    };
    clock.update(time.delta_secs(), &mut agent.0, &world.0);
    if reject_structure_contact(&mut agent.0, &world.0) {
        debug!("Bumped into a structure at {}", agent.position);
    }
}

fn follow_agent(
    settings: Res<PlayerSettings>,
    mut query: Query<(&mut Transform, &PlayerAgent), With<PlayerCamera>>,
) {
    let Ok((mut transform, agent)) = query.single_mut() else {
        return;
    };
    transform.translation = agent.position + Vec3::Y * settings.eye_offset;
}
