mod player;
mod raycast;

use bevy::prelude::*;
use player::PlayerPlugin;
use raycast::RaycastPlugin;
use terravox::voxel::{VoxelPlugin, WorldParams, WorldSeed};

fn main() {
    // Parse seed and draw distance from command line or environment variables
    let seed = parse_seed();
    let mut params = WorldParams::default();
    if let Some(distance) = parse_distance() {
        params.draw_distance = distance;
    }

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.53, 0.75, 0.95)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Terravox".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            VoxelPlugin {
                params,
                seed,
                ..default()
            },
            PlayerPlugin::default(),
            RaycastPlugin,
        ))
        .add_systems(Startup, (setup_light, print_controls))
        .run();
}

fn setup_light(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(30.0, 60.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn print_controls() {
    println!("=== Terravox Controls ===");
    println!("  WASD       - Walk");
    println!("  Space      - Jump");
    println!("  Mouse      - Look around");
    println!("  Left click - Remove block");
    println!("  [ / ]      - Decrease/Increase draw distance");
    println!("  Esc        - Release/Grab cursor");
}

/// Value following `--<long>` or `-<short>` on the command line.
fn cli_value(long: &str, short: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|pair| pair[0] == long || pair[0] == short)
        .map(|pair| pair[1].clone())
}

fn parse_seed() -> WorldSeed {
    // Check command line arguments: --seed <value> or -s <value>
    if let Some(seed_str) = cli_value("--seed", "-s") {
        // Try to parse as number first
        if let Ok(num) = seed_str.parse::<u32>() {
            info!("Using seed from command line: {}", num);
            return WorldSeed::new(num);
        }
        info!("Using string seed from command line: {}", seed_str);
        return WorldSeed::from_string(&seed_str);
    }

    // Check environment variable
    if let Ok(seed_str) = std::env::var("TERRAVOX_SEED") {
        if let Ok(num) = seed_str.parse::<u32>() {
            info!("Using seed from environment: {}", num);
            return WorldSeed::new(num);
        }
        info!("Using string seed from environment: {}", seed_str);
        return WorldSeed::from_string(&seed_str);
    }

    // Generate random seed based on current time
    let random_seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(12345);

    info!("Using random seed: {}", random_seed);
    WorldSeed::new(random_seed)
}

fn parse_distance() -> Option<i32> {
    let raw = cli_value("--distance", "-d").or_else(|| std::env::var("TERRAVOX_DISTANCE").ok())?;
    match raw.parse::<i32>() {
        Ok(distance) if distance >= 0 => Some(distance),
        _ => {
            warn!("Ignoring invalid draw distance {:?}", raw);
            None
        }
    }
}
