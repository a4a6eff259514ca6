mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tether_bridge::{
    AssetCatalog, AssetDescription, BoneAnimation, Bridge, BridgeOptions, Color, EngineInit,
    FrameInfo, HeadlessEngine, Light, LightKind, MorphAnimation, RenderTargetDesc, ToneMapping,
};
use tether_core::{Error, ThreadState};

fn init() -> EngineInit {
    EngineInit {
        width: 320,
        height: 240,
        ..EngineInit::default()
    }
}

fn bridge() -> Bridge {
    Bridge::headless(BridgeOptions {
        loader: support::loader(),
        ..BridgeOptions::default()
    })
    .unwrap()
}

#[test]
fn create_then_destroy_invalidates_the_handle() {
    let bridge = bridge();
    assert_eq!(bridge.state(), ThreadState::Idle);

    let handle = bridge.create_context(init()).unwrap();
    assert_eq!(bridge.current_context(), Some(handle));
    assert_eq!(bridge.state(), ThreadState::Running);

    bridge.destroy_context(handle).unwrap();
    assert_eq!(bridge.current_context(), None);
    assert_eq!(bridge.state(), ThreadState::Idle);

    assert!(matches!(
        bridge.set_background_color(handle, Color::BLACK),
        Err(Error::ContextUnavailable)
    ));
    assert!(matches!(bridge.destroy_context(handle), Err(Error::ContextUnavailable)));
}

#[test]
fn destroying_the_context_stops_rendering() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();
    bridge.set_rendering(true);
    bridge.destroy_context(handle).unwrap();
    assert!(!bridge.is_rendering());
}

#[test]
fn creating_again_replaces_the_context() {
    let bridge = bridge();
    let first = bridge.create_context(init()).unwrap();
    let second = bridge.create_context(init()).unwrap();

    assert_ne!(first, second);
    assert!(matches!(bridge.clear_lights(first), Err(Error::ContextUnavailable)));
    bridge.clear_lights(second).unwrap();
}

#[test]
fn render_on_demand_reports_the_target_size() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();

    // No swap chain yet.
    assert_eq!(bridge.render(handle).unwrap(), None);

    bridge.create_swap_chain(handle, None, 320, 240).unwrap();
    let frame = bridge.render(handle).unwrap().unwrap();
    assert_eq!((frame.width, frame.height), (320, 240));
    assert_eq!(frame.context, handle);

    bridge
        .create_render_target(
            handle,
            RenderTargetDesc {
                native_texture: 7,
                width: 640,
                height: 480,
            },
        )
        .unwrap();
    let frame = bridge.render(handle).unwrap().unwrap();
    assert_eq!((frame.width, frame.height), (640, 480));
    assert_eq!(frame.sequence, 1);
}

#[test]
fn zero_sized_swap_chain_fails_on_the_caller() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();
    let err = bridge.create_swap_chain(handle, None, 0, 240).unwrap_err();
    assert!(matches!(err, Error::GpuOperationFailed { .. }));
}

#[test]
fn missing_resources_surface_as_load_failures() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();

    let err = bridge.load_glb(handle, "missing.glb", false).unwrap_err();
    assert!(matches!(err, Error::ResourceLoadFailed { ref name, .. } if name == "missing.glb"));

    // The context survives the failure.
    let asset = bridge.load_glb(handle, "helmet.glb", false).unwrap();
    assert_eq!(
        bridge.name_for_entity(handle, asset).unwrap().as_deref(),
        Some("helmet")
    );
}

#[test]
fn loaded_resources_are_released() {
    let loader = support::loader();
    let bridge = Bridge::headless(BridgeOptions {
        loader: loader.clone(),
        ..BridgeOptions::default()
    })
    .unwrap();
    let handle = bridge.create_context(init()).unwrap();

    bridge.load_glb(handle, "helmet.glb", true).unwrap();
    bridge.load_skybox(handle, "sky.ktx").unwrap();
    bridge.set_background_image(handle, "bg.png", true).unwrap();
    assert_eq!(loader.live(), 0);
}

#[test]
fn scene_operations_round_trip_through_the_render_thread() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();

    let sun = bridge.add_light(handle, Light::sun()).unwrap();
    let point = bridge
        .add_light(
            handle,
            Light {
                kind: LightKind::Point,
                ..Light::sun()
            },
        )
        .unwrap();
    assert_ne!(sun, point);
    assert_eq!(
        bridge.name_for_entity(handle, point).unwrap(),
        Some(format!("point-light-{}", point.0))
    );
    bridge.remove_light(handle, sun).unwrap();
    assert!(matches!(
        bridge.remove_light(handle, sun),
        Err(Error::InvalidArgument(_))
    ));

    let asset = bridge.load_glb(handle, "helmet.glb", false).unwrap();
    assert_eq!(bridge.animation_count(handle, asset).unwrap(), 0);
    assert!(bridge.animation_names(handle, asset).unwrap().is_empty());
    assert!(!bridge.set_camera(handle, asset, Some("main".into())).unwrap());

    bridge.set_tone_mapping(handle, ToneMapping::Filmic).unwrap();
    bridge.set_bloom(handle, 0.5).unwrap();
    assert!(matches!(bridge.set_bloom(handle, 2.0), Err(Error::InvalidArgument(_))));
    assert_eq!(bridge.pick(handle, 10, 10).unwrap(), None);

    bridge.remove_asset(handle, asset).unwrap();
    assert_eq!(bridge.name_for_entity(handle, asset).unwrap(), None);
}

fn catalog_bridge() -> Bridge {
    let catalog = AssetCatalog::new().with(
        "helmet.glb",
        AssetDescription::default()
            .with_animation("Spin", 2.5)
            .with_mesh("shell", &["dent", "scratch"], 2)
            .with_mesh("visor", &[], 1)
            .with_bones(&["root", "strap"])
            .with_camera("front")
            .with_bounds([-2.0, -2.0, -2.0], [2.0, 2.0, 2.0]),
    );
    Bridge::new(
        BridgeOptions {
            loader: support::loader(),
            ..BridgeOptions::default()
        },
        HeadlessEngine::factory_with(Arc::new(catalog)),
    )
    .unwrap()
}

#[test]
fn catalog_animations_round_trip() {
    let bridge = catalog_bridge();
    let handle = bridge.create_context(init()).unwrap();
    let helmet = bridge.load_glb(handle, "helmet.glb", false).unwrap();

    assert_eq!(bridge.animation_names(handle, helmet).unwrap(), vec!["Spin".to_string()]);
    assert_eq!(bridge.animation_duration(handle, helmet, 0).unwrap(), 2.5);
    assert!(matches!(
        bridge.animation_duration(handle, helmet, 3),
        Err(Error::InvalidArgument(_))
    ));
    assert!(bridge.set_camera(handle, helmet, Some("front".into())).unwrap());
    assert_eq!(
        bridge.morph_target_names(handle, helmet, "shell").unwrap(),
        vec!["dent".to_string(), "scratch".to_string()]
    );
}

#[test]
fn morph_and_bone_operations_round_trip() {
    let bridge = catalog_bridge();
    let handle = bridge.create_context(init()).unwrap();
    let helmet = bridge.load_glb(handle, "helmet.glb", false).unwrap();
    let frame = Duration::from_millis(33);

    bridge
        .set_morph_target_weights(handle, helmet, "shell", vec![0.25, 0.75])
        .unwrap();
    assert!(matches!(
        bridge.set_morph_target_weights(handle, helmet, "shell", vec![1.0]),
        Err(Error::InvalidArgument(_))
    ));

    bridge
        .animate_morph_weights(handle, helmet, "shell", vec![0.0, 0.0, 1.0, 1.0], 2, 2, frame)
        .unwrap();
    let sparse = MorphAnimation {
        targets: vec![1],
        weights: vec![0.0, 0.5, 1.0],
        frame_count: 3,
        frame_length: frame,
    };
    bridge.set_morph_animation(handle, helmet, "shell", sparse).unwrap();
    assert!(bridge
        .animate_morph_weights(handle, helmet, "visor", vec![1.0], 1, 1, frame)
        .is_err());

    let nod = BoneAnimation {
        bones: vec!["strap".into()],
        meshes: vec!["shell".into()],
        frames: vec![[0.0, 0.0, 0.0, 1.0]; 4],
        frame_count: 4,
        frame_length: frame,
        model_space: false,
    };
    bridge.add_bone_animation(handle, helmet, nod).unwrap();
    let mut identity = [0.0; 16];
    identity[0] = 1.0;
    identity[5] = 1.0;
    identity[10] = 1.0;
    identity[15] = 1.0;
    bridge
        .set_bone_transform(handle, helmet, "shell", "root", identity)
        .unwrap();
    assert!(matches!(
        bridge.set_bone_transform(handle, helmet, "shell", "tail", identity),
        Err(Error::InvalidArgument(_))
    ));
    bridge.reset_bones(handle, helmet).unwrap();
}

#[test]
fn mesh_and_material_operations_round_trip() {
    let bridge = catalog_bridge();
    let handle = bridge.create_context(init()).unwrap();
    let helmet = bridge.load_glb(handle, "helmet.glb", false).unwrap();

    bridge.hide(handle, helmet, "visor").unwrap();
    bridge.reveal(handle, helmet, "visor").unwrap();
    assert!(matches!(
        bridge.hide(handle, helmet, "plume"),
        Err(Error::InvalidArgument(_))
    ));

    let gold = Color::new(1.0, 0.8, 0.2, 1.0);
    bridge.set_material_color(handle, helmet, "shell", 1, gold).unwrap();
    assert!(bridge.set_material_color(handle, helmet, "visor", 1, gold).is_err());

    bridge.load_texture(handle, helmet, "visor.png", 1).unwrap();
    assert!(matches!(
        bridge.load_texture(handle, helmet, "gone.png", 0),
        Err(Error::ResourceLoadFailed { .. })
    ));
    assert!(matches!(
        bridge.load_texture(handle, helmet, "visor.png", 2),
        Err(Error::InvalidArgument(_))
    ));

    bridge.transform_to_unit_cube(handle, helmet).unwrap();
    let second = bridge.load_glb(handle, "helmet.glb", true).unwrap();
    bridge.remove_asset(handle, helmet).unwrap();
    assert!(bridge.transform_to_unit_cube(handle, helmet).is_err());
    bridge.transform_to_unit_cube(handle, second).unwrap();
}

#[test]
fn camera_gestures_move_the_orbit() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();
    let start = bridge.camera_orbit(handle).unwrap();

    bridge.zoom(handle, 160.0, 120.0, -2.0).unwrap();
    bridge.rotate_start(handle, 100.0, 100.0).unwrap();
    bridge.rotate_update(handle, 180.0, 100.0).unwrap();
    bridge.rotate_end(handle).unwrap();
    bridge.pan_start(handle, 0.0, 0.0).unwrap();
    bridge.pan_update(handle, 0.0, 50.0).unwrap();
    bridge.pan_end(handle).unwrap();

    // Awaited query runs after the streamed updates.
    let orbit = bridge.camera_orbit(handle).unwrap();
    assert!(orbit.distance < start.distance);
    assert!(orbit.yaw < start.yaw);
    assert!(orbit.target[1] > start.target[1]);

    // An update without a grab fails on the render thread and is only logged.
    bridge.pan_update(handle, 5.0, 5.0).unwrap();
    assert_eq!(bridge.camera_orbit(handle).unwrap(), orbit);
}

#[test]
fn streamed_transform_errors_do_not_reach_the_caller() {
    let bridge = bridge();
    let handle = bridge.create_context(init()).unwrap();

    // Unknown entity: fails on the render thread, only logged.
    bridge
        .set_position(handle, tether_bridge::EntityId(999), [1.0, 2.0, 3.0])
        .unwrap();
    bridge.clear_assets(handle).unwrap();
}

#[test]
fn paced_rendering_presents_frames() {
    let frames: Arc<Mutex<Vec<FrameInfo>>> = Arc::default();
    let sink = Arc::clone(&frames);
    let bridge = Bridge::headless(BridgeOptions {
        loader: support::loader(),
        presenter: Box::new(move |f: &FrameInfo| sink.lock().unwrap().push(*f)),
        ..BridgeOptions::default()
    })
    .unwrap();

    let handle = bridge.create_context(init()).unwrap();
    bridge.create_swap_chain(handle, None, 320, 240).unwrap();
    bridge.set_frame_interval(Duration::from_millis(16));
    bridge.set_rendering(true);
    std::thread::sleep(Duration::from_millis(1200));
    bridge.set_rendering(false);

    let frames = frames.lock().unwrap();
    assert!(frames.len() >= 50, "only {} frames", frames.len());
    assert!(frames.windows(2).all(|w| w[1].sequence == w[0].sequence + 1));
    assert!(frames.iter().all(|f| f.context == handle));
}

#[test]
fn frame_interval_in_milliseconds_is_validated() {
    let bridge = bridge();
    assert!(matches!(
        bridge.set_frame_interval_ms(f32::NAN),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        bridge.set_frame_interval_ms(0.0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(bridge.set_frame_interval_ms(-5.0).is_err());

    assert_eq!(
        bridge.set_frame_interval_ms(0.1).unwrap(),
        Duration::from_millis(1)
    );
    assert_eq!(
        bridge.set_frame_interval_ms(20.0).unwrap(),
        Duration::from_millis(20)
    );
    assert_eq!(bridge.frame_interval(), Duration::from_millis(20));
}
