//! Integration tests: canvas → panel → bridge → disk → panel → canvas.

use pretty_assertions::assert_eq;
use slide_bridge::{BridgeConfig, PersistenceBridge};
use slide_core::{EditorConfig, OverlayPatch, OverlayRef, SaveOutcome, Slide, decode_slide};
use slide_editor::{
    CanvasHost, Command, ControlPanel, Event, SaveSink, SlideStore, WindowListeners, boundary_pair,
};
use std::cell::RefCell;
use std::rc::Rc;

const TARGET: &str = "src/content/slides/intro.json";

fn settle<S: SaveSink>(canvas: &mut CanvasHost, panel: &mut ControlPanel<S>) {
    while canvas.pump() + panel.pump() > 0 {}
}

#[tokio::test]
async fn save_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        content_root: dir.path().to_path_buf(),
        in_process: true,
        ..BridgeConfig::default()
    };
    let mut bridge = PersistenceBridge::spawn(config.writer());

    let (canvas_port, panel_port) = boundary_pair("canvas", "panel");
    let store = SlideStore::new(Slide::new(), EditorConfig::default());
    let mut canvas = CanvasHost::new(store, canvas_port, Rc::new(WindowListeners::new()));
    let mut panel = ControlPanel::new(panel_port, bridge.handle.clone(), TARGET);

    let outcomes_seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&outcomes_seen);
    let _sub = canvas
        .bus()
        .subscribe_all(move |e: &Event| {
            if matches!(e.name(), "save-completed" | "save-failed") {
                sink.borrow_mut().push(e.clone());
            }
        });

    panel.start().unwrap();
    canvas.flush();
    settle(&mut canvas, &mut panel);

    canvas.dispatch(Command::AddOverlay { layer_index: Some(0) });
    canvas.dispatch(Command::UpdateOverlay {
        layer_index: Some(0),
        overlay_index: Some(0),
        updated_overlay: OverlayPatch::target("/slides/next"),
    });
    panel.save().unwrap();
    settle(&mut canvas, &mut panel);

    let outcome = bridge.outcomes.recv().await.unwrap();
    assert!(outcome.is_saved(), "{outcome:?}");
    panel.report_save(outcome.clone()).unwrap();
    settle(&mut canvas, &mut panel);

    assert_eq!(panel.view().last_save, Some(outcome));
    assert_eq!(outcomes_seen.borrow().len(), 1);

    let text = std::fs::read_to_string(dir.path().join(TARGET)).unwrap();
    let saved = decode_slide(&text, &EditorConfig::default()).unwrap();
    assert_eq!(saved, **canvas.store().slide());
    assert_eq!(
        saved.overlay(OverlayRef::new(0, 0)).and_then(|o| o.target.as_deref()),
        Some("/slides/next")
    );
}

#[tokio::test]
async fn rejected_target_is_reported_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        content_root: dir.path().to_path_buf(),
        in_process: true,
        ..BridgeConfig::default()
    };
    let mut bridge = PersistenceBridge::spawn(config.writer());

    let (canvas_port, panel_port) = boundary_pair("canvas", "panel");
    let store = SlideStore::new(Slide::new(), EditorConfig::default());
    let mut canvas = CanvasHost::new(store, canvas_port, Rc::new(WindowListeners::new()));
    let mut panel = ControlPanel::new(panel_port, bridge.handle.clone(), "../../etc/slide.json");

    panel.save().unwrap();
    settle(&mut canvas, &mut panel);

    let outcome = bridge.outcomes.recv().await.unwrap();
    assert!(matches!(
        &outcome,
        SaveOutcome::Failed { reason, .. } if reason.contains("content root")
    ));
}
