use eframe_geoview::error::ParseError;
use eframe_geoview::event::{EventLog, SessionEvent, ViewerEvent};
use eframe_geoview::ingestion::{self, IngestedFile};
use eframe_geoview::surface::{CameraOptions, HeadlessSurface};
use eframe_geoview::{MapSession, ViewerConfig};
use egui::{Color32, Pos2};

const CATEGORIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"category": "A", "name": "Well", "depth": 0, "note": ""},
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
        },
        {
            "type": "Feature",
            "properties": {"category": "B"},
            "geometry": {"type": "LineString", "coordinates": [[3.0, 3.0], [4.0, 4.0]]}
        },
        {
            "type": "Feature",
            "properties": {"category": "A", "zone": 7},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            }
        }
    ]
}"#;

fn ingest(name: &str, text: &str) -> IngestedFile {
    ingestion::ingest(name, text.as_bytes(), &ViewerConfig::default()).unwrap()
}

// Session with an event log already subscribed
fn session() -> (MapSession, EventLog) {
    let session = MapSession::new(ViewerConfig::default());
    let log = EventLog::new();
    session.subscribe(Box::new(log.clone()));
    (session, log)
}

fn load(session: &mut MapSession, surface: &mut HeadlessSurface, name: &str) {
    session.dispatch(ViewerEvent::FileIngested(ingest(name, CATEGORIES)));
    session.process_events(surface);
}

#[test]
fn test_upload_adds_dataset_and_layers() {
    let (mut session, log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");

    let state = session.state();
    assert_eq!(state.datasets.len(), 1);
    assert_eq!(state.properties, vec!["category", "name", "depth", "note", "zone"]);

    let dataset = state.datasets.iter().next().unwrap();
    assert_eq!(surface.layers_for(dataset.id).len(), 3);
    assert_eq!(surface.source(dataset.id).map(<[_]>::len), Some(3));

    let events = log.events();
    assert!(matches!(&events[0], SessionEvent::DatasetAdded { name, .. } if name == "sites.json"));
    assert!(events.contains(&SessionEvent::LayersSynced { dataset: dataset.id }));
}

#[test]
fn test_upload_fits_camera_to_extent() {
    let (mut session, _log) = session();
    let mut surface = HeadlessSurface::new();
    let file = ingest("sites.json", CATEGORIES);
    let extent = file.extent.unwrap();

    session.dispatch(ViewerEvent::FileIngested(file));
    session.process_events(&mut surface);

    assert_eq!(surface.camera(), Some(&CameraOptions::fit(extent, 40.0)));
    assert_eq!(extent.min().x, 1.0);
    assert_eq!(extent.max().y, 6.0);
}

#[test]
fn test_duplicate_name_is_ignored() {
    let (mut session, log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");
    load(&mut session, &mut surface, "sites.json");

    assert_eq!(session.state().datasets.len(), 1);
    assert_eq!(surface.layers().len(), 3);
    assert!(log.events().contains(&SessionEvent::DuplicateIgnored {
        name: "sites.json".to_owned()
    }));
}

#[test]
fn test_oversized_upload_is_rejected() {
    let config = ViewerConfig::default();
    let mut text = String::from(r#"{"type":"FeatureCollection","features":[]}"#);
    text.push_str(&" ".repeat(config.max_upload_bytes));

    let result = ingestion::ingest("huge.json", text.as_bytes(), &config);
    assert_eq!(
        result,
        Err(ParseError::TooLarge {
            size: text.len(),
            max: config.max_upload_bytes,
        })
    );
}

#[test]
fn test_failed_upload_leaves_state_untouched() {
    let (mut session, log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");
    let before = session.state().datasets.clone();

    let error = ingestion::ingest("broken.json", b"{not json", &ViewerConfig::default()).unwrap_err();
    assert!(matches!(error, ParseError::InvalidJson(_)));
    session.dispatch(ViewerEvent::UploadFailed {
        name: "broken.json".to_owned(),
        error,
    });
    session.process_events(&mut surface);

    assert_eq!(session.state().datasets, before);
    assert_eq!(surface.layers().len(), 3);
    let notice = session.state().notice.clone().unwrap();
    assert!(notice.starts_with("Could not load broken.json"));
    assert!(matches!(log.events().last(), Some(SessionEvent::UploadRejected { .. })));

    session.clear_notice();
    assert!(session.state().notice.is_none());
}

#[test]
fn test_color_assignment_recolors_matching_shapes() {
    let (mut session, log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");

    session.dispatch(ViewerEvent::PropertySelected("category".to_owned()));
    session.dispatch(ViewerEvent::ColorAssigned {
        value: "A".to_owned(),
        color: Color32::RED,
    });
    session.dispatch(ViewerEvent::ColorAssigned {
        value: "B".to_owned(),
        color: Color32::BLUE,
    });
    session.process_events(&mut surface);

    let state = session.state();
    assert_eq!(state.colors.values(), ["A", "B"]);
    let dataset = state.datasets.iter().next().unwrap();
    let published = surface.source(dataset.id).unwrap();
    let colors: Vec<_> = published.iter().map(|s| s.color_attribute()).collect();
    assert_eq!(colors, vec![Some("#ff0000"), Some("#0000ff"), Some("#ff0000")]);

    assert!(log.events().contains(&SessionEvent::ShapesRecolored {
        value: "A".to_owned(),
        count: 2,
    }));
}

#[test]
fn test_reassigning_colors_keeps_one_layer_set() {
    let (mut session, _log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");
    let id = session.state().datasets.ids()[0];

    session.dispatch(ViewerEvent::PropertySelected("category".to_owned()));
    for color in [Color32::RED, Color32::GREEN] {
        session.dispatch(ViewerEvent::ColorAssigned {
            value: "A".to_owned(),
            color,
        });
    }
    session.process_events(&mut surface);

    assert_eq!(surface.layers_for(id).len(), 3);
    assert_eq!(surface.removed_layers().len(), 6);
    assert_eq!(session.state().layers.len(), 1);
}

#[test]
fn test_reselecting_property_is_idempotent() {
    let (mut session, _log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");

    session.dispatch(ViewerEvent::PropertySelected("zone".to_owned()));
    session.process_events(&mut surface);
    let first = session.state().colors.values().to_vec();

    session.dispatch(ViewerEvent::PropertySelected("zone".to_owned()));
    session.process_events(&mut surface);

    assert_eq!(first, vec!["7"]);
    assert_eq!(session.state().colors.values(), first.as_slice());
}

#[test]
fn test_layers_wait_for_surface() {
    let (mut session, log) = session();
    let mut surface = HeadlessSurface::uninitialized();
    load(&mut session, &mut surface, "sites.json");
    let id = session.state().datasets.ids()[0];

    assert!(surface.layers().is_empty());
    assert!(session.state().layers.has_pending());
    assert!(log.events().contains(&SessionEvent::LayersDeferred { dataset: id }));

    surface.mark_ready();
    session.dispatch(ViewerEvent::SurfaceReady);
    session.process_events(&mut surface);

    assert_eq!(surface.layers_for(id).len(), 3);
    assert!(!session.state().layers.has_pending());
}

#[test]
fn test_removing_dataset_detaches_layers() {
    let (mut session, _log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");
    let id = session.state().datasets.ids()[0];

    session.dispatch(ViewerEvent::DatasetRemoved(id));
    session.process_events(&mut surface);

    assert!(surface.layers().is_empty());
    assert!(surface.source(id).is_none());
    assert!(session.state().properties.is_empty());
}

#[test]
fn test_inspect_skips_empty_values() {
    let (mut session, _log) = session();
    let mut surface = HeadlessSurface::new();
    load(&mut session, &mut surface, "sites.json");

    let rows = session.inspect_at(&surface, Pos2::new(1.0, 2.0));
    assert_eq!(
        rows,
        vec![
            ("category".to_owned(), "A".to_owned()),
            ("name".to_owned(), "Well".to_owned()),
        ]
    );
    assert!(session.inspect_at(&surface, Pos2::new(-50.0, -50.0)).is_empty());
}

#[test]
fn test_events_are_applied_in_order() {
    let (mut session, log) = session();
    let mut surface = HeadlessSurface::new();

    session.dispatch(ViewerEvent::FileIngested(ingest("first.json", CATEGORIES)));
    session.dispatch(ViewerEvent::FileIngested(ingest("second.json", CATEGORIES)));
    assert!(session.has_pending_events());
    assert_eq!(session.process_events(&mut surface), 2);

    let added: Vec<String> = log
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::DatasetAdded { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["first.json", "second.json"]);
    assert_eq!(surface.layers().len(), 6);
}

#[test]
fn test_editing_a_drawing_updates_its_measurement() {
    use eframe_geoview::input::InputEvent;
    use eframe_geoview::tools::{DrawTool, DrawingToolbar};
    use geo::Coord;

    let (mut session, _log) = session();
    let mut surface = HeadlessSurface::new();
    let mut toolbar = DrawingToolbar::new();
    let lonlat = |p: Pos2| Coord {
        x: f64::from(p.x),
        y: f64::from(p.y),
    };

    toolbar.set_active_tool(Some(DrawTool::Line));
    for position in [Pos2::new(0.0, 0.0), Pos2::new(1.0, 0.0)] {
        toolbar.handle_input(&InputEvent::PointerDown { position }, lonlat);
    }
    let complete = toolbar.handle_input(&InputEvent::Finish, lonlat).unwrap();
    session.dispatch(ViewerEvent::ShapeDrawn(complete));
    session.process_events(&mut surface);
    let before = session.state().measurement().and_then(|m| m.length()).unwrap();

    let drawn = session.state().drawing.completed()[0].clone();
    toolbar.edit(drawn.clone());
    toolbar.handle_input(&InputEvent::PointerDown { position: Pos2::new(1.0, 0.0) }, lonlat);
    let changed = toolbar
        .handle_input(
            &InputEvent::PointerMove {
                position: Pos2::new(2.0, 0.0),
                primary_down: true,
            },
            lonlat,
        )
        .unwrap();
    session.dispatch(ViewerEvent::ShapeDrawn(changed));
    session.process_events(&mut surface);

    let after = session.state().measurement().and_then(|m| m.length()).unwrap();
    assert!((after - 2.0 * before).abs() < 1.0, "{after} vs {before}");
    let completed = session.state().drawing.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, drawn.id);
    assert_ne!(completed[0].geometry, drawn.geometry);
}
