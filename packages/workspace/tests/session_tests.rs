//! Session behavior through the public API: lifecycle, edit resolution,
//! coercion and the full disk round trip
use placesync_document::{Document, DocumentStore, Node, PlaceFileStore, PropertyValue, Vector3};
use placesync_workspace::{EditCommand, EditOutcome, IngestOutcome, ProjectSession, WorkspaceServer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn store_with(temp_dir: &TempDir, name: &str, doc: &Document) -> PlaceFileStore {
    let store = PlaceFileStore::new(temp_dir.path().join("projects"));
    store.save(name, doc).expect("Failed to save fixture");
    store
}

fn town() -> Document {
    Document::with_children(vec![
        Node::new("Spawn", "SpawnLocation").with_property("Enabled", true)
    ])
}

/// Projected folders directly under `dir`, sorted by name
fn folders(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn folder_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[test]
fn test_close_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_with(&temp_dir, "Town", &town());
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);

    session.close_project().unwrap();
    session.open_project("Town").unwrap();
    session.close_project().unwrap();
    session.close_project().unwrap();

    assert!(!session.is_open());
    assert!(!temp_dir.path().join("unpacked").exists());
}

#[test]
fn test_reference_properties_never_projected() {
    let temp_dir = TempDir::new().unwrap();
    let doc = Document::with_children(vec![Node::new("Door", "Part")
        .with_property("Anchored", true)
        .with_property("Transparency", 0.5f32)
        .with_property("Parent", PropertyValue::Ref(Some("RBX1".into())))]);
    let store = store_with(&temp_dir, "Town", &doc);
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Town").unwrap();

    let file = folders(&temp_dir.path().join("unpacked"))[0].join("properties.yaml");
    let text = std::fs::read_to_string(&file).unwrap();
    assert!(text.contains("anchored: true"));
    assert!(!text.contains("parent"));

    // Feeding the projection back in leaves every value as it was
    std::fs::write(&file, format!("{}\n", text.trim_end())).unwrap();
    session.ingest(&file).unwrap();
    let door = &session.document().unwrap().children()[0];
    assert_eq!(door.property("Anchored"), Some(&PropertyValue::Bool(true)));
    assert_eq!(door.property("Transparency"), Some(&PropertyValue::Float(0.5)));
    assert_eq!(door.property("Parent"), Some(&PropertyValue::Ref(Some("RBX1".into()))));
}

#[test]
fn test_unchanged_projection_reingests_as_noop() {
    let temp_dir = TempDir::new().unwrap();
    let doc = Document::with_children(vec![Node::new("Stats", "Configuration")
        .with_property("Nothing", PropertyValue::Null)
        .with_property("Precise", 0.123456789012345f64)
        .with_property("Tiny", 1e-50f64)
        .with_property("Huge", 9_000_000_000i64)
        .with_property("Label", "3.5")
        .with_property("Texture", PropertyValue::ContentRef("rbxassetid://7".into()))]);
    let store = store_with(&temp_dir, "Town", &doc);
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Town").unwrap();

    let file = folders(&temp_dir.path().join("unpacked"))[0].join("properties.yaml");
    assert_eq!(session.ingest(&file).unwrap(), IngestOutcome::Applied(vec![]));
    assert_eq!(session.document().unwrap(), &doc);
}

#[test]
fn test_duplicate_siblings_resolve_to_first() {
    let temp_dir = TempDir::new().unwrap();
    let doc = Document::with_children(vec![
        Node::new("Door", "Part").with_property("Anchored", false),
        Node::new("Door", "Part").with_property("Anchored", false),
    ]);
    let store = store_with(&temp_dir, "Town", &doc);
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Town").unwrap();

    let projected = folders(&temp_dir.path().join("unpacked"));
    assert_eq!(projected.len(), 2);

    for folder in &projected {
        let command = EditCommand::ModifyProperty {
            path: folder_name(folder),
            property: "Anchored".into(),
            value: "true".into(),
        };
        assert_eq!(session.apply_edit(&command).unwrap(), EditOutcome::Applied);

        let doors = session.document().unwrap().children();
        assert_eq!(doors[0].property("Anchored"), Some(&PropertyValue::Bool(true)));
        assert_eq!(doors[1].property("Anchored"), Some(&PropertyValue::Bool(false)));
    }
}

#[test]
fn test_delete_then_resolve_finds_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let doc = Document::with_children(vec![
        Node::new("Map", "Model").with_child(Node::new("Door", "Part").with_property("Anchored", true)),
        Node::new("Spawn", "SpawnLocation").with_property("Enabled", true),
    ]);
    let store = store_with(&temp_dir, "Town", &doc);
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Town").unwrap();

    let map = folders(&temp_dir.path().join("unpacked"))
        .into_iter()
        .find(|p| folder_name(p).starts_with("Map."))
        .unwrap();
    let door = folders(&map)[0].clone();
    let door_file = door.join("properties.yaml");
    let door_text = std::fs::read_to_string(&door_file).unwrap();

    let delete = EditCommand::Delete { path: folder_name(&map) };
    assert_eq!(session.apply_edit(&delete).unwrap(), EditOutcome::Applied);
    assert!(!map.exists());
    assert_eq!(session.document().unwrap().len(), 1);

    let edit = EditCommand::ModifyProperty {
        path: folder_name(&door),
        property: "Anchored".into(),
        value: "false".into(),
    };
    assert_eq!(session.apply_edit(&edit).unwrap(), EditOutcome::Unresolved);

    // A late write into the deleted folder resolves nothing either
    std::fs::create_dir_all(&door).unwrap();
    std::fs::write(&door_file, door_text.replace("true", "false")).unwrap();
    assert_eq!(session.ingest(&door_file).unwrap(), IngestOutcome::Unresolved);
}

#[test]
fn test_boolean_property_takes_integer_text() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_with(&temp_dir, "Town", &town());
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Town").unwrap();

    let file = folders(&temp_dir.path().join("unpacked"))[0].join("properties.yaml");
    std::fs::write(&file, "enabled: 42\n").unwrap();
    session.ingest(&file).unwrap();

    let spawn = &session.document().unwrap().children()[0];
    assert_eq!(spawn.property("Enabled"), Some(&PropertyValue::Int(42)));
}

#[test]
fn test_nested_file_resolves_to_its_own_node() {
    let temp_dir = TempDir::new().unwrap();
    let doc = Document::with_children(vec![Node::new("Map", "Model")
        .with_property("Name", "Map")
        .with_child(Node::new("Door", "Part").with_property("Size", Vector3::new(4.0, 8.0, 1.0)))]);
    let store = store_with(&temp_dir, "Town", &doc);
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Town").unwrap();

    let map = folders(&temp_dir.path().join("unpacked"))[0].clone();
    let door_file = folders(&map)[0].join("properties.yaml");
    std::fs::write(&door_file, "size: {x: 1, y: 2, z: 3}\n").unwrap();

    assert_eq!(
        session.ingest(&door_file).unwrap(),
        IngestOutcome::Applied(vec!["Size".to_string()])
    );
    let document = session.document().unwrap();
    let door = document.node(&document.find("Door", "Part").unwrap()).unwrap();
    assert_eq!(
        door.property("Size"),
        Some(&PropertyValue::Vector3(Vector3::new(1.0, 2.0, 3.0)))
    );
}

#[test]
fn test_script_source_syncs_both_ways() {
    let temp_dir = TempDir::new().unwrap();
    let doc = Document::with_children(vec![
        Node::new("Main", "Script").with_property("Source", "print('a')\n")
    ]);
    let store = store_with(&temp_dir, "Game", &doc);
    let mut session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
    session.open_project("Game").unwrap();

    let folder = folders(&temp_dir.path().join("unpacked"))[0].clone();
    let code = folder.join("code.lua");
    assert_eq!(std::fs::read_to_string(&code).unwrap(), "print('a')\n");
    assert!(!std::fs::read_to_string(folder.join("properties.yaml"))
        .unwrap()
        .contains("print"));

    std::fs::write(&code, "print('b')\n").unwrap();
    assert_eq!(session.ingest(&code).unwrap(), IngestOutcome::ScriptUpdated);

    let command = EditCommand::ModifyScript {
        path: folder_name(&folder),
        source: "print('c')\n".into(),
    };
    session.apply_edit(&command).unwrap();
    assert_eq!(std::fs::read_to_string(&code).unwrap(), "print('c')\n");
    assert_eq!(session.ingest(&code).unwrap(), IngestOutcome::Echo);

    session.close_project().unwrap();
    let saved = PlaceFileStore::new(temp_dir.path().join("projects")).load("Game").unwrap();
    assert_eq!(
        saved.children()[0].property("Source"),
        Some(&PropertyValue::String("print('c')\n".into()))
    );
}

#[tokio::test]
async fn test_town_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_with(&temp_dir, "Town", &town());
    let unpacked = temp_dir.path().join("unpacked");
    let server = WorkspaceServer::with_store(store, unpacked.clone(), Duration::from_millis(100));

    server.open_project("Town").await.unwrap();

    let projected = folders(&unpacked);
    assert_eq!(projected.len(), 1);
    assert!(folder_name(&projected[0]).starts_with("Spawn.SpawnLocation."));
    let file = projected[0].join("properties.yaml");
    assert_eq!(std::fs::read_to_string(&file).unwrap().trim(), "enabled: true");

    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(&file, "enabled: false\n").unwrap();

    let mut synced = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let doc = server.document().await.unwrap();
        if doc.children()[0].property("Enabled") == Some(&PropertyValue::Bool(false)) {
            synced = true;
            break;
        }
    }
    assert!(synced, "disk edit never reached the document");

    server.close_project().await.unwrap();
    assert!(!unpacked.exists());

    let saved = PlaceFileStore::new(temp_dir.path().join("projects")).load("Town").unwrap();
    assert_eq!(
        saved.children()[0].property("Enabled"),
        Some(&PropertyValue::Bool(false))
    );
}
