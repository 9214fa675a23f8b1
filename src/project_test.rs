use super::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_descriptor_round_trip() {
    let dir = TempDir::new().unwrap();
    let descriptor =
        ProjectDescriptor::new("Billing Sync", "proj_Ab12Cd", Some("ops@example.com"))
            .with_api_key(Some("pd_secret"));

    let path = descriptor.write(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("config.ini"));

    let read_back = ProjectDescriptor::read(&path).unwrap();
    assert_eq!(read_back.id, "proj_Ab12Cd");
    assert_eq!(read_back.name, "Billing Sync");
    assert_eq!(read_back.username.as_deref(), Some("ops@example.com"));
    assert_eq!(read_back.api_key.as_deref(), Some("pd_secret"));
    assert_eq!(
        read_back.created_at.timestamp(),
        descriptor.created_at.timestamp()
    );
}

#[test]
fn test_descriptor_key_feeds_credential_lookup() {
    let dir = TempDir::new().unwrap();
    let path = ProjectDescriptor::new("Keyed", "proj_Keyed1", None)
        .with_api_key(Some("pd_secret"))
        .write(dir.path())
        .unwrap();

    let config = ConfigFile::load(&path).unwrap();
    assert_eq!(config.get("pipedream", "apikey"), Some("pd_secret"));
}

#[test]
fn test_blank_api_key_is_not_written() {
    let dir = TempDir::new().unwrap();
    let path = ProjectDescriptor::new("Keyless", "proj_Keyless1", Some("ops@example.com"))
        .with_api_key(Some("  "))
        .write(dir.path())
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("apikey"));
    assert_eq!(ProjectDescriptor::read(&path).unwrap().api_key, None);
}

#[test]
fn test_read_without_id_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ini");
    std::fs::write(&path, "[project]\nname = Orphan\n").unwrap();

    let err = ProjectDescriptor::read(&path).unwrap_err();
    assert!(err.to_string().contains("has no [project] id"));
}

#[test]
fn test_find_local_checks_parent_directory() {
    let dir = TempDir::new().unwrap();
    ProjectDescriptor::new("Parent", "proj_Parent1", None)
        .write(dir.path())
        .unwrap();
    let child = dir.path().join("workflows");
    std::fs::create_dir_all(&child).unwrap();

    let found = ConfigFile::find_local(&child).unwrap();
    assert_eq!(found, dir.path().join("config.ini"));
}

#[test]
fn test_find_local_misses_unrelated_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    assert!(ConfigFile::find_local(&nested).is_none());
}

#[test]
fn test_config_file_ignores_blank_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ini");
    std::fs::write(&path, "[pipedream]\nusername = \napikey = pd_key\n").unwrap();

    let config = ConfigFile::load(&path).unwrap();
    assert_eq!(config.get("pipedream", "username"), None);
    assert_eq!(config.get("pipedream", "apikey"), Some("pd_key"));
}

#[test]
fn test_extract_project_id() {
    assert_eq!(
        extract_project_id("https://pipedream.com/@acme/projects/proj_9xYz/tree").as_deref(),
        Some("proj_9xYz")
    );
    assert_eq!(extract_project_id("https://pipedream.com/projects"), None);
}

#[test]
fn test_project_id_prefers_created_url() {
    assert_eq!(
        project_id_from_urls(
            "https://pipedream.com/@acme/projects/proj_First1",
            Some("https://pipedream.com/@acme/projects/proj_Second2/settings"),
        )
        .as_deref(),
        Some("proj_First1")
    );
}

#[test]
fn test_project_id_falls_back_to_settings_url() {
    assert_eq!(
        project_id_from_urls(
            "https://pipedream.com/@acme/projects",
            Some("https://pipedream.com/@acme/projects/proj_Settings9/settings"),
        )
        .as_deref(),
        Some("proj_Settings9")
    );
}

#[test]
fn test_project_id_missing_from_both_urls() {
    assert_eq!(project_id_from_urls("https://pipedream.com/@acme/projects", None), None);
    assert_eq!(
        project_id_from_urls(
            "https://pipedream.com/@acme/projects",
            Some("https://pipedream.com/@acme/settings"),
        ),
        None
    );
}

#[test]
fn test_default_project_name_has_date() {
    let name = default_project_name();
    assert!(name.starts_with("Project_"));
    assert_eq!(name.len(), "Project_2025-01-01".len());
}

#[test]
fn test_project_targets() {
    let new = new_project_target();
    assert_eq!(new.label, "New project");
    assert_eq!(new.icon_markers, vec![PLUS_ICON_CLASS.to_string()]);

    let create = create_project_target();
    assert!(create.dialog_submit);
    assert_eq!(create.class_fingerprints.len(), 1);

    let settings = settings_target();
    assert_eq!(settings.label, "Settings");
    assert!(!settings.dialog_submit);
}
