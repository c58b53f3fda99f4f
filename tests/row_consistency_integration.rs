//! Row consistency integration tests
//!
//! Drives the public API the way a presentation layer would: pick controls,
//! safeguards and asset options, add attributes, then export.
//!
//! Run with: cargo test --test row_consistency_integration

use ctrl_parfait::{
    attribute_from_form, check_rows, decode_asset_option, generate_asset_options, tabulate,
    AssetSelection, ExportError, Exporter, HierarchyIndex, RowEngine, RowField, TabType, Taxonomy,
    Workspace,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn cis() -> Taxonomy {
    Taxonomy::cis_default().expect("embedded taxonomy loads")
}

// ============================================================================
// Asset options for 1.1
// ============================================================================

#[test]
fn safeguard_1_1_options_class_level_first() {
    let taxonomy = cis();
    let index = HierarchyIndex::from_taxonomy(&taxonomy);
    let safeguard = index.find_safeguard("1.1").unwrap();

    let ids: Vec<_> = generate_asset_options(safeguard, index.asset_classes())
        .into_iter()
        .map(|o| o.id)
        .collect();

    assert_eq!(
        ids,
        vec![
            "class-devices",
            "class-networks",
            "subclass-devices-endpoints",
            "subclass-devices-servers",
            "subclass-devices-mobile",
            "subclass-devices-iot",
            "subclass-networks-lan",
            "subclass-networks-wan",
            "subclass-networks-wireless",
        ]
    );
}

#[test]
fn safeguard_1_2_options_omit_unlisted_subclass() {
    let index = HierarchyIndex::from_taxonomy(&cis());
    let safeguard = index.find_safeguard("1.2").unwrap();
    let options = generate_asset_options(safeguard, index.asset_classes());

    // 1.2 lists every devices/networks subclass except wan
    assert_eq!(options.len(), 2 + 6);
    assert!(options.iter().all(|o| o.id != "subclass-networks-wan"));
    assert!(options.iter().any(|o| o.id == "subclass-networks-lan"));
}

// ============================================================================
// Row lifecycle
// ============================================================================

#[test]
fn add_row_to_empty_collection() {
    let rows = RowEngine::add_row(&[], ["effectiveness", "coverage"]);

    let expected: BTreeMap<String, String> = ["effectiveness", "coverage"]
        .into_iter()
        .map(|id| (id.to_string(), String::new()))
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].attributes, expected);
    assert_eq!(rows[0].asset_selection(), AssetSelection::empty());
    assert!(rows[0].control_id.is_empty() && rows[0].safeguard_id.is_empty());
}

#[test]
fn set_control_cis1_selects_1_1_and_clears_assets() {
    let index = HierarchyIndex::from_taxonomy(&cis());
    let engine = RowEngine::new(&index);
    let rows = RowEngine::add_row(&[], Vec::<String>::new());
    let id = rows[0].id.clone();

    let rows = engine.set_safeguard(&rows, &id, "2.1");
    let rows = engine.set_asset_option(&rows, &id, "subclass-applications-cloud");
    let rows = engine.set_control(&rows, &id, "cis1");

    assert_eq!(rows[0].safeguard_id, "1.1");
    assert_eq!(rows[0].control_id, "cis1");
    assert_eq!(rows[0].asset_class_id, "");
    assert_eq!(rows[0].asset_subclass_id, "");
}

#[test]
fn decode_composite_keys() {
    assert_eq!(
        decode_asset_option("subclass-devices-endpoints"),
        AssetSelection {
            asset_class_id: "devices".to_string(),
            asset_subclass_id: "endpoints".to_string(),
        }
    );
    assert_eq!(decode_asset_option(""), AssetSelection::empty());
    assert_eq!(decode_asset_option("garbage"), AssetSelection::empty());
}

#[test]
fn input_collection_is_never_modified() {
    let index = HierarchyIndex::from_taxonomy(&cis());
    let engine = RowEngine::new(&index);
    let original = RowEngine::add_row(&[], ["coverage"]);
    let id = original[0].id.clone();
    let snapshot = original.clone();

    let _ = engine.set_control(&original, &id, "cis4");
    let _ = engine.set_cell(&original, &id, &RowField::EnforcementPoint, "GPO");
    let _ = RowEngine::delete_row(&original, &id);

    assert_eq!(original, snapshot);
}

// ============================================================================
// Full session
// ============================================================================

#[tokio::test]
async fn edit_then_export_session() {
    let mut workspace = Workspace::new(cis());
    let row_id = workspace.add_row(TabType::Framework);

    workspace.update_rows(TabType::Framework, |engine, rows| {
        engine.set_control(rows, &row_id, "cis3")
    });
    let key = workspace
        .asset_options_for("3.1")
        .iter()
        .find(|o| o.asset_subclass_id.as_deref() == Some("cloud"))
        .map(|o| o.id.clone())
        .unwrap();
    workspace.update_rows(TabType::Framework, |engine, rows| {
        let rows = engine.set_asset_option(rows, &row_id, &key);
        engine.set_cell(&rows, &row_id, &RowField::EnforcementPoint, "CASB")
    });
    workspace
        .add_attribute(attribute_from_form("Time to Detect", "Detection latency", "").unwrap())
        .unwrap();
    workspace.update_rows(TabType::Framework, |engine, rows| {
        engine.set_cell(rows, &row_id, &"attribute.time-to-detect".parse::<RowField>().unwrap(), "SIEM alert age")
    });

    assert!(check_rows(workspace.index(), workspace.rows(TabType::Framework)).is_empty());

    let snapshot = workspace.snapshot(TabType::Framework);
    let table = tabulate(&snapshot);
    assert_eq!(table.headers.last().unwrap(), "Time to Detect");
    let record = &table.records[0];
    assert_eq!(record.control_number, "3");
    assert_eq!(record.safeguard_number, "3.1");
    assert_eq!(record.asset_class, "Data");
    assert_eq!(record.asset_subclass, "Cloud Data");
    assert_eq!(record.enforcement_point, "CASB");
    assert_eq!(record.attribute_values.last().unwrap(), "SIEM alert age");

    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let path = exporter.export("json", &snapshot).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("ctrl-parfait-framework-"));
    assert!(name.ends_with(".json"));
    assert!(!name.trim_end_matches(".json").contains(':'));

    let workbook = exporter.export("xlsx", &snapshot).await.unwrap();
    assert!(workbook.to_string_lossy().ends_with(".xlsx"));

    let err = exporter.export("pptx", &snapshot).await.unwrap_err();
    assert!(matches!(err, ExportError::EncoderUnavailable(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn seeded_workspace_is_consistent() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let workspace = Workspace::with_examples(cis(), &mut StdRng::seed_from_u64(2024));
    for tab in [TabType::Framework, TabType::Assessment] {
        let rows = workspace.rows(tab);
        assert!(!rows.is_empty());
        assert!(check_rows(workspace.index(), rows).is_empty());
        assert!(workspace.attributes().missing_in(rows).is_empty());
    }
}
