//! CSV export to workbook merge, through real xlsx files

use std::path::Path;

use tempfile::TempDir;

use wildrank_server::merge::{
    merge_export, xlsx, Conflict, CsvExport, MergeEvent, PromptConflicts, SkipConflicts, Workbook,
};

const FIRST_EXPORT: &str = "\
key,team,kind,auto,notes
2024miket-111,111,pit,,swerve
2024miket-qm1-111,111,match,4,
2024miket-qm1-112,112,match,2,
2024miket-qm1-111-n,111,note,,fast
";

fn merge_file(csv: &str, existing: Option<&Path>, out: &Path) -> wildrank_server::merge::MergeReport {
    let export = CsvExport::from_reader(csv.as_bytes()).unwrap();
    let mut book = match existing {
        Some(path) => xlsx::read_workbook(path).unwrap(),
        None => Workbook::new(),
    };
    let report = merge_export(&mut book, &export, &mut SkipConflicts);
    xlsx::write_workbook(&book, out).unwrap();
    report
}

#[test]
fn test_fresh_workbook_then_remerge() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("export.xlsx");

    let report = merge_file(FIRST_EXPORT, None, &out);
    assert_eq!(report.appended(), 4);

    let book = xlsx::read_workbook(&out).unwrap();
    let pit = book.sheet("pit").unwrap();
    // `auto` is empty for every pit row
    assert_eq!(pit.rows[0], vec!["key", "team", "kind", "notes"]);
    let matches = book.sheet("match").unwrap();
    assert_eq!(matches.rows[0], vec!["key", "team", "kind", "auto"]);
    assert_eq!(matches.data_rows().len(), 2);

    let again = dir.path().join("again.xlsx");
    let report = merge_file(FIRST_EXPORT, Some(&out), &again);
    assert_eq!(report.appended(), 0);
    assert_eq!(report.duplicates(), 4);
    assert_eq!(xlsx::read_workbook(&again).unwrap(), book);
}

#[test]
fn test_conflict_defaults_to_keeping_old_row() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("export.xlsx");
    merge_file(FIRST_EXPORT, None, &out);

    let changed = "key,team,kind,auto\n2024miket-qm1-111,111,match,9\n";
    let export = CsvExport::from_reader(changed.as_bytes()).unwrap();
    let mut book = xlsx::read_workbook(&out).unwrap();

    let mut asked = Vec::new();
    let mut policy = PromptConflicts::new(|c: &Conflict<'_>| {
        asked.push(c.key.to_string());
        None
    });
    let report = merge_export(&mut book, &export, &mut policy);
    drop(policy);

    assert_eq!(asked, vec!["2024miket-qm1-111"]);
    assert_eq!(report.conflicts(), 1);
    assert_eq!(report.replaced(), 0);
    match &report.events[0] {
        MergeEvent::Conflict { old, new, replaced, .. } => {
            assert_eq!(old[3], "4");
            assert_eq!(new[3], "9");
            assert!(!replaced);
        }
        other => panic!("unexpected event {:?}", other),
    }
    let matches = book.sheet("match").unwrap();
    assert_eq!(matches.rows[matches.find_key("2024miket-qm1-111").unwrap()][3], "4");
}
