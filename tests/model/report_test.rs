//! Integration tests for report definition editing.

use quarry::engine::ReportError;
use quarry::model::{Column, Direction, ReportDefinition, ReportId};

fn contacts() -> ReportDefinition {
    ReportDefinition::new("Contacts", "Contact")
        .with_column(Column::regular("first_name", "First name"))
        .with_column(Column::regular("last_name", "Last name"))
        .with_column(Column::regular("employer", "Employer"))
}

fn titles(report: &ReportDefinition) -> Vec<(u32, &str)> {
    report
        .columns()
        .iter()
        .map(|c| (c.order, c.title.as_str()))
        .collect()
}

#[test]
fn test_add_column_appends() {
    let mut report = contacts();
    let order = report.add_column(Column::function("full_name", "Full name"));

    assert_eq!(order, 4);
    assert_eq!(report.column(4).map(|c| c.name.as_str()), Some("full_name"));
}

#[test]
fn test_remove_column_renumbers() {
    let mut report = contacts();
    let removed = report.remove_column(1).unwrap();

    assert_eq!(removed.name, "first_name");
    assert_eq!(titles(&report), vec![(1, "Last name"), (2, "Employer")]);
}

#[test]
fn test_remove_unknown_column() {
    let mut report = contacts();
    report.id = ReportId(5);

    assert_eq!(
        report.remove_column(9),
        Err(ReportError::UnknownColumn {
            report: ReportId(5),
            order: 9
        })
    );
}

#[test]
fn test_move_column() {
    let mut report = contacts();
    report.move_column(3, Direction::Up).unwrap();
    assert_eq!(
        titles(&report),
        vec![(1, "First name"), (2, "Employer"), (3, "Last name")]
    );

    report.move_column(1, Direction::Down).unwrap();
    assert_eq!(
        titles(&report),
        vec![(1, "Employer"), (2, "First name"), (3, "Last name")]
    );
}

#[test]
fn test_move_column_past_either_end() {
    let mut report = contacts();

    let err = report.move_column(1, Direction::Up).unwrap_err();
    assert_eq!(err.to_string(), "Column at position 1 cannot move up");
    assert!(report.move_column(3, Direction::Down).is_err());
    assert_eq!(titles(&report)[0], (1, "First name"));
}

#[test]
fn test_set_selected_requires_link() {
    let mut report = contacts();

    assert_eq!(
        report.set_selected(3, true),
        Err(ReportError::NotLinked {
            column: "employer".to_string()
        })
    );
}

#[test]
fn test_sub_reports_skip_path_columns() {
    let mut linked = Column::regular("employer", "Employer");
    linked.sub_report = Some(ReportId(2));
    let mut path = Column::regular("employer__name", "Employer name");
    path.sub_report = Some(ReportId(3));

    let report = ReportDefinition::new("Contacts", "Contact")
        .with_column(linked)
        .with_column(path);

    assert_eq!(report.sub_reports().collect::<Vec<_>>(), vec![ReportId(2)]);
}

#[test]
fn test_report_json_shape() {
    let mut column = Column::relation("employs", "Employees");
    column.sub_report = Some(ReportId(2));
    column.selected = true;
    let report = ReportDefinition::new("Organisations", "Organisation")
        .with_filter("wealthy")
        .with_column(column);

    let json = serde_json::to_string(&report).unwrap();
    insta::assert_snapshot!(json, @r#"{"id":0,"name":"Organisations","entity_kind":"Organisation","filter":"wealthy","columns":[{"name":"employs","title":"Employees","order":1,"kind":"relation","selected":true,"sub_report":2}],"owner":null,"is_private":false}"#);

    let back: ReportDefinition = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}
