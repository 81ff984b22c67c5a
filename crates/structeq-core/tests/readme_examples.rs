use structeq_core::{compare_json, compare_text, compare_xml, CompareOptions, Format};

#[test]
fn structeq_core_readme_example() -> Result<(), Box<dyn std::error::Error>> {
    let a = r#"{"stations": {"regular": [1, 2], "virtual": []}}"#;
    let b = r#"{"stations": {"virtual": [], "regular": [2, 1]}}"#;
    assert!(compare_json(a, b, None)?);

    let part = r#"<data><country name="Panama"/></data>"#;
    let full = r#"<data><country name="Chile"/><country name="Panama"/></data>"#;
    assert!(compare_xml(part, full, Some("country"))?);

    let opts = CompareOptions::default();
    let report = compare_text(full, part, Format::Xml, Some("country"), &opts)?;
    println!("{}", serde_json::to_string(&report)?);
    assert_eq!(report.missing().len(), 1);
    Ok(())
}
