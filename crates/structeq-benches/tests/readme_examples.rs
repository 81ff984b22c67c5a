use structeq_benches::available_corpora;
use structeq_core::CompareOptions;

#[test]
fn structeq_benches_readme_example() -> Result<(), Box<dyn std::error::Error>> {
    let corpus = available_corpora()
        .iter()
        .find(|c| c.name() == "stations-json")
        .expect("registered corpus");
    let dataset = corpus.load()?;
    let report = dataset.compare_scoped(&CompareOptions::default())?;
    assert!(report.is_match());

    println!("{:?}", dataset.query());
    assert_eq!(report.left().len(), 3);
    Ok(())
}
