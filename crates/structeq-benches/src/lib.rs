//! Benchmark corpora for `structeq`.
//!
//! Each [`Corpus`] pairs a document with a reordered copy of itself, so every
//! comparison the benchmarks run is expected to succeed. Small corpora embed
//! the integration-test fixtures; the generated ones scale the same shapes up.
//!
//! # Examples
//!
//! ```
//! let corpus = structeq_benches::available_corpora()
//!     .iter()
//!     .find(|c| c.name() == "countries-xml")
//!     .expect("registered corpus");
//! let dataset = corpus.load()?;
//! assert!(dataset.compare(&Default::default())?.is_match());
//! # Ok::<(), anyhow::Error>(())
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt::Write as _;

use anyhow::{ensure, Context, Result};
use serde_json::{json, Value};
use structeq_core::{
    compare_text, fingerprints, CompareError, CompareOptions, ComparisonReport, Fingerprint, Format,
};

const GENERATED_RECORDS: usize = 2_000;

macro_rules! fixture {
    ($path:literal) => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../structeq-core/tests/fixtures/",
            $path
        ))
    };
}

#[derive(Debug)]
enum Source {
    Embedded { before: &'static str, after: &'static str },
    GeneratedJson { records: usize },
    GeneratedXml { records: usize },
}

/// A named benchmark input.
#[derive(Debug)]
pub struct Corpus {
    name: &'static str,
    format: Format,
    query: Option<&'static str>,
    source: Source,
}

static CORPORA: [Corpus; 6] = [
    Corpus {
        name: "countries-xml",
        format: Format::Xml,
        query: Some("country"),
        source: Source::Embedded {
            before: fixture!("xml/countries.xml"),
            after: fixture!("xml/countries_reordered.xml"),
        },
    },
    Corpus {
        name: "stations-xml",
        format: Format::Xml,
        query: Some("stations"),
        source: Source::Embedded {
            before: fixture!("xml/stations.xml"),
            after: fixture!("xml/stations_reordered.xml"),
        },
    },
    Corpus {
        name: "groups-xml",
        format: Format::Xml,
        query: Some("group[@type='10']"),
        source: Source::Embedded {
            before: fixture!("xml/groups.xml"),
            after: fixture!("xml/groups.xml"),
        },
    },
    Corpus {
        name: "stations-json",
        format: Format::Json,
        query: Some("$..stations"),
        source: Source::Embedded {
            before: fixture!("json/three_stations.json"),
            after: fixture!("json/three_stations_reordered.json"),
        },
    },
    Corpus {
        name: "generated-json",
        format: Format::Json,
        query: Some("$.data.stations"),
        source: Source::GeneratedJson { records: GENERATED_RECORDS },
    },
    Corpus {
        name: "generated-xml",
        format: Format::Xml,
        query: Some("stations/station"),
        source: Source::GeneratedXml { records: GENERATED_RECORDS },
    },
];

/// Returns every registered corpus.
pub fn available_corpora() -> &'static [Corpus] {
    &CORPORA
}

impl Corpus {
    /// Stable identifier used as the benchmark parameter.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Syntax of both documents.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Materializes the documents and checks that they parse.
    pub fn load(&self) -> Result<Dataset> {
        let (before, after) = match self.source {
            Source::Embedded { before, after } => (before.to_owned(), after.to_owned()),
            Source::GeneratedJson { records } => generated_json(records)?,
            Source::GeneratedXml { records } => generated_xml(records),
        };
        let dataset = Dataset { format: self.format, query: self.query, before, after };
        let options = CompareOptions::default();
        for text in [&dataset.before, &dataset.after] {
            fingerprints(text, self.format, None, &options)
                .with_context(|| format!("corpus {} does not parse", self.name))?;
        }
        Ok(dataset)
    }
}

/// A loaded pair of documents.
#[derive(Clone, Debug)]
pub struct Dataset {
    format: Format,
    query: Option<&'static str>,
    before: String,
    after: String,
}

impl Dataset {
    /// The original document.
    pub fn before(&self) -> &str {
        &self.before
    }

    /// The reordered document.
    pub fn after(&self) -> &str {
        &self.after
    }

    /// Path expression selecting the corpus' repeated subtrees.
    pub fn query(&self) -> Option<&'static str> {
        self.query
    }

    /// Combined size of both documents in bytes.
    pub fn bytes(&self) -> usize {
        self.before.len() + self.after.len()
    }

    /// Whole-document comparison of `before` against `after`.
    pub fn compare(&self, options: &CompareOptions) -> Result<ComparisonReport, CompareError> {
        compare_text(&self.before, &self.after, self.format, None, options)
    }

    /// Scoped comparison using the corpus query.
    pub fn compare_scoped(
        &self,
        options: &CompareOptions,
    ) -> Result<ComparisonReport, CompareError> {
        compare_text(&self.before, &self.after, self.format, self.query, options)
    }

    /// Fingerprints every subtree the query selects from `before`.
    pub fn fingerprint_selection(
        &self,
        options: &CompareOptions,
    ) -> Result<Vec<Fingerprint>, CompareError> {
        fingerprints(&self.before, self.format, self.query, options)
    }
}

fn station(index: usize) -> Value {
    json!({
        "id": format!("{index:08x}-44e0-11ef-b069-3c7c3fbc6d25"),
        "name": format!("{index:08x}"),
        "last_seen_time": index * 7,
        "os": index % 3,
        "os_name": if index % 2 == 0 { "linux" } else { "unknown" },
    })
}

fn generated_json(records: usize) -> Result<(String, String)> {
    ensure!(records > 0, "generated corpus needs at least one record");
    let stations: Vec<Value> = (0..records).map(station).collect();
    let reversed: Vec<Value> = stations.iter().rev().cloned().collect();
    let document = |stations: Vec<Value>| {
        json!({
            "head": {"status": true, "api": {"version": 40302}},
            "data": {"pages": {"total": records}, "stations": stations},
        })
    };
    let before = serde_json::to_string_pretty(&document(stations))?;
    let after = serde_json::to_string(&document(reversed))?;
    Ok((before, after))
}

fn generated_xml(records: usize) -> (String, String) {
    let render = |order: &mut dyn Iterator<Item = usize>| {
        let mut out = String::from(r#"<?xml version="1.0"?><api status="true"><stations>"#);
        for index in order {
            let _ = write!(
                out,
                r#"<station id="{index:08x}" os="{}" name="n{index}"><seen>{}</seen></station>"#,
                index % 3,
                index * 7,
            );
        }
        out.push_str("</stations></api>");
        out
    };
    (render(&mut (0..records)), render(&mut (0..records).rev()))
}
