use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use course_requirement_parser::{CourseCode, CourseInfo, CourseLookup, InvalidCourseCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// One course record, as written out by the scraper.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueEntry {
    pub code: CourseCode,
    pub name: String,
    pub units: Option<f64>,
    /// Free text; empty when the course has no prerequisites.
    pub prerequisites: String,
}

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {origin}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid course code in {origin}")]
    InvalidCode {
        origin: String,
        #[source]
        source: InvalidCourseCode,
    },
    #[error("{origin}: entry {key} describes {code}")]
    MismatchedCode {
        origin: String,
        key: String,
        code: String,
    },
}

// Unit values are scraped text ("2") in older dumps and numbers in newer ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawUnits {
    Number(f64),
    Text(String),
}

impl RawUnits {
    fn value(&self) -> Option<f64> {
        match self {
            RawUnits::Number(units) => Some(*units),
            RawUnits::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    course_code: Option<String>,
    #[serde(default)]
    course_name: String,
    #[serde(default)]
    units: Option<RawUnits>,
    #[serde(default)]
    prerequisites: String,
}

impl RawEntry {
    fn into_entry(self, key: &str, origin: &str) -> Result<CatalogueEntry, CatalogueError> {
        let code = match self.course_code {
            Some(code) if code != key => {
                return Err(CatalogueError::MismatchedCode {
                    origin: origin.to_owned(),
                    key: key.to_owned(),
                    code,
                })
            }
            Some(code) => code,
            None => key.to_owned(),
        };
        let code = CourseCode::try_from(code).map_err(|source| CatalogueError::InvalidCode {
            origin: origin.to_owned(),
            source,
        })?;
        Ok(CatalogueEntry {
            code,
            name: self.course_name,
            units: self.units.as_ref().and_then(RawUnits::value),
            prerequisites: self.prerequisites,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    entries: BTreeMap<CourseCode, CatalogueEntry>,
}

impl Catalogue {
    pub fn new() -> Catalogue {
        Catalogue::default()
    }

    /// Replaces and returns any entry with the same code.
    pub fn insert(&mut self, entry: CatalogueEntry) -> Option<CatalogueEntry> {
        self.entries.insert(entry.code.clone(), entry)
    }

    pub fn get(&self, code: &str) -> Option<&CatalogueEntry> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by course code.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogueEntry> {
        self.entries.values()
    }

    /// Parses a JSON object keyed by course code.
    pub fn from_json_str(json: &str) -> Result<Catalogue, CatalogueError> {
        Catalogue::from_keyed_json(json, "catalogue")
    }

    /// Loads either a JSON object keyed by course code, or a directory holding
    /// one `<CODE>.json` record per course.
    pub fn load(path: &Path) -> Result<Catalogue, CatalogueError> {
        let io_error = |source: io::Error| CatalogueError::Io {
            path: path.to_owned(),
            source,
        };
        if !path.is_dir() {
            let json = fs::read_to_string(path).map_err(io_error)?;
            return Catalogue::from_keyed_json(&json, &path.display().to_string());
        }

        let mut catalogue = Catalogue::new();
        for dir_entry in fs::read_dir(path).map_err(io_error)? {
            let file = dir_entry.map_err(io_error)?.path();
            let is_json = file
                .extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
            let Some(stem) = file.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_json || !file.is_file() {
                continue;
            }
            let origin = file.display().to_string();
            let json = fs::read_to_string(&file).map_err(|source| CatalogueError::Io {
                path: file.clone(),
                source,
            })?;
            let raw: RawEntry = serde_json::from_str(&json).map_err(|source| {
                CatalogueError::Json {
                    origin: origin.clone(),
                    source,
                }
            })?;
            catalogue.insert(raw.into_entry(&stem.to_uppercase(), &origin)?);
        }
        debug!(courses = catalogue.len(), path = %path.display(), "loaded catalogue directory");
        Ok(catalogue)
    }

    fn from_keyed_json(json: &str, origin: &str) -> Result<Catalogue, CatalogueError> {
        let raw: BTreeMap<String, RawEntry> =
            serde_json::from_str(json).map_err(|source| CatalogueError::Json {
                origin: origin.to_owned(),
                source,
            })?;
        let mut catalogue = Catalogue::new();
        for (key, entry) in raw {
            catalogue.insert(entry.into_entry(&key, origin)?);
        }
        debug!(courses = catalogue.len(), origin, "loaded catalogue");
        Ok(catalogue)
    }
}

impl CourseLookup for Catalogue {
    fn lookup(&self, code: &CourseCode) -> Option<CourseInfo> {
        self.entries.get(code).map(|entry| CourseInfo {
            units: entry.units,
            name: entry.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_requirement_parser::{parse_requirement, verify};
    use expect_test::expect;
    use std::env;
    use std::process;

    const CATALOGUE: &str = r##"{
        "MATH1061": {
            "course_name": "Discrete Mathematics",
            "units": "2",
            "prerequisites": "",
            "faculty": "Science"
        },
        "MATH1062": {
            "course_code": "MATH1062",
            "course_name": "Mathematical Foundations",
            "units": 2,
            "prerequisites": "MATH1061"
        },
        "STAT1201": {
            "course_name": "Analysis of Scientific Data",
            "units": "#"
        }
    }"##;

    #[test]
    fn load_keyed_json() {
        let catalogue = Catalogue::from_json_str(CATALOGUE).unwrap();
        assert_eq!(catalogue.len(), 3);
        let entry = catalogue.get("MATH1062").unwrap();
        assert_eq!(entry.units, Some(2.0));
        assert_eq!(entry.prerequisites, "MATH1061");
        assert_eq!(catalogue.get("MATH1061").unwrap().units, Some(2.0));
        assert_eq!(catalogue.get("STAT1201").unwrap().units, None);
    }

    #[test]
    fn lookup_serves_verification() {
        let catalogue = Catalogue::from_json_str(CATALOGUE).unwrap();
        let requirement = parse_requirement("MATH1061 and (STAT1201 or MATH2000)").unwrap();
        let verification = verify(&requirement, &catalogue).unwrap();
        let unknown: Vec<&str> = verification
            .unknown_courses
            .iter()
            .map(CourseCode::as_str)
            .collect();
        assert_eq!(unknown, ["MATH2000"]);
        expect![[r#"
            And:
              CourseRef(MATH1061, 2, "Discrete Mathematics")
              Or:
                CourseRef(STAT1201, None, "Analysis of Scientific Data")
                CourseRef(MATH2000, None, None)"#]]
        .assert_eq(&course_requirement_parser::render(&verification.requirement));
    }

    #[test]
    fn reject_bad_codes() {
        let error = Catalogue::from_json_str(r#"{"math1061": {}}"#).unwrap_err();
        expect![[r#"invalid course code in catalogue"#]].assert_eq(&error.to_string());

        let error =
            Catalogue::from_json_str(r#"{"MATH1061": {"course_code": "MATH1062"}}"#).unwrap_err();
        expect!["catalogue: entry MATH1061 describes MATH1062"].assert_eq(&error.to_string());
    }

    #[test]
    fn load_directory_of_records() {
        let dir = env::temp_dir().join(format!("catalogue-test-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("math1061.json"),
            r#"{"course_code": "MATH1061", "course_name": "Discrete Mathematics", "units": "2"}"#,
        )
        .unwrap();
        fs::write(
            dir.join("PHYS1001.json"),
            r#"{"course_name": "Mechanics", "prerequisites": "MATH1061"}"#,
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "not a course").unwrap();

        let catalogue = Catalogue::load(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let codes: Vec<&str> = catalogue.entries().map(|entry| entry.code.as_str()).collect();
        assert_eq!(codes, ["MATH1061", "PHYS1001"]);
        assert_eq!(catalogue.get("PHYS1001").unwrap().prerequisites, "MATH1061");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = Catalogue::load(Path::new("/nonexistent/catalogue.json")).unwrap_err();
        assert!(matches!(error, CatalogueError::Io { .. }), "{error}");
    }
}
