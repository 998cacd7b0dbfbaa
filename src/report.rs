use std::fmt;

use catalogue::{Catalogue, PrerequisiteGraph};
use course_requirement_parser::{parse_requirement, verify, VerificationError};
use serde::Serialize;
use tracing::trace;

/// Outcome of a batch run. Only failing items are kept; everything else is
/// counted.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub total: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub label: String,
    pub input: String,
    #[serde(flatten)]
    pub kind: FailureKind,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FailureKind {
    ParseError {
        offset: usize,
        expected: String,
        message: String,
    },
    Unverified {
        unknown_courses: Vec<String>,
        warnings: Vec<String>,
    },
}

impl Report {
    pub fn passed(&self) -> bool {
        self.failed == 0 && self.cycles.is_empty()
    }

    fn check(
        &mut self,
        label: String,
        input: &str,
        catalogue: Option<&Catalogue>,
    ) -> Result<(), VerificationError> {
        trace!(%label, "checking prerequisites");
        self.total += 1;
        let kind = match parse_requirement(input) {
            Err(error) => FailureKind::ParseError {
                offset: error.offset,
                expected: error.expected.to_string(),
                message: error.message,
            },
            Ok(requirement) => {
                let Some(catalogue) = catalogue else {
                    return Ok(());
                };
                let verification = verify(&requirement, catalogue)?;
                if verification.ok() {
                    return Ok(());
                }
                FailureKind::Unverified {
                    unknown_courses: verification
                        .unknown_courses
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                    warnings: verification
                        .warnings
                        .iter()
                        .filter(|warning| warning.is_blocking())
                        .map(ToString::to_string)
                        .collect(),
                }
            }
        };
        self.failed += 1;
        self.failures.push(Failure {
            label,
            input: input.to_owned(),
            kind,
        });
        Ok(())
    }
}

/// One prerequisite expression per line; blank lines are skipped.
pub fn check_lines(text: &str, catalogue: Option<&Catalogue>) -> Result<Report, VerificationError> {
    let mut report = Report::default();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.check(format!("line {}", i + 1), line, catalogue)?;
    }
    Ok(report)
}

/// Checks every course's prerequisites against the catalogue they came from.
pub fn check_catalogue(catalogue: &Catalogue) -> Result<Report, VerificationError> {
    let mut report = Report::default();
    for entry in catalogue.entries() {
        let prerequisites = entry.prerequisites.trim();
        if prerequisites.is_empty() {
            continue;
        }
        report.check(entry.code.to_string(), prerequisites, Some(catalogue))?;
    }
    report.cycles = PrerequisiteGraph::build(catalogue)
        .cycles()
        .into_iter()
        .map(|cycle| cycle.into_iter().map(ToString::to_string).collect())
        .collect();
    Ok(report)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.failures {
            writeln!(f, "## failed {}: {}", failure.label, failure.input)?;
            match &failure.kind {
                FailureKind::ParseError { message, .. } => writeln!(f, "{message}")?,
                FailureKind::Unverified {
                    unknown_courses,
                    warnings,
                } => {
                    if !unknown_courses.is_empty() {
                        writeln!(f, "unknown courses: {}", unknown_courses.join(", "))?;
                    }
                    for warning in warnings {
                        writeln!(f, "{warning}")?;
                    }
                }
            }
            writeln!(f)?;
        }
        for cycle in &self.cycles {
            writeln!(f, "## prerequisite cycle: {}", cycle.join(", "))?;
        }
        if !self.cycles.is_empty() {
            writeln!(f)?;
        }
        write!(f, "failed: {} / {}", self.failed, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn check_lines_without_catalogue() {
        let report = check_lines("MATH1061 or MATH1062\n\nMATH1061 and\n", None).unwrap();
        assert!(!report.passed());
        expect![[r#"
            ## failed line 3: MATH1061 and
            expected course_code at offset 12

            failed: 1 / 2"#]]
        .assert_eq(&report.to_string());
    }

    #[test]
    fn check_lines_against_catalogue() {
        let catalogue = Catalogue::from_json_str(
            r#"{"MATH1061": {"course_name": "Discrete Mathematics", "units": "2"}}"#,
        )
        .unwrap();
        let text = "MATH1061 or MATH1062\n\
                    \n\
                    MATH1061 and\n\
                    (MATH1061\n\
                    STAT1201, MATH1061\n\
                    MATH1061\n";
        let report = check_lines(text, Some(&catalogue)).unwrap();
        expect![[r#"
            ## failed line 1: MATH1061 or MATH1062
            unknown courses: MATH1062

            ## failed line 3: MATH1061 and
            expected course_code at offset 12

            ## failed line 4: (MATH1061
            expected ')' at offset 9

            ## failed line 5: STAT1201, MATH1061
            unknown courses: STAT1201

            failed: 4 / 5"#]]
        .assert_eq(&report.to_string());
    }

    #[test]
    fn check_whole_catalogue() {
        let catalogue = Catalogue::from_json_str(
            r#"{
                "MATH1061": {"course_name": "Discrete Mathematics", "units": "2", "prerequisites": ""},
                "MATH1062": {"units": "2", "prerequisites": "MATH1061 or MATH1051"},
                "PHYS2001": {"prerequisites": "PHYS2002"},
                "PHYS2002": {"prerequisites": "PHYS2001"},
                "STAT1201": {"prerequisites": "MATH1061 and"}
            }"#,
        )
        .unwrap();
        let report = check_catalogue(&catalogue).unwrap();
        expect![[r#"
            ## failed MATH1062: MATH1061 or MATH1051
            unknown courses: MATH1051

            ## failed STAT1201: MATH1061 and
            expected course_code at offset 12

            ## prerequisite cycle: PHYS2001, PHYS2002

            failed: 2 / 4"#]]
        .assert_eq(&report.to_string());
        expect![[r#"{"label":"STAT1201","input":"MATH1061 and","status":"parse_error","offset":12,"expected":"course_code","message":"expected course_code at offset 12"}"#]]
            .assert_eq(&serde_json::to_string(&report.failures[1]).unwrap());
    }
}
