use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const COURSE_CODE_REGEX: &str = r"^[A-Z]{3,5}[0-9]{3,4}[A-Z]?";

// A keyword at the very end of the input still counts, so that a dangling
// connective is reported as a missing course rather than as trailing text.
const AND_REGEX: &str = r"^\s+(?:and|&|\+)(?:\s+|$)";
const OR_REGEX: &str = r"^\s+(?:or|\|)(?:\s+|$)";
const SEPARATOR_REGEX: &str = r"^\s*[,;]\s*";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Connective {
    And,
    Or,
    Separator,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => write!(f, "'and'"),
            Connective::Or => write!(f, "'or'"),
            Connective::Separator => write!(f, "','"),
        }
    }
}

fn get_course_code_regex() -> &'static Regex {
    static STATIC: OnceLock<Regex> = OnceLock::new();
    STATIC.get_or_init(|| Regex::new(COURSE_CODE_REGEX).unwrap())
}

fn get_connective_regexes() -> &'static [Regex; 3] {
    static STATIC: OnceLock<[Regex; 3]> = OnceLock::new();
    STATIC.get_or_init(|| {
        [AND_REGEX, OR_REGEX, SEPARATOR_REGEX].map(|expr| Regex::new(expr).unwrap())
    })
}

/// Length of the course code at the start of `s`.
pub(crate) fn course_code_len(s: &str) -> Option<usize> {
    get_course_code_regex().find(s).map(|m| m.end())
}

pub fn is_course_code(s: &str) -> bool {
    course_code_len(s) == Some(s.len())
}

/// Length of `connective` at the start of `s`, including the whitespace
/// around it.
pub(crate) fn connective_len(s: &str, connective: Connective) -> Option<usize> {
    let [and, or, separator] = get_connective_regexes();
    let regex = match connective {
        Connective::And => and,
        Connective::Or => or,
        Connective::Separator => separator,
    };
    regex.find(s).map(|m| m.end())
}

pub(crate) fn leading_connective(s: &str) -> Option<Connective> {
    [Connective::And, Connective::Or, Connective::Separator]
        .into_iter()
        .find(|&connective| connective_len(s, connective).is_some())
}

/// Whether `s` starts with an `and` or `or` keyword (or one of their symbols).
pub(crate) fn at_keyword(s: &str) -> bool {
    matches!(leading_connective(s), Some(Connective::And | Connective::Or))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_code_prefix() {
        assert_eq!(course_code_len("MATH1061 or MATH1062"), Some(8));
        assert_eq!(course_code_len("CHEM1100A)"), Some(9));
        assert_eq!(course_code_len("MATH10612"), Some(8));
        assert_eq!(course_code_len(" MATH1061"), None);
        assert_eq!(course_code_len("Math1061"), None);
    }

    #[test]
    fn connectives_need_whitespace_around_keywords() {
        assert_eq!(connective_len(" and MATH1062", Connective::And), Some(5));
        assert_eq!(connective_len(" & MATH1062", Connective::And), Some(3));
        assert_eq!(connective_len(" + MATH1062", Connective::And), Some(3));
        assert_eq!(connective_len(" and", Connective::And), Some(4));
        assert_eq!(connective_len(" andrew", Connective::And), None);
        assert_eq!(connective_len("and MATH1062", Connective::And), None);
        assert_eq!(connective_len("  or  MATH1062", Connective::Or), Some(6));
        assert_eq!(connective_len(" | MATH1062", Connective::Or), Some(3));
        assert_eq!(connective_len(" ordinary", Connective::Or), None);
    }

    #[test]
    fn separators_allow_optional_whitespace() {
        assert_eq!(connective_len(",MATH1062", Connective::Separator), Some(1));
        assert_eq!(connective_len(" ; MATH1062", Connective::Separator), Some(3));
        assert_eq!(leading_connective(", MATH1062"), Some(Connective::Separator));
        assert_eq!(leading_connective(" or MATH1062"), Some(Connective::Or));
        assert_eq!(leading_connective(")"), None);
        assert!(at_keyword(" & MATH1062"));
        assert!(!at_keyword(", MATH1062"));
    }
}
