use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::error::AgentError;

/// Which vendor report the pipeline should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Performance,
    TestAnalysis,
}

impl ReportKind {
    /// Form value → kind, defaulting to the performance report like the UI.
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("test_analysis") => ReportKind::TestAnalysis,
            _ => ReportKind::Performance,
        }
    }
}

/// Which query string seeds the output filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameChoice {
    Course,
    Test,
}

impl FilenameChoice {
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("course") => FilenameChoice::Course,
            _ => FilenameChoice::Test,
        }
    }
}

/// Validated parameters of one automation run. Transient, never persisted.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub url: String,
    pub username: String,
    pub password: String,
    pub kind: ReportKind,
    pub filename_choice: FilenameChoice,
    pub course: String,
    pub module: String,
    pub test: String,
    pub campus: String,
    pub batch: String,
}

impl ReportRequest {
    /// The sanitized string that seeds the output filename, per the user's
    /// naming choice. None when the chosen query string is empty, in which
    /// case the vendor's suggested name is used instead.
    pub fn filename_seed(&self) -> Option<String> {
        let source = match self.filename_choice {
            FilenameChoice::Course => &self.course,
            FilenameChoice::Test => &self.test,
        };
        let trimmed = source.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(sanitize_name(trimmed))
        }
    }
}

/// Raw `POST /open` form. Every field is optional at the wire level;
/// validation decides what is actually required.
#[derive(Debug, Default, Deserialize)]
pub struct OpenForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub filename_choice: Option<String>,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub test: String,
    #[serde(default)]
    pub campus: String,
    #[serde(default)]
    pub batch: String,
}

/// What a valid `/open` submission asks for.
#[derive(Debug)]
pub enum OpenAction {
    /// No credentials supplied: just open the URL in a local browser.
    BrowserOnly(String),
    /// Full automation run.
    Automate(ReportRequest),
}

impl OpenForm {
    /// Validate the form. Returns the user-visible error message on failure,
    /// which the façade flashes back verbatim.
    pub fn into_action(self) -> Result<OpenAction, String> {
        let url = match normalize_url(&self.url) {
            Ok(url) => url,
            Err(_) => return Err("Please enter a valid URL.".to_string()),
        };

        let username = self.username.trim().to_string();
        let password = self.password.trim().to_string();

        // Without credentials there is nothing to automate; fall back to a
        // plain local browser-open of the URL.
        if username.is_empty() && password.is_empty() {
            return Ok(OpenAction::BrowserOnly(url));
        }

        let kind = ReportKind::from_form(self.report_type.as_deref());
        let filename_choice = FilenameChoice::from_form(self.filename_choice.as_deref());

        let course = self.course.trim().to_string();
        let module = self.module.trim().to_string();
        let test = self.test.trim().to_string();
        let campus = self.campus.trim().to_string();
        let batch = self.batch.trim().to_string();

        let mut missing: Vec<&str> = Vec::new();
        if username.is_empty() {
            missing.push("User ID");
        }
        if password.is_empty() {
            missing.push("Password");
        }
        match kind {
            ReportKind::TestAnalysis => {
                if campus.is_empty() {
                    missing.push("Campus");
                }
                if batch.is_empty() {
                    missing.push("Batch");
                }
                if course.is_empty() {
                    missing.push("Course name");
                }
                if test.is_empty() {
                    missing.push("Test name");
                }
            }
            ReportKind::Performance => {
                if course.is_empty() {
                    missing.push("Course name");
                }
                if module.is_empty() {
                    missing.push("Module name");
                }
                if test.is_empty() {
                    missing.push("Test name");
                }
            }
        }

        if !missing.is_empty() {
            return Err(format!(
                "Please provide the following required fields: {}.",
                missing.join(", ")
            ));
        }

        Ok(OpenAction::Automate(ReportRequest {
            url,
            username,
            password,
            kind,
            filename_choice,
            course,
            // Module is not used by the test-analysis flow.
            module: match kind {
                ReportKind::Performance => module,
                ReportKind::TestAnalysis => String::new(),
            },
            test,
            campus,
            batch,
        }))
    }
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap())
}

/// Canonicalize a user-supplied URL. Trims, prefixes `https://` when no
/// scheme is present, and rejects strings with no `.` anywhere (a crude
/// "looks like a hostname" check). Pure function.
pub fn normalize_url(raw: &str) -> Result<String, AgentError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AgentError::InvalidInput("URL is empty".to_string()));
    }
    let candidate = if scheme_re().is_match(text) {
        text.to_string()
    } else {
        format!("https://{text}")
    };
    if !candidate.contains('.') {
        return Err(AgentError::InvalidInput(format!(
            "URL does not look like a hostname: {candidate}"
        )));
    }
    Ok(candidate)
}

fn invalid_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap())
}

fn underscore_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").unwrap())
}

/// Make a string safe for use as a filename stem: every character outside
/// `[A-Za-z0-9._-]` becomes `_`, runs of `_` collapse, leading/trailing `_`
/// are trimmed. All-invalid input falls back to `report`.
pub fn sanitize_name(raw: &str) -> String {
    let replaced = invalid_chars_re().replace_all(raw.trim(), "_");
    let collapsed = underscore_runs_re().replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- normalize_url ---

    #[test]
    fn test_normalize_prefixes_https_when_scheme_missing() {
        assert_eq!(
            normalize_url("dashboard.example.com/login").unwrap(),
            "https://dashboard.example.com/login"
        );
    }

    #[test]
    fn test_normalize_keeps_existing_scheme() {
        assert_eq!(
            normalize_url("http://portal.example.com").unwrap(),
            "http://portal.example.com"
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(
            normalize_url("  example.com  ").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalize_url("   "),
            Err(AgentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_no_dot() {
        assert!(normalize_url("localhost").is_err());
        assert!(normalize_url("https://intranet").is_err());
    }

    #[test]
    fn test_normalize_leaves_rest_unmodified() {
        let raw = "portal.example.com/path?q=a%20b";
        assert_eq!(
            normalize_url(raw).unwrap(),
            format!("https://{raw}")
        );
    }

    // --- sanitize_name ---

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_name("Weekly Test #3"), "Weekly_Test_3");
    }

    #[test]
    fn test_sanitize_collapses_underscore_runs() {
        assert_eq!(sanitize_name("a _ b"), "a_b");
        assert_eq!(sanitize_name("a__b"), "a_b");
    }

    #[test]
    fn test_sanitize_trims_edge_underscores() {
        assert_eq!(sanitize_name("  !Physics 101!  "), "Physics_101");
    }

    #[test]
    fn test_sanitize_keeps_allowed_punctuation() {
        assert_eq!(sanitize_name("v1.2_final-copy"), "v1.2_final-copy");
    }

    #[test]
    fn test_sanitize_all_invalid_falls_back_to_report() {
        assert_eq!(sanitize_name("@#$%"), "report");
    }

    // --- form validation ---

    fn performance_form() -> OpenForm {
        OpenForm {
            url: "portal.example.com".into(),
            username: "teacher@example.com".into(),
            password: "secret".into(),
            report_type: Some("performance".into()),
            filename_choice: Some("test".into()),
            course: "Physics".into(),
            module: "Waves".into(),
            test: "Midterm".into(),
            ..OpenForm::default()
        }
    }

    #[test]
    fn test_valid_performance_form() {
        let action = performance_form().into_action().unwrap();
        match action {
            OpenAction::Automate(req) => {
                assert_eq!(req.url, "https://portal.example.com");
                assert_eq!(req.kind, ReportKind::Performance);
                assert_eq!(req.filename_choice, FilenameChoice::Test);
            }
            other => panic!("expected Automate, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_url_rejected_before_field_checks() {
        let form = OpenForm {
            url: "nodots".into(),
            ..OpenForm::default()
        };
        assert_eq!(form.into_action().unwrap_err(), "Please enter a valid URL.");
    }

    #[test]
    fn test_no_credentials_falls_back_to_browser_open() {
        let form = OpenForm {
            url: "portal.example.com".into(),
            ..OpenForm::default()
        };
        match form.into_action().unwrap() {
            OpenAction::BrowserOnly(url) => assert_eq!(url, "https://portal.example.com"),
            other => panic!("expected BrowserOnly, got {other:?}"),
        }
    }

    #[test]
    fn test_performance_missing_fields_listed() {
        let mut form = performance_form();
        form.module = String::new();
        form.test = String::new();
        let err = form.into_action().unwrap_err();
        assert_eq!(
            err,
            "Please provide the following required fields: Module name, Test name."
        );
    }

    #[test]
    fn test_test_analysis_missing_batch_listed() {
        let form = OpenForm {
            url: "portal.example.com".into(),
            username: "teacher@example.com".into(),
            password: "secret".into(),
            report_type: Some("test_analysis".into()),
            campus: "North".into(),
            batch: String::new(),
            course: "Physics".into(),
            test: "Midterm".into(),
            ..OpenForm::default()
        };
        let err = form.into_action().unwrap_err();
        assert_eq!(err, "Please provide the following required fields: Batch.");
    }

    #[test]
    fn test_partial_credentials_reported_missing() {
        let mut form = performance_form();
        form.password = String::new();
        let err = form.into_action().unwrap_err();
        assert!(err.contains("Password"), "got: {err}");
    }

    #[test]
    fn test_unknown_report_type_defaults_to_performance() {
        assert_eq!(ReportKind::from_form(Some("bogus")), ReportKind::Performance);
        assert_eq!(ReportKind::from_form(None), ReportKind::Performance);
        assert_eq!(
            ReportKind::from_form(Some("test_analysis")),
            ReportKind::TestAnalysis
        );
    }

    #[test]
    fn test_filename_seed_follows_choice() {
        let mut req = match performance_form().into_action().unwrap() {
            OpenAction::Automate(req) => req,
            _ => unreachable!(),
        };
        assert_eq!(req.filename_seed().as_deref(), Some("Midterm"));
        req.filename_choice = FilenameChoice::Course;
        assert_eq!(req.filename_seed().as_deref(), Some("Physics"));
        req.course = String::new();
        assert_eq!(req.filename_seed(), None);
    }
}
