//! Read-only view of the Playwright JSON reporter output.
//!
//! Only the fields the correlator needs are modelled; everything is optional
//! so reports from older or newer runner versions still parse.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunnerReport {
    pub suites: Vec<ReportSuite>,
    /// Errors outside any test, e.g. a syntax error in the spec file
    pub errors: Vec<ReportError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportSuite {
    pub title: String,
    pub specs: Vec<ReportSpec>,
    pub suites: Vec<ReportSuite>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportSpec {
    pub title: String,
    pub tests: Vec<ReportTest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportTest {
    pub results: Vec<ReportResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportResult {
    pub status: String,
    pub duration: Option<f64>,
    pub error: Option<ReportError>,
    pub errors: Vec<ReportError>,
    pub attachments: Vec<ReportAttachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportError {
    pub message: Option<String>,
    pub stack: Option<String>,
    pub value: Option<String>,
}

impl ReportError {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.value.as_deref())
            .or(self.stack.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportAttachment {
    pub name: String,
    pub content_type: String,
    pub path: Option<String>,
    pub body: Option<String>,
}

impl RunnerReport {
    /// Every spec whose title equals `title`, in document order
    pub fn find_specs<'a>(&'a self, title: &str) -> Vec<&'a ReportSpec> {
        let mut found = Vec::new();
        for suite in &self.suites {
            suite.collect_specs(title, &mut found);
        }
        found
    }

    /// All spec titles present, in document order
    pub fn spec_titles(&self) -> Vec<String> {
        let mut titles = Vec::new();
        for suite in &self.suites {
            suite.collect_titles(&mut titles);
        }
        titles
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter_map(|e| e.text().map(str::to_string))
            .collect()
    }
}

impl ReportSuite {
    fn collect_specs<'a>(&'a self, title: &str, found: &mut Vec<&'a ReportSpec>) {
        found.extend(self.specs.iter().filter(|spec| spec.title == title));
        for child in &self.suites {
            child.collect_specs(title, found);
        }
    }

    fn collect_titles(&self, titles: &mut Vec<String>) {
        titles.extend(self.specs.iter().map(|spec| spec.title.clone()));
        for child in &self.suites {
            child.collect_titles(titles);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
  "config": { "version": "1.40.0" },
  "suites": [
    {
      "title": "scenario.spec.js",
      "file": "scenario.spec.js",
      "specs": [ { "title": "top", "ok": true, "tests": [] } ],
      "suites": [
        {
          "title": "group",
          "specs": [ { "title": "inner", "ok": false, "tests": [] } ],
          "suites": [
            { "title": "deeper", "specs": [ { "title": "innermost", "tests": [] } ] }
          ]
        }
      ]
    }
  ],
  "errors": [],
  "stats": { "expected": 1 }
}"#;

    #[test]
    fn test_nested_traversal() {
        let report: RunnerReport = serde_json::from_str(NESTED).unwrap();
        assert_eq!(report.spec_titles(), vec!["top", "inner", "innermost"]);
        assert_eq!(report.find_specs("innermost").len(), 1);
        assert!(report.find_specs("missing").is_empty());
    }

    #[test]
    fn test_minimal_result_parses() {
        let json = r#"{ "status": "failed", "errors": [ { "message": "boom" } ] }"#;
        let result: ReportResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.status, "failed");
        assert_eq!(result.duration, None);
        assert_eq!(result.errors[0].text(), Some("boom"));
        assert!(result.attachments.is_empty());
    }
}
