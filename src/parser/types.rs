use serde::{Deserialize, Serialize};

/// One generated end-to-end flow: a name and the runner statements to
/// execute, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// Accepted shapes of a scenario file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScenarioDocument {
    Set {
        #[serde(default)]
        url: Option<String>,
        scenarios: Vec<Scenario>,
    },
    Single(Scenario),
    List(Vec<Scenario>),
}

/// Scenarios loaded from one or more files
#[derive(Debug, Clone, Default)]
pub struct ScenarioSet {
    /// Target URL declared by the first file that has one
    pub url: Option<String>,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn extend(&mut self, other: ScenarioSet) {
        if self.url.is_none() {
            self.url = other.url;
        }
        self.scenarios.extend(other.scenarios);
    }
}

impl From<ScenarioDocument> for ScenarioSet {
    fn from(doc: ScenarioDocument) -> Self {
        match doc {
            ScenarioDocument::Set { url, scenarios } => ScenarioSet { url, scenarios },
            ScenarioDocument::Single(scenario) => ScenarioSet {
                url: None,
                scenarios: vec![scenario],
            },
            ScenarioDocument::List(scenarios) => ScenarioSet {
                url: None,
                scenarios,
            },
        }
    }
}
