//! Form schema registry.
//!
//! Static, process-wide definition of the intake forms: each form is an
//! ordered set of questions with a prompt, a storage type, a validation
//! rule, and a flag for remote (LLM) plausibility checking. Changing this
//! registry is the only supported way to add or remove forms or questions.

mod rules;

pub use rules::AnswerRule;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Storage type of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
}

/// A single question within a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    /// Unique key within the form, as shown to the user.
    key: String,

    /// Full prompt text displayed when the question is selected.
    prompt: String,

    /// Storage type of the answer.
    kind: ValueKind,

    /// Validation rule (never absent; `Any` for free text).
    rule: AnswerRule,

    /// Whether the answer is also sent to the remote validation gateway.
    needs_remote_check: bool,
}

impl QuestionDefinition {
    /// Creates a question definition.
    pub fn new(
        key: impl Into<String>,
        prompt: impl Into<String>,
        kind: ValueKind,
        rule: AnswerRule,
    ) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            kind,
            rule,
            needs_remote_check: false,
        }
    }

    /// Flags the question for remote validation.
    pub fn with_remote_check(mut self) -> Self {
        self.needs_remote_check = true;
        self
    }

    /// Returns the question key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the storage type.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the validation rule.
    pub fn rule(&self) -> &AnswerRule {
        &self.rule
    }

    /// Returns true if the remote gateway must also check the answer.
    pub fn needs_remote_check(&self) -> bool {
        self.needs_remote_check
    }

    /// Snake-cased column name for the persistence schema.
    pub fn column_name(&self) -> String {
        column_name(&self.key)
    }
}

/// A named form: an ordered, fixed set of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDefinition {
    name: String,
    questions: Vec<QuestionDefinition>,
}

impl FormDefinition {
    /// Creates a form definition, rejecting duplicate question keys.
    pub fn new(
        name: impl Into<String>,
        questions: Vec<QuestionDefinition>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::empty_field("form_name"));
        }
        if questions.is_empty() {
            return Err(ValidationError::empty_field("questions"));
        }
        for (i, q) in questions.iter().enumerate() {
            if questions[..i].iter().any(|other| other.key == q.key) {
                return Err(ValidationError::invalid_format(
                    "questions",
                    format!("duplicate question key '{}' in form '{}'", q.key, name),
                ));
            }
        }
        Ok(Self { name, questions })
    }

    /// Returns the form name (snake_cased identifier).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable form title ("flock_farm_information" -> "Flock Farm Information").
    pub fn title(&self) -> String {
        self.name
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns the questions in declaration order.
    pub fn questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    /// Looks up a question by key.
    pub fn question(&self, key: &str) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.key == key)
    }

    /// Returns true if the form declares the given question key.
    pub fn contains(&self, key: &str) -> bool {
        self.question(key).is_some()
    }

    /// Table name for the persistence schema.
    pub fn table_name(&self) -> &str {
        &self.name
    }
}

/// The process-wide registry of forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRegistry {
    forms: Vec<FormDefinition>,
}

impl FormRegistry {
    /// Creates a registry, rejecting duplicate form names.
    pub fn new(forms: Vec<FormDefinition>) -> Result<Self, ValidationError> {
        for (i, f) in forms.iter().enumerate() {
            if forms[..i].iter().any(|other| other.name == f.name) {
                return Err(ValidationError::invalid_format(
                    "forms",
                    format!("duplicate form name '{}'", f.name),
                ));
            }
        }
        Ok(Self { forms })
    }

    /// Returns the forms in declaration order.
    pub fn forms(&self) -> &[FormDefinition] {
        &self.forms
    }

    /// Looks up a form by name.
    pub fn form(&self, name: &str) -> Option<&FormDefinition> {
        self.forms.iter().find(|f| f.name == name)
    }

    /// Returns true if the registry declares the given form.
    pub fn contains_form(&self, name: &str) -> bool {
        self.form(name).is_some()
    }

    /// Total number of questions across all forms.
    pub fn total_questions(&self) -> usize {
        self.forms.iter().map(|f| f.questions.len()).sum()
    }
}

/// Derives a snake_cased column name from a question key.
///
/// "Number of Affected Flocks/Houses" -> "number_of_affected_flocks_houses".
pub fn column_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last_was_sep = true;
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// The poultry-health intake forms.
static POULTRY_REGISTRY: Lazy<FormRegistry> = Lazy::new(|| {
    let flock_farm = FormDefinition::new(
        "flock_farm_information",
        vec![
            QuestionDefinition::new(
                "Type of Chicken",
                "What type of chicken is this? (e.g., Layer, Broiler, Breeder)",
                ValueKind::Text,
                AnswerRule::one_of(["Layer", "Broiler", "Breeder"]),
            ),
            QuestionDefinition::new(
                "Age of Chicken",
                "What is the age of the chicken in weeks?",
                ValueKind::Integer,
                AnswerRule::range(1, 199),
            ),
            QuestionDefinition::new(
                "Housing Type",
                "What housing type is used? (e.g., Closed House, Opened-Side)",
                ValueKind::Text,
                AnswerRule::one_of(["Closed House", "Opened-Side", "Open-Sided", "Open House"]),
            )
            .with_remote_check(),
            QuestionDefinition::new(
                "Number of Affected Flocks/Houses",
                "How many flocks or houses are affected?",
                ValueKind::Integer,
                AnswerRule::range(0, 1000),
            ),
            QuestionDefinition::new(
                "Feed Type",
                "What type of feed is used? (e.g., Complete Feed, Self Mix)",
                ValueKind::Text,
                AnswerRule::one_of(["Complete Feed", "Self Mix"]),
            ),
            QuestionDefinition::new(
                "Environment Information",
                "Describe the environmental conditions (e.g., climate, weather, cage atmosphere, nearby poultry farms)",
                ValueKind::Text,
                AnswerRule::min_length(10),
            )
            .with_remote_check(),
        ],
    )
    .expect("flock_farm_information form is well-formed");

    let symptoms = FormDefinition::new(
        "symptoms_performance_data",
        vec![
            QuestionDefinition::new(
                "Main Symptoms",
                "What are the main symptoms or clinical signs observed?",
                ValueKind::Text,
                AnswerRule::min_length(5),
            )
            .with_remote_check(),
            QuestionDefinition::new(
                "Daily Production Performance",
                "Provide daily chicken production data (e.g., mortality, %HD, feed intake, egg weight)",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
            QuestionDefinition::new(
                "Pattern of Spread or Drop",
                "Describe if there's mortality, production drop, or spreading pattern",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
        ],
    )
    .expect("symptoms_performance_data form is well-formed");

    let medical = FormDefinition::new(
        "medical_diagnostic_records",
        vec![
            QuestionDefinition::new(
                "Vaccination History",
                "What is the vaccination history or program followed?",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
            QuestionDefinition::new(
                "Lab Data",
                "Provide any lab results or data if available",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
            QuestionDefinition::new(
                "Pathology Findings (Necropsy)",
                "List any pathology anatomy changes found during necropsy",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
            QuestionDefinition::new(
                "Current Treatment",
                "What treatment is currently being administered?",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
            QuestionDefinition::new(
                "Management Questions",
                "List any management-related concerns or questions",
                ValueKind::Text,
                AnswerRule::min_length(5),
            ),
        ],
    )
    .expect("medical_diagnostic_records form is well-formed");

    FormRegistry::new(vec![flock_farm, symptoms, medical])
        .expect("poultry registry is well-formed")
});

/// Returns the built-in poultry intake registry.
pub fn poultry_registry() -> &'static FormRegistry {
    &POULTRY_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poultry_registry_declares_three_forms() {
        let registry = poultry_registry();
        assert_eq!(registry.forms().len(), 3);
        assert!(registry.contains_form("flock_farm_information"));
        assert!(registry.contains_form("symptoms_performance_data"));
        assert!(registry.contains_form("medical_diagnostic_records"));
    }

    #[test]
    fn every_question_has_a_rule_and_prompt() {
        for form in poultry_registry().forms() {
            for q in form.questions() {
                assert!(!q.prompt().is_empty(), "{} has empty prompt", q.key());
                // Rule presence is structural: constructing a question
                // without a rule does not compile.
                let _ = q.rule().describe();
            }
        }
    }

    #[test]
    fn form_lookup_finds_declared_questions() {
        let form = poultry_registry().form("flock_farm_information").unwrap();
        assert!(form.contains("Type of Chicken"));
        assert!(!form.contains("Main Symptoms"));
    }

    #[test]
    fn form_title_is_human_readable() {
        let form = poultry_registry().form("flock_farm_information").unwrap();
        assert_eq!(form.title(), "Flock Farm Information");
    }

    #[test]
    fn column_name_snake_cases_keys() {
        assert_eq!(
            column_name("Number of Affected Flocks/Houses"),
            "number_of_affected_flocks_houses"
        );
        assert_eq!(
            column_name("Pathology Findings (Necropsy)"),
            "pathology_findings_necropsy"
        );
        assert_eq!(column_name("Feed Type"), "feed_type");
    }

    #[test]
    fn duplicate_question_keys_are_rejected() {
        let result = FormDefinition::new(
            "broken",
            vec![
                QuestionDefinition::new("Key", "p", ValueKind::Text, AnswerRule::Any),
                QuestionDefinition::new("Key", "p2", ValueKind::Text, AnswerRule::Any),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_form_names_are_rejected() {
        let form = || {
            FormDefinition::new(
                "dup",
                vec![QuestionDefinition::new(
                    "Key",
                    "p",
                    ValueKind::Text,
                    AnswerRule::Any,
                )],
            )
            .unwrap()
        };
        let result = FormRegistry::new(vec![form(), form()]);
        assert!(result.is_err());
    }

    #[test]
    fn remote_check_flag_is_limited_to_marked_questions() {
        let form = poultry_registry().form("flock_farm_information").unwrap();
        assert!(form.question("Housing Type").unwrap().needs_remote_check());
        assert!(!form.question("Feed Type").unwrap().needs_remote_check());
    }

    #[test]
    fn total_questions_counts_across_forms() {
        assert_eq!(poultry_registry().total_questions(), 6 + 3 + 5);
    }
}
