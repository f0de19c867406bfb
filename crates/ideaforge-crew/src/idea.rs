use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The six named fields of a business idea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaField {
    BusinessName,
    Problem,
    Solution,
    DetailedDescription,
    TargetMarket,
    ValueProposition,
}

impl IdeaField {
    pub const ALL: [IdeaField; 6] = [
        IdeaField::BusinessName,
        IdeaField::Problem,
        IdeaField::Solution,
        IdeaField::DetailedDescription,
        IdeaField::TargetMarket,
        IdeaField::ValueProposition,
    ];

    /// Display label used in prompts and rendered ideas
    pub fn label(&self) -> &'static str {
        match self {
            IdeaField::BusinessName => "Business Name",
            IdeaField::Problem => "Problem",
            IdeaField::Solution => "Solution",
            IdeaField::DetailedDescription => "Detailed Description",
            IdeaField::TargetMarket => "Target Market",
            IdeaField::ValueProposition => "Value Proposition",
        }
    }

    /// Whether an idea without this field is rejected by the parser.
    /// Optional fields default to empty text.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            IdeaField::BusinessName | IdeaField::Problem | IdeaField::Solution
        )
    }

    /// Lowercase spellings recognised as this field, longest first per field
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            IdeaField::BusinessName => &["business name", "company name", "name"],
            IdeaField::Problem => &["problem statement", "problem"],
            IdeaField::Solution => &["solution"],
            IdeaField::DetailedDescription => &["detailed description", "description"],
            IdeaField::TargetMarket => &["target market"],
            IdeaField::ValueProposition => &["value proposition"],
        }
    }
}

impl std::fmt::Display for IdeaField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdeaParseError {
    #[error("Output does not contain any recognisable idea field")]
    Unparseable,

    #[error("Idea is missing required field '{0}'")]
    MissingField(IdeaField),
}

/// A business idea broken into its six fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRecord {
    pub business_name: String,
    pub problem: String,
    pub solution: String,
    pub detailed_description: String,
    pub target_market: String,
    pub value_proposition: String,
}

impl IdeaRecord {
    pub fn get(&self, field: IdeaField) -> &str {
        match field {
            IdeaField::BusinessName => &self.business_name,
            IdeaField::Problem => &self.problem,
            IdeaField::Solution => &self.solution,
            IdeaField::DetailedDescription => &self.detailed_description,
            IdeaField::TargetMarket => &self.target_market,
            IdeaField::ValueProposition => &self.value_proposition,
        }
    }

    pub fn set(&mut self, field: IdeaField, value: String) {
        match field {
            IdeaField::BusinessName => self.business_name = value,
            IdeaField::Problem => self.problem = value,
            IdeaField::Solution => self.solution = value,
            IdeaField::DetailedDescription => self.detailed_description = value,
            IdeaField::TargetMarket => self.target_market = value,
            IdeaField::ValueProposition => self.value_proposition = value,
        }
    }

    /// Parse creator output into an idea.
    ///
    /// Accepts the labelled layout (`Business Name: ...`, with markdown
    /// decoration and multi-line values) or a JSON object keyed by field name
    /// or label.
    pub fn parse(output: &str) -> Result<Self, IdeaParseError> {
        let fields = parse_fields(output);
        if fields.is_empty() {
            return Err(IdeaParseError::Unparseable);
        }

        let mut record = IdeaRecord::default();
        for (field, value) in fields {
            record.set(field, value);
        }

        if let Some(missing) = IdeaField::ALL
            .into_iter()
            .find(|f| f.is_required() && record.get(*f).is_empty())
        {
            return Err(IdeaParseError::MissingField(missing));
        }

        Ok(record)
    }

    /// Apply refiner output to this idea.
    ///
    /// - empty output keeps the idea unchanged
    /// - labelled fields overwrite the matching fields, others are kept
    /// - anything else is kept alongside the idea as refinement notes
    pub fn refine(&self, output: &str) -> (CandidateIdea, Refinement) {
        let trimmed = output.trim();
        if trimmed.is_empty() {
            return (CandidateIdea::from(self.clone()), Refinement::Unchanged);
        }

        let fields = parse_fields(trimmed);
        if fields.is_empty() {
            let candidate = CandidateIdea {
                record: self.clone(),
                notes: Some(trimmed.to_string()),
            };
            return (candidate, Refinement::Notes);
        }

        let mut record = self.clone();
        let mut updated = Vec::new();
        for (field, value) in fields {
            if record.get(field) != value {
                updated.push(field);
            }
            record.set(field, value);
        }

        let refinement = if updated.is_empty() {
            Refinement::Unchanged
        } else {
            Refinement::Merged { fields: updated }
        };
        (CandidateIdea::from(record), refinement)
    }

    /// Render in the labelled layout, skipping empty optional fields
    pub fn render(&self) -> String {
        IdeaField::ALL
            .iter()
            .filter(|f| f.is_required() || !self.get(**f).is_empty())
            .map(|f| format!("{}: {}", f.label(), self.get(*f)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How the refiner's output was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Refinement {
    /// Nothing usable in the output; the idea goes to the judge as created
    Unchanged,
    /// These fields were overwritten
    Merged { fields: Vec<IdeaField> },
    /// Unstructured text kept as notes next to the original fields
    Notes,
}

impl Refinement {
    pub fn short_description(&self) -> String {
        match self {
            Refinement::Unchanged => "unchanged".to_string(),
            Refinement::Merged { fields } => {
                let labels: Vec<&str> = fields.iter().map(|f| f.label()).collect();
                format!("updated {}", labels.join(", "))
            }
            Refinement::Notes => "notes added".to_string(),
        }
    }
}

/// The refined idea handed to the judge and the writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdea {
    #[serde(flatten)]
    pub record: IdeaRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CandidateIdea {
    pub fn business_name(&self) -> &str {
        &self.record.business_name
    }

    pub fn render(&self) -> String {
        match &self.notes {
            Some(notes) => format!("{}\n\nRefinement Notes:\n{}", self.record.render(), notes),
            None => self.record.render(),
        }
    }
}

impl From<IdeaRecord> for CandidateIdea {
    fn from(record: IdeaRecord) -> Self {
        Self {
            record,
            notes: None,
        }
    }
}

/// Extract every recognised field with a non-empty value, in order of appearance
fn parse_fields(output: &str) -> Vec<(IdeaField, String)> {
    if let Some(fields) = parse_json_fields(output) {
        debug!(fields = fields.len(), "Parsed idea from JSON");
        return fields;
    }

    let mut fields: Vec<(IdeaField, String)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in output.lines() {
        if let Some((field, rest)) = match_label(line) {
            match fields.iter().position(|(f, _)| *f == field) {
                Some(index) => {
                    if !rest.is_empty() {
                        let value = &mut fields[index].1;
                        if !value.is_empty() {
                            value.push('\n');
                        }
                        value.push_str(rest);
                    }
                    current = Some(index);
                }
                None => {
                    fields.push((field, rest.to_string()));
                    current = Some(fields.len() - 1);
                }
            }
        } else if let Some(index) = current {
            let value = &mut fields[index].1;
            value.push('\n');
            value.push_str(line.trim_end());
        }
    }

    fields
        .into_iter()
        .map(|(f, v)| (f, v.trim().to_string()))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

/// Recognise a field label at the start of a line, returning the inline value
fn match_label(line: &str) -> Option<(IdeaField, &str)> {
    let stripped = line
        .trim()
        .trim_start_matches(|c: char| c == '#' || c == '*' || c == '-' || c == '>' || c == '•')
        .trim_start();
    let stripped = strip_numbering(stripped).trim_start_matches(['*', '_']);

    for field in IdeaField::ALL {
        for alias in field.aliases() {
            let Some(head) = stripped.get(..alias.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(alias) {
                continue;
            }

            // A dash only separates when spaced, so "Problem-solving" stays prose
            let after = &stripped[alias.len()..];
            let rest = after.trim_start_matches(['*', '_']);
            let is_boundary = rest.trim().is_empty()
                || rest.trim_start().starts_with(':')
                || (rest.starts_with(char::is_whitespace)
                    && rest.trim_start().starts_with(['-', '–', '—']));
            if !is_boundary {
                continue;
            }

            let value = after
                .trim_start_matches(|c: char| {
                    c.is_whitespace() || matches!(c, ':' | '*' | '_' | '-' | '–' | '—')
                })
                .trim_end();
            return Some((field, value));
        }
    }

    None
}

fn strip_numbering(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = s[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    s
}

fn parse_json_fields(output: &str) -> Option<Vec<(IdeaField, String)>> {
    let trimmed = output.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    if !body.starts_with('{') {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    let mut fields = Vec::new();
    for (key, value) in object {
        let normalized = key.replace('_', " ").to_lowercase();
        let Some(field) = IdeaField::ALL
            .into_iter()
            .find(|f| f.aliases().contains(&normalized.trim()))
        else {
            continue;
        };
        let text = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        if !text.is_empty() {
            fields.push((field, text));
        }
    }

    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATOR_OUTPUT: &str = "\
Here is my idea:

Business Name: CropSight
Problem: Smallholder farmers lose a third of their harvest to undetected disease.
Solution: A phone app that diagnoses crop disease from photos.
Detailed Description: Farmers photograph leaves; an on-device model flags disease
and recommends treatment, even offline.
Target Market: Smallholder farmers in East Africa and South Asia
Value Proposition: Early diagnosis for the price of a text message";

    #[test]
    fn test_parse_labelled_output() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        assert_eq!(idea.business_name, "CropSight");
        assert_eq!(
            idea.detailed_description,
            "Farmers photograph leaves; an on-device model flags disease\nand recommends treatment, even offline."
        );
        assert_eq!(idea.value_proposition, "Early diagnosis for the price of a text message");
    }

    #[test]
    fn test_parse_markdown_variants() {
        let output = "\
**Business Name:** LedgerLens
## Problem
Small firms misfile receipts.
- **Solution**: AI receipt triage
1. Target Market:--- bookkeepers";

        let idea = IdeaRecord::parse(output).unwrap();
        assert_eq!(idea.business_name, "LedgerLens");
        assert_eq!(idea.problem, "Small firms misfile receipts.");
        assert_eq!(idea.solution, "AI receipt triage");
        assert_eq!(idea.target_market, "bookkeepers");
        assert_eq!(idea.value_proposition, "");
    }

    #[test]
    fn test_parse_json_output() {
        let output = r#"```json
{"Business Name": "Tutorly", "problem": "Tutoring is expensive", "solution": "AI tutor", "value_proposition": "Cheap"}
```"#;
        let idea = IdeaRecord::parse(output).unwrap();
        assert_eq!(idea.business_name, "Tutorly");
        assert_eq!(idea.solution, "AI tutor");
        assert_eq!(idea.value_proposition, "Cheap");
    }

    #[test]
    fn test_prose_is_unparseable() {
        let output = "Problems arise when solutions are rushed. I could not think of anything.";
        assert_eq!(IdeaRecord::parse(output), Err(IdeaParseError::Unparseable));
        assert_eq!(IdeaRecord::parse(""), Err(IdeaParseError::Unparseable));
    }

    #[test]
    fn test_missing_required_field_is_distinct() {
        let output = "Business Name: Halfway\nTarget Market: everyone";
        assert_eq!(
            IdeaRecord::parse(output),
            Err(IdeaParseError::MissingField(IdeaField::Problem))
        );
    }

    #[test]
    fn test_refine_empty_output_falls_back() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        let (candidate, refinement) = idea.refine("   \n");
        assert_eq!(refinement, Refinement::Unchanged);
        assert_eq!(candidate.record, idea);
        assert!(candidate.notes.is_none());
    }

    #[test]
    fn test_refine_merges_fields() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        let (candidate, refinement) =
            idea.refine("Target Market: Cooperatives and agri-lenders\nProblem: Smallholder farmers lose a third of their harvest to undetected disease.");

        assert_eq!(
            refinement,
            Refinement::Merged {
                fields: vec![IdeaField::TargetMarket]
            }
        );
        assert_eq!(candidate.record.target_market, "Cooperatives and agri-lenders");
        assert_eq!(candidate.record.business_name, "CropSight");
    }

    #[test]
    fn test_refine_unstructured_output_becomes_notes() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        let (candidate, refinement) = idea.refine("Partner with seed vendors for distribution.");
        assert_eq!(refinement, Refinement::Notes);
        assert_eq!(candidate.record, idea);
        assert!(candidate
            .render()
            .ends_with("Refinement Notes:\nPartner with seed vendors for distribution."));
    }

    #[test]
    fn test_refine_hyphenated_prose_keeps_fields() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();

        let (candidate, refinement) =
            idea.refine("Problem-solving partnerships with insurers would cut acquisition cost.");
        assert_eq!(refinement, Refinement::Notes);
        assert_eq!(candidate.record, idea);

        let (candidate, refinement) =
            idea.refine("Solution-oriented pilots with two cooperatives come first.");
        assert_eq!(refinement, Refinement::Notes);
        assert_eq!(candidate.record.solution, idea.solution);
    }

    #[test]
    fn test_spaced_dash_still_separates() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        let (candidate, refinement) = idea.refine("**Target Market** - Agri-lenders");
        assert_eq!(
            refinement,
            Refinement::Merged {
                fields: vec![IdeaField::TargetMarket]
            }
        );
        assert_eq!(candidate.record.target_market, "Agri-lenders");
    }

    #[test]
    fn test_render_round_trips_through_parse() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        assert_eq!(IdeaRecord::parse(&idea.render()).unwrap(), idea);
    }

    #[test]
    fn test_candidate_serializes_flat() {
        let idea = IdeaRecord::parse(CREATOR_OUTPUT).unwrap();
        let json = serde_json::to_value(CandidateIdea::from(idea)).unwrap();
        assert_eq!(json["business_name"], "CropSight");
        assert!(json.get("notes").is_none());
    }
}
