use serde::{Deserialize, Serialize};

/// The ten sections the writer is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    ExecutiveSummary,
    ProblemStatement,
    Solution,
    MarketAnalysis,
    BusinessModel,
    ImplementationPlan,
    TechnicalFeasibility,
    FinancialProjections,
    RiskAnalysis,
    Conclusion,
}

impl ReportSection {
    pub const ALL: [ReportSection; 10] = [
        ReportSection::ExecutiveSummary,
        ReportSection::ProblemStatement,
        ReportSection::Solution,
        ReportSection::MarketAnalysis,
        ReportSection::BusinessModel,
        ReportSection::ImplementationPlan,
        ReportSection::TechnicalFeasibility,
        ReportSection::FinancialProjections,
        ReportSection::RiskAnalysis,
        ReportSection::Conclusion,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportSection::ExecutiveSummary => "Executive Summary",
            ReportSection::ProblemStatement => "Problem Statement",
            ReportSection::Solution => "Solution",
            ReportSection::MarketAnalysis => "Market Analysis",
            ReportSection::BusinessModel => "Business Model",
            ReportSection::ImplementationPlan => "Implementation Plan",
            ReportSection::TechnicalFeasibility => "Technical Feasibility",
            ReportSection::FinancialProjections => "Financial Projections",
            ReportSection::RiskAnalysis => "Risk Analysis",
            ReportSection::Conclusion => "Conclusion",
        }
    }
}

/// The writer's implementation report for an accepted idea
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationReport {
    pub text: String,
    /// Sections whose heading appears in the text
    pub sections_found: Vec<ReportSection>,
}

impl ImplementationReport {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let sections_found = ReportSection::ALL
            .into_iter()
            .filter(|s| has_heading(&text, s.title()))
            .collect();
        Self {
            text,
            sections_found,
        }
    }

    pub fn missing_sections(&self) -> Vec<ReportSection> {
        ReportSection::ALL
            .into_iter()
            .filter(|s| !self.sections_found.contains(s))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.sections_found.len() == ReportSection::ALL.len()
    }
}

/// A heading is a line whose text, after markdown decoration and numbering,
/// is the section title followed by a colon, emphasis or the end of the line
fn has_heading(text: &str, title: &str) -> bool {
    text.lines().any(|line| {
        let stripped = line
            .trim()
            .trim_start_matches(|c: char| matches!(c, '#' | '*' | '_' | '-' | ' ' | '.' | ')') || c.is_ascii_digit());
        let Some(head) = stripped.get(..title.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(title) {
            return false;
        }

        let rest = stripped[title.len()..].trim_start_matches(['*', '_']).trim();
        rest.is_empty() || rest.starts_with(':')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_report() -> String {
        ReportSection::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. **{}:**\n   - details for {}\n", i + 1, s.title(), s.title()))
            .collect()
    }

    #[test]
    fn test_full_report_has_all_sections() {
        let report = ImplementationReport::new(full_report());
        assert!(report.is_complete());
        assert!(report.missing_sections().is_empty());
    }

    #[test]
    fn test_heading_styles() {
        let text = "## Executive Summary\nfoo\n### 10) Conclusion\nbar";
        let report = ImplementationReport::new(text);
        assert_eq!(
            report.sections_found,
            vec![ReportSection::ExecutiveSummary, ReportSection::Conclusion]
        );
        assert_eq!(report.missing_sections().len(), 8);
    }

    #[test]
    fn test_mentions_inside_prose_do_not_count() {
        let report = ImplementationReport::new("Our risk analysis is thorough.");
        assert!(report.sections_found.is_empty());
    }

    #[test]
    fn test_heading_needs_terminator() {
        let prose = "Solutions like ours scale.\nConclusions drawn early are risky.\nSolution-wise we are fine.";
        assert!(ImplementationReport::new(prose).sections_found.is_empty());

        for heading in ["**Solution:**", "## Solution", "3. Solution: phone app", "__Solution__", "Solution  "] {
            let report = ImplementationReport::new(heading);
            assert_eq!(
                report.sections_found,
                vec![ReportSection::Solution],
                "heading: {:?}",
                heading
            );
        }
    }
}
