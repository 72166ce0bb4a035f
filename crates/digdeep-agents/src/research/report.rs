//! Report normalization and export

use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use super::state::{GatheredInformation, ReportSection, ResearchReport};
use crate::error::AgentError;

/// Characters of gathered text used for a fallback summary
const FALLBACK_SUMMARY_CHARS: usize = 500;

const PLACEHOLDER_SUMMARY: &str = "No information could be gathered for this request.";

/// Output format for an exported report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Text,
    Json,
}

impl ReportFormat {
    /// Pick the format from a file extension; unknown extensions get Markdown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("txt") => ReportFormat::Text,
            Some("json") => ReportFormat::Json,
            _ => ReportFormat::Markdown,
        }
    }
}

impl ResearchReport {
    /// Fill every required part the model left empty
    ///
    /// After this the report has a topic, a non-empty summary, at least one
    /// key finding and at least one section.
    pub fn normalized(mut self, brief: &str, gathered: &GatheredInformation) -> Self {
        if self.topic.trim().is_empty() {
            self.topic = brief.to_string();
        }

        if self.summary.trim().is_empty() {
            let joined = gathered
                .items
                .iter()
                .map(|i| i.snippet.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let summary: String = joined.trim().chars().take(FALLBACK_SUMMARY_CHARS).collect();
            self.summary = if summary.is_empty() {
                PLACEHOLDER_SUMMARY.to_string()
            } else {
                summary
            };
        }

        self.key_findings.retain(|f| !f.trim().is_empty());
        if self.key_findings.is_empty() {
            self.key_findings = gathered
                .items
                .iter()
                .map(|i| format!("Searched: {}", i.query))
                .collect();
        }
        if self.key_findings.is_empty() {
            self.key_findings.push(format!("No findings were gathered for: {}", self.topic));
        }

        if self.sections.is_empty() {
            let content = if gathered.is_empty() {
                self.summary.clone()
            } else {
                gathered.render()
            };
            self.sections.push(ReportSection {
                title: "Findings".to_string(),
                content,
            });
        }

        self
    }

    /// Report assembled from gathered data alone
    pub fn fallback(brief: &str, gathered: &GatheredInformation) -> Self {
        let references = gathered
            .items
            .iter()
            .map(|i| i.source.clone())
            .filter(|s| s.starts_with("http"))
            .collect();

        ResearchReport {
            references,
            ..Default::default()
        }
        .normalized(brief, gathered)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.topic);
        let _ = writeln!(out, "## Summary\n\n{}\n", self.summary);

        if !self.key_findings.is_empty() {
            let _ = writeln!(out, "## Key Findings\n");
            for finding in &self.key_findings {
                let _ = writeln!(out, "- {}", finding);
            }
            out.push('\n');
        }

        for section in &self.sections {
            let _ = writeln!(out, "## {}\n\n{}\n", section.title, section.content);
        }

        if let Some(conclusion) = self.conclusion.as_deref().filter(|c| !c.trim().is_empty()) {
            let _ = writeln!(out, "## Conclusion\n\n{}\n", conclusion);
        }

        if !self.references.is_empty() {
            let _ = writeln!(out, "## References\n");
            for (i, reference) in self.references.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, reference);
            }
        }

        out.trim_end().to_string() + "\n"
    }

    /// Plain text rendering with underlined headings
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let heading = |out: &mut String, title: &str, underline: char| {
            let _ = writeln!(out, "{}", title);
            let _ = writeln!(out, "{}\n", underline.to_string().repeat(title.chars().count()));
        };

        heading(&mut out, &self.topic, '=');
        heading(&mut out, "Summary", '-');
        let _ = writeln!(out, "{}\n", self.summary);

        if !self.key_findings.is_empty() {
            heading(&mut out, "Key Findings", '-');
            for finding in &self.key_findings {
                let _ = writeln!(out, "* {}", finding);
            }
            out.push('\n');
        }

        for section in &self.sections {
            heading(&mut out, &section.title, '-');
            let _ = writeln!(out, "{}\n", section.content);
        }

        if let Some(conclusion) = self.conclusion.as_deref().filter(|c| !c.trim().is_empty()) {
            heading(&mut out, "Conclusion", '-');
            let _ = writeln!(out, "{}\n", conclusion);
        }

        if !self.references.is_empty() {
            heading(&mut out, "References", '-');
            for (i, reference) in self.references.iter().enumerate() {
                let _ = writeln!(out, "[{}] {}", i + 1, reference);
            }
        }

        out.trim_end().to_string() + "\n"
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, AgentError> {
        Ok(match format {
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Text => self.to_text(),
            ReportFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }

    /// Write the report to `path`, creating parent directories
    pub fn export(&self, path: &Path, format: ReportFormat) -> Result<(), AgentError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render(format)?)?;
        info!(path = %path.display(), ?format, "Report exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::state::InformationItem;
    use tempfile::TempDir;

    fn gathered() -> GatheredInformation {
        GatheredInformation {
            topic: "coffee".into(),
            items: vec![
                InformationItem {
                    query: "best coffee Nairobi".into(),
                    source: "https://example.com/coffee".into(),
                    snippet: "Java House is popular.".into(),
                    metadata: None,
                },
                InformationItem {
                    query: "coffee prices Nairobi".into(),
                    source: "web_search".into(),
                    snippet: "A cappuccino costs 350 KES.".into(),
                    metadata: None,
                },
            ],
        }
    }

    fn sample_report() -> ResearchReport {
        ResearchReport {
            topic: "Coffee in Nairobi".into(),
            summary: "Nairobi has a lively coffee scene.".into(),
            key_findings: vec!["Java House is the largest chain".into()],
            sections: vec![ReportSection {
                title: "Chains".into(),
                content: "Java House, Artcaffe.".into(),
            }],
            conclusion: Some("Try Java House first.".into()),
            references: vec!["https://example.com/coffee".into()],
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = sample_report().to_markdown();

        assert!(md.starts_with("# Coffee in Nairobi\n\n## Summary\n\nNairobi has a lively coffee scene.\n"));
        assert!(md.contains("## Key Findings\n\n- Java House is the largest chain\n"));
        assert!(md.contains("## Chains\n\nJava House, Artcaffe.\n"));
        assert!(md.contains("## Conclusion\n\nTry Java House first.\n"));
        assert!(md.ends_with("## References\n\n1. https://example.com/coffee\n"));
    }

    #[test]
    fn test_text_layout() {
        let text = sample_report().to_text();
        assert!(text.starts_with("Coffee in Nairobi\n=================\n\n"));
        assert!(text.contains("Summary\n-------\n"));
        assert!(text.contains("[1] https://example.com/coffee"));
    }

    #[test]
    fn test_normalize_fills_required_parts() {
        let report = ResearchReport::default().normalized("I want coffee in Nairobi", &gathered());

        assert_eq!(report.topic, "I want coffee in Nairobi");
        assert_eq!(report.summary, "Java House is popular. A cappuccino costs 350 KES.");
        assert_eq!(
            report.key_findings,
            vec![
                "Searched: best coffee Nairobi".to_string(),
                "Searched: coffee prices Nairobi".to_string()
            ]
        );
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].title, "Findings");
    }

    #[test]
    fn test_normalize_without_gathered_data() {
        let report = ResearchReport::default().normalized("brief", &GatheredInformation::default());
        assert!(!report.summary.is_empty());
        assert_eq!(report.key_findings.len(), 1);
        assert_eq!(report.sections.len(), 1);
    }

    #[test]
    fn test_normalize_keeps_model_content() {
        let report = sample_report().normalized("brief", &gathered());
        assert_eq!(report, sample_report());
    }

    #[test]
    fn test_fallback_references_only_urls() {
        let report = ResearchReport::fallback("brief", &gathered());
        assert_eq!(report.references, vec!["https://example.com/coffee".to_string()]);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ReportFormat::from_path(Path::new("out/report.md")), ReportFormat::Markdown);
        assert_eq!(ReportFormat::from_path(Path::new("report.TXT")), ReportFormat::Text);
        assert_eq!(ReportFormat::from_path(Path::new("report.json")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("report")), ReportFormat::Markdown);
    }

    #[test]
    fn test_export_writes_each_format() {
        let dir = TempDir::new().unwrap();
        let report = sample_report();

        let md = dir.path().join("nested/report.md");
        report.export(&md, ReportFormat::from_path(&md)).unwrap();
        assert!(std::fs::read_to_string(&md).unwrap().starts_with("# Coffee in Nairobi"));

        let json = dir.path().join("report.json");
        report.export(&json, ReportFormat::Json).unwrap();
        let parsed: ResearchReport =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }
}
