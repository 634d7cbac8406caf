// Report generation and tabular export

use crate::error::ReportError;
use crate::model::{CrawlReport, Opportunity, SkippedUrl};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Column order of every exported opportunities table
pub const OPPORTUNITY_HEADERS: [&str; 4] = ["Keyword", "Text", "URL", "Keyword Source URL"];

/// Column order of the sample input sheet
pub const TEMPLATE_HEADERS: [&str; 2] = ["Keyword", "URL"];

pub const DEFAULT_RESULTS_FILENAME: &str = "inlink_opportunities.xlsx";
pub const DEFAULT_TEMPLATE_FILENAME: &str = "sample_template.xlsx";

/// How many rows the per-URL and per-keyword breakdowns keep
pub const TOP_N: usize = 10;

const TEMPLATE_ROWS: [(&str, &str); 5] = [
    ("SEO", "https://example.com/seo-guide"),
    ("Python", "https://example.com/python-tutorial"),
    ("Web Scraping", "https://example.com/web-scraping"),
    ("Data Analysis", "https://example.com/data-analysis"),
    ("Technical SEO", "https://example.com/technical-seo"),
];

/// Longest text a single worksheet cell accepts
const MAX_CELL_CHARS: usize = 32_767;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Csv,
    Xlsx,
    Json,
    Text,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ReportFormat::Csv),
            "xlsx" => Some(ReportFormat::Xlsx),
            "json" => Some(ReportFormat::Json),
            "text" | "txt" => Some(ReportFormat::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub unique_urls: usize,
    pub keyword_pairs: usize,
    pub processed: usize,
    pub opportunities: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    pub summary: ReportSummary,
    pub opportunities: Vec<Opportunity>,
    pub skipped: Vec<SkippedUrl>,
    pub top_urls: Vec<CountEntry>,
    pub top_keywords: Vec<CountEntry>,
}

impl ReportData {
    pub fn new(report: &CrawlReport, keyword_pairs: usize) -> Self {
        Self {
            summary: ReportSummary {
                unique_urls: report.total,
                keyword_pairs,
                processed: report.processed,
                opportunities: report.opportunities.len(),
                skipped: report.skipped.len(),
                cancelled: report.cancelled,
            },
            opportunities: report.opportunities.clone(),
            skipped: report.skipped.clone(),
            top_urls: top_counts(report.opportunities.iter().map(|o| o.target_url.as_str())),
            top_keywords: top_counts(report.opportunities.iter().map(|o| o.keyword.as_str())),
        }
    }
}

/// The `TOP_N` most frequent values, highest count first. Ties keep the
/// order in which values first appeared.
pub fn top_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut entries: Vec<CountEntry> = order
        .into_iter()
        .map(|value| CountEntry {
            value: value.to_string(),
            count: counts[value],
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(TOP_N);
    entries
}

/// Write opportunities as `Keyword, Text, URL, Keyword Source URL` rows.
/// The header row is written even when there are no opportunities.
pub fn write_opportunities_csv<W: Write>(
    writer: W,
    opportunities: &[Opportunity],
) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(OPPORTUNITY_HEADERS)?;
    for opportunity in opportunities {
        csv_writer.write_record([
            opportunity.keyword.as_str(),
            opportunity.paragraph_text.as_str(),
            opportunity.target_url.as_str(),
            opportunity.source_url.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the sample `Keyword, URL` sheet users can start from
pub fn write_template_csv<W: Write>(writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(TEMPLATE_HEADERS)?;
    for (keyword, url) in TEMPLATE_ROWS {
        csv_writer.write_record([keyword, url])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Opportunities workbook with one `Opportunities` sheet
pub fn write_opportunities_xlsx(
    path: &Path,
    opportunities: &[Opportunity],
) -> Result<(), ReportError> {
    opportunities_workbook(opportunities)?.save(path)?;
    Ok(())
}

/// Sample sheet as a workbook, readable by `Table::from_xlsx_path`
pub fn write_template_xlsx(path: &Path) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Keywords")?;
    fill_worksheet(
        worksheet,
        TEMPLATE_HEADERS,
        TEMPLATE_ROWS.iter().map(|(keyword, url)| [*keyword, *url]),
    )?;
    worksheet.set_column_width(1, 45)?;
    workbook.save(path)?;
    Ok(())
}

pub fn generate_xlsx_report(data: &ReportData) -> Result<Vec<u8>, ReportError> {
    Ok(opportunities_workbook(&data.opportunities)?.save_to_buffer()?)
}

fn opportunities_workbook(opportunities: &[Opportunity]) -> Result<Workbook, ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Opportunities")?;
    fill_worksheet(
        worksheet,
        OPPORTUNITY_HEADERS,
        opportunities.iter().map(|o| {
            [
                o.keyword.as_str(),
                o.paragraph_text.as_str(),
                o.target_url.as_str(),
                o.source_url.as_str(),
            ]
        }),
    )?;
    worksheet.set_column_width(1, 80)?;
    Ok(workbook)
}

/// Bold header row, then every row as text cells
fn fill_worksheet<'a, const N: usize>(
    worksheet: &mut Worksheet,
    headers: [&str; N],
    rows: impl Iterator<Item = [&'a str; N]>,
) -> Result<(), ReportError> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (row, cells) in rows.enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let text = clamp_cell(cell);
            worksheet.write_string(row as u32 + 1, col as u16, text.as_str())?;
        }
    }
    Ok(())
}

fn clamp_cell(text: &str) -> String {
    text.chars().take(MAX_CELL_CHARS).collect()
}

pub fn generate_csv_report(data: &ReportData) -> Result<String, ReportError> {
    let mut buffer = Vec::new();
    write_opportunities_csv(&mut buffer, &data.opportunities)?;
    String::from_utf8(buffer).map_err(|e| {
        ReportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

pub fn generate_json_report(data: &ReportData) -> Result<String, ReportError> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Inlinker",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "summary": data.summary,
            "opportunities": data.opportunities,
            "skipped": data.skipped,
            "top_urls": data.top_urls,
            "top_keywords": data.top_keywords
        }
    });

    Ok(serde_json::to_string_pretty(&json_report)?)
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("\n                     INLINK OPPORTUNITIES REPORT\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    let summary = &data.summary;
    report.push_str(&format!("Unique URLs:    {}\n", summary.unique_urls));
    report.push_str(&format!("Keyword pairs:  {}\n", summary.keyword_pairs));
    report.push_str(&format!(
        "Pages crawled:  {}/{}{}\n",
        summary.processed,
        summary.unique_urls,
        if summary.cancelled { " (cancelled)" } else { "" }
    ));
    report.push_str(&format!("Opportunities:  {}\n", summary.opportunities));
    report.push_str(&format!("Skipped URLs:   {}\n\n", summary.skipped));

    if data.opportunities.is_empty() {
        report.push_str(
            "No inlink opportunities found. Try adjusting your keywords or URLs.\n\n",
        );
    } else {
        push_section(&mut report, "OPPORTUNITIES BY URL");
        push_counts(&mut report, &data.top_urls);

        push_section(&mut report, "OPPORTUNITIES BY KEYWORD");
        push_counts(&mut report, &data.top_keywords);

        push_section(&mut report, "OPPORTUNITIES");
        for (idx, opportunity) in data.opportunities.iter().enumerate() {
            report.push_str(&format!(
                "[{}] \"{}\" -> {}\n",
                idx + 1,
                opportunity.keyword,
                opportunity.source_url
            ));
            report.push_str(&format!("    on   {}\n", opportunity.target_url));
            report.push_str(&format!(
                "    text {}\n\n",
                truncate(&opportunity.paragraph_text, 160)
            ));
        }
    }

    if !data.skipped.is_empty() {
        push_section(&mut report, "SKIPPED URLS");
        for skipped in &data.skipped {
            report.push_str(&format!("  {}  {}\n", skipped.url, skipped.reason));
        }
        report.push('\n');
    }

    report.push_str(RULE);
    report.push_str("\nGenerated by Inlinker\n");

    report
}

/// Render the report as bytes; only `Xlsx` is not UTF-8 text.
pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Csv => Ok(generate_csv_report(data)?.into_bytes()),
        ReportFormat::Xlsx => generate_xlsx_report(data),
        ReportFormat::Json => Ok(generate_json_report(data)?.into_bytes()),
        ReportFormat::Text => Ok(generate_text_report(data).into_bytes()),
    }
}

pub fn save_report(content: &[u8], path: &Path) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content)?;
    Ok(())
}

fn push_section(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push('\n');
    report.push_str(title);
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");
}

fn push_counts(report: &mut String, entries: &[CountEntry]) {
    for entry in entries {
        report.push_str(&format!("  {:>5}  {}\n", entry.count, entry.value));
    }
    report.push('\n');
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
