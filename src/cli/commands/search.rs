//! Search command - query a logical target

use crate::cli::output::{colors, format_millis};
use crate::cli::OutputFormat;
use crate::core::search::{QueryPlan, RangeClause, SortSpec};
use crate::core::services::Services;
use crate::core::types::{FieldValue, FIELD_CONTENT};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Logical target to search
    pub target: String,

    /// Terms matched against all fields (all must match)
    pub terms: Vec<String>,

    /// FIELD=TERMS clause where every term must match (repeatable)
    #[arg(long = "all", value_name = "FIELD=TERMS", value_parser = parse_clause)]
    pub all_of: Vec<(String, String)>,

    /// FIELD=TERMS clause where any term may match (repeatable)
    #[arg(long = "any", value_name = "FIELD=TERMS", value_parser = parse_clause)]
    pub any_of: Vec<(String, String)>,

    /// FIELD=MIN..MAX inclusive range, either side may be empty (repeatable)
    #[arg(long, value_name = "FIELD=MIN..MAX", value_parser = parse_range)]
    pub range: Vec<RangeClause>,

    /// Sort by FIELD, or FIELD:desc for descending order
    #[arg(long, value_name = "FIELD[:desc]", value_parser = parse_sort)]
    pub sort: Option<SortSpec>,

    /// Query plan as JSON, combined with the other clauses
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    /// Stored fields to return (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Return every stored field
    #[arg(long, conflicts_with = "fields")]
    pub all_fields: bool,

    /// Include the raw XML payload
    #[arg(long)]
    pub xml: bool,

    /// Position of the first result
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Number of results (defaults to the configured page size)
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

/// Parse `FIELD=TERMS`
pub fn parse_clause(s: &str) -> Result<(String, String), String> {
    let (field, terms) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=TERMS, got '{s}'"))?;
    if field.trim().is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    Ok((field.trim().to_string(), terms.to_string()))
}

/// Parse `FIELD=MIN..MAX`
pub fn parse_range(s: &str) -> Result<RangeClause, String> {
    let (field, bounds) = parse_clause(s)?;
    let (min, max) = bounds
        .split_once("..")
        .ok_or_else(|| format!("expected FIELD=MIN..MAX, got '{s}'"))?;
    Ok(RangeClause {
        field,
        min: parse_bound(min),
        max: parse_bound(max),
    })
}

fn parse_bound(s: &str) -> Option<FieldValue> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Some(match s.parse::<f64>() {
        Ok(n) => FieldValue::Number(n),
        Err(_) => FieldValue::Text(s.to_string()),
    })
}

/// Parse `FIELD` or `FIELD:desc`
pub fn parse_sort(s: &str) -> Result<SortSpec, String> {
    let (field, reverse) = match s.rsplit_once(':') {
        Some((field, "desc")) => (field, true),
        Some((field, "asc")) => (field, false),
        Some((_, order)) => return Err(format!("unknown sort order '{order}'")),
        None => (s, false),
    };
    if field.is_empty() {
        return Err("missing sort field".to_string());
    }
    Ok(SortSpec {
        field: field.to_string(),
        reverse,
    })
}

/// Assemble the query plan from the command line
pub fn build_plan(args: &SearchArgs) -> Result<QueryPlan, Box<dyn std::error::Error>> {
    let mut plan = match &args.plan {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => QueryPlan::new(),
    };

    if !args.terms.is_empty() {
        plan = plan.all_of(FIELD_CONTENT, &args.terms.join(" "));
    }
    for (field, terms) in &args.all_of {
        plan = plan.all_of(field, terms);
    }
    for (field, terms) in &args.any_of {
        plan = plan.any_of(field, terms);
    }
    for range in &args.range {
        plan = plan.range(&range.field, range.min.clone(), range.max.clone());
    }
    if let Some(sort) = &args.sort {
        plan = plan.sorted_by(&sort.field, sort.reverse);
    }
    Ok(plan)
}

/// Execute the search command
pub async fn execute(
    args: SearchArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = build_plan(&args)?;

    let selector = if args.all_fields {
        services.fields.all_stored(args.xml)
    } else {
        services.fields.selector(&args.fields, args.xml)?
    };

    let page = services
        .search
        .page(&args.target, &plan, &selector, args.offset, args.count)?;

    match format {
        OutputFormat::Human => {
            if page.items.is_empty() {
                println!(
                    "No results found in '{}' (total {})",
                    colors::target(&page.target),
                    colors::number(&page.total.to_string())
                );
            } else {
                println!(
                    "Showing {}-{} of {} result(s) in '{}' ({}):\n",
                    colors::number(&(page.offset + 1).to_string()),
                    colors::number(&(page.offset + page.items.len()).to_string()),
                    colors::number(&page.total.to_string()),
                    colors::target(&page.target),
                    format_millis(page.query_time_ms)
                );

                for (i, item) in page.items.iter().enumerate() {
                    println!(
                        "[{}] {} {}",
                        colors::rank(&(page.offset + i + 1).to_string()),
                        colors::identifier(&item.identifier),
                        colors::dim(&format!("(score: {:.2})", item.score))
                    );
                    for (name, values) in &item.fields {
                        let rendered: Vec<String> = values.iter().map(|v| v.as_text()).collect();
                        println!("    {}: {}", colors::label(name), rendered.join("; "));
                    }
                    if let Some(xml) = &item.xml {
                        for line in xml.lines().take(5) {
                            let truncated = if line.chars().count() > 100 {
                                let head: String = line.chars().take(97).collect();
                                format!("{head}...")
                            } else {
                                line.to_string()
                            };
                            println!("    {}", colors::dim(&truncated));
                        }
                    }
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}
