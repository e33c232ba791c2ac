use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::{self, Write};

use crate::error::{CheckError, CheckResult};
use crate::host::HostStatus;
use crate::threshold::Limits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Targetname,
    Targetip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub title: String,
    pub started_at: DateTime<Local>,
    /// `started_at` formatted for humans
    pub start_time: String,
    pub sort_by: SortBy,
    pub source_label: String,
    pub packet_count: u32,
    pub limits: Limits,
}

/// Host results of one run, ordered by the configured sort key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub hosts: Vec<HostStatus>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, mut hosts: Vec<HostStatus>) -> Self {
        sort_hosts(&mut hosts, metadata.sort_by);
        Self { metadata, hosts }
    }
}

/// Stable sort, so equal keys keep the order fping reported them in.
pub fn sort_hosts(hosts: &mut [HostStatus], sort_by: SortBy) {
    match sort_by {
        SortBy::Targetname => hosts.sort_by(|a, b| a.target.name.cmp(&b.target.name)),
        SortBy::Targetip => hosts.sort_by(|a, b| a.target.addr.cmp(&b.target.addr)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Renderer {
    Html,
    Json,
    Csv,
}

impl Renderer {
    pub fn extension(self) -> &'static str {
        match self {
            Renderer::Html => "html",
            Renderer::Json => "json",
            Renderer::Csv => "csv",
        }
    }

    pub fn render(self, report: &Report) -> CheckResult<String> {
        match self {
            Renderer::Html => {
                render_html(report).map_err(|e| CheckError::Render(e.to_string()))
            }
            Renderer::Json => render_json(report),
            Renderer::Csv => render_csv(report),
        }
    }
}

fn fmt_ms(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn responses(host: &HostStatus) -> String {
    host.samples
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn row_class(host: &HostStatus, limits: &Limits) -> &'static str {
    match (limits.high_rtt(host), limits.high_loss(host)) {
        (true, true) => "rtt loss",
        (true, false) => "rtt",
        (false, true) => "loss",
        (false, false) if host.error_level > 0 => "errors",
        (false, false) => "ok",
    }
}

fn render_html(report: &Report) -> Result<String, fmt::Error> {
    let meta = &report.metadata;
    let title = escape_html(&meta.title);
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(html, "<title>{}</title>", title)?;
    writeln!(
        html,
        "<style>\ntable {{ border-collapse: collapse; }}\n\
         td, th {{ border: 1px solid #ccc; padding: 2px 6px; text-align: right; }}\n\
         tr.rtt td, tr.loss td {{ background: #f8d7da; }}\n\
         tr.errors td {{ background: #fff3cd; }}\n</style>"
    )?;
    writeln!(html, "</head>\n<body>")?;
    writeln!(html, "<h1>{}</h1>", title)?;
    writeln!(
        html,
        "<p>Started {} &middot; {} packets per host &middot; limits: median RTT {:.2} ms, loss {:.2}% &middot; sorted by {}</p>",
        escape_html(&meta.start_time),
        meta.packet_count,
        meta.limits.rtt_ms,
        meta.limits.loss_percent,
        match meta.sort_by {
            SortBy::Targetname => "target name",
            SortBy::Targetip => "target address",
        }
    )?;
    writeln!(html, "<table>")?;
    writeln!(
        html,
        "<tr><th>Target</th><th>Address</th><th>Min</th><th>Avg</th><th>Max</th>\
         <th>Median</th><th>Jitter</th><th>Loss %</th><th>Errors</th><th>Responses</th></tr>"
    )?;
    for host in &report.hosts {
        let latency = host.latency;
        writeln!(
            html,
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>",
            row_class(host, &meta.limits),
            escape_html(&host.target.name),
            host.target.addr,
            fmt_ms(latency.map(|l| l.min)),
            fmt_ms(latency.map(|l| l.avg)),
            fmt_ms(latency.map(|l| l.max)),
            fmt_ms(latency.map(|l| l.median)),
            fmt_ms(latency.map(|l| l.jitter)),
            host.loss_percent,
            host.error_level,
            responses(host),
        )?;
    }
    writeln!(html, "</table>\n</body>\n</html>")?;
    Ok(html)
}

fn render_json(report: &Report) -> CheckResult<String> {
    serde_json::to_string_pretty(report).map_err(|e| CheckError::Render(e.to_string()))
}

fn render_csv(report: &Report) -> CheckResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let csv_err = |e: csv::Error| CheckError::Render(e.to_string());

    wtr.write_record([
        "target",
        "address",
        "min_ms",
        "avg_ms",
        "max_ms",
        "median_ms",
        "jitter_ms",
        "loss_percent",
        "error_level",
        "responses",
    ])
    .map_err(csv_err)?;

    for host in &report.hosts {
        let latency = host.latency;
        wtr.write_record([
            host.target.name.clone(),
            host.target.addr.to_string(),
            fmt_ms(latency.map(|l| l.min)),
            fmt_ms(latency.map(|l| l.avg)),
            fmt_ms(latency.map(|l| l.max)),
            fmt_ms(latency.map(|l| l.median)),
            fmt_ms(latency.map(|l| l.jitter)),
            format!("{:.2}", host.loss_percent),
            host.error_level.to_string(),
            responses(host),
        ])
        .map_err(csv_err)?;
    }

    let inner = wtr
        .into_inner()
        .map_err(|e| CheckError::Render(format!("Failed to get inner writer: {}", e)))?;
    String::from_utf8(inner).map_err(|_| CheckError::Render("Invalid UTF-8 sequence".to_string()))
}
