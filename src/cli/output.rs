//! Output formatting for CLI commands.
//!
//! Every formatter method returns a `String`; writing it out is left to
//! `main.rs`. Colors are decided by the [`RenderConfig`] handed to the
//! formatter, never by global state.

use colored::{Color, Colorize};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::planner::{
    ActionKind, DiffEngine, DiffNode, ExecutionReport, ReconciliationAction, ReconciliationPlan,
};
use crate::swarm::Service;

use super::commands::OutputFormat;

/// Column diff values are aligned to by default.
pub const DEFAULT_COLUMN: usize = 50;

/// How plans are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Emit ANSI colors.
    pub color: bool,
    /// Show unchanged leaves and unchanged services.
    pub detail: bool,
    /// Column the values start at.
    pub column: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: true,
            detail: false,
            column: DEFAULT_COLUMN,
        }
    }
}

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
    /// Plan rendering options.
    config: RenderConfig,
}

/// Execution outcome row for table display.
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// Live service row for table display.
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "Published Ports")]
    ports: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat, config: RenderConfig) -> Self {
        Self { format, config }
    }

    /// Formats a reconciliation plan.
    #[must_use]
    pub fn format_plan(&self, plan: &ReconciliationPlan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::new(plan, self.config.detail))
                    .unwrap_or_default()
            }
            OutputFormat::Text => self.format_plan_text(plan),
        }
    }

    fn format_plan_text(&self, plan: &ReconciliationPlan) -> String {
        if plan.is_empty() && !self.config.detail {
            return format!(
                "{} No changes required - stack {} is up to date.\n",
                self.paint("✓", Color::Green),
                plan.scope
            );
        }

        let engine = DiffEngine::new();
        let mut output = String::new();

        for action in &plan.actions {
            match action {
                ReconciliationAction::Create(entity) => {
                    self.header(&mut output, &format!("+ {}", entity.name), Color::Green);
                    for node in engine.print_spec(&entity.spec) {
                        output.push_str(&self.line(&node));
                    }
                }
                ReconciliationAction::Delete(entity) => {
                    self.header(&mut output, &format!("- {}", entity.name), Color::Red);
                    for node in engine.print_spec(&entity.spec) {
                        output.push_str(&self.line(&node));
                    }
                }
                ReconciliationAction::Update { desired, diff, .. } => {
                    self.header(&mut output, &format!("~ {}", desired.name), Color::Yellow);
                    for node in diff.nodes().iter().filter(|n| n.changed || self.config.detail) {
                        output.push_str(&self.line(node));
                    }
                }
                ReconciliationAction::Unchanged(entity) if self.config.detail => {
                    self.header(&mut output, &entity.name, Color::Cyan);
                    let nodes = engine
                        .diff(&entity.spec, &entity.spec)
                        .map(|report| report.nodes().to_vec())
                        .unwrap_or_default();
                    for node in &nodes {
                        output.push_str(&self.line(node));
                    }
                }
                ReconciliationAction::Unchanged(_) => {}
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to destroy\n",
            self.paint(&plan.count(ActionKind::Create).to_string(), Color::Green),
            self.paint(&plan.count(ActionKind::Update).to_string(), Color::Yellow),
            self.paint(&plan.count(ActionKind::Delete).to_string(), Color::Red),
        );

        output
    }

    fn header(&self, output: &mut String, title: &str, color: Color) {
        let _ = writeln!(output, "\n{}", self.paint(title, color));
    }

    /// Renders one leaf as `   <path>:<pad>"<current>" => "<expected>"`.
    fn line(&self, node: &DiffNode) -> String {
        let path = node.path.to_string();
        let pad = " ".repeat(self.config.column.saturating_sub(path.len()).max(1));
        let current = node.current.as_deref().unwrap_or_default();
        let highlight = node.changed && self.config.detail;

        let paint = |text: &str| {
            if highlight {
                self.paint(text, Color::Yellow)
            } else {
                text.to_string()
            }
        };

        match &node.expected {
            Some(expected) => format!(
                "   {}:{pad}\"{}\" {} \"{}\"\n",
                paint(&path),
                paint(current),
                paint("=>"),
                paint(expected)
            ),
            None => format!("   {path}:{pad}\"{current}\"\n"),
        }
    }

    /// Formats the result of applying a plan.
    #[must_use]
    pub fn format_report(&self, report: &ExecutionReport) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ReportJson::from(report)).unwrap_or_default()
            }
            OutputFormat::Text => self.format_report_text(report),
        }
    }

    fn format_report_text(&self, report: &ExecutionReport) -> String {
        let mut output = String::new();

        for network in &report.networks_created {
            let _ = writeln!(output, "Created network {network}");
        }

        let rows: Vec<OutcomeRow> = report
            .outcomes
            .iter()
            .filter(|o| o.action != ActionKind::Unchanged)
            .map(|o| OutcomeRow {
                name: o.name.clone(),
                action: o.action.to_string(),
                result: if o.success {
                    self.paint("ok", Color::Green)
                } else {
                    self.paint("failed", Color::Red)
                },
            })
            .collect();

        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let status = if report.all_successful() {
            self.paint("✓", Color::Green)
        } else {
            self.paint("✗", Color::Red)
        };
        let _ = writeln!(output, "\n{status} {report}");

        if !report.errors.is_empty() {
            let _ = writeln!(output, "\n{} Errors:", self.paint("⚠", Color::Yellow));
            for error in &report.errors {
                let _ = writeln!(output, "   - {error}");
            }
            if report.has_retryable_failures() {
                output.push_str(
                    "\nSome services changed while applying; run plan again and retry.\n",
                );
            }
        }

        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        stack: &str,
        result: &ValidationResult,
        warnings: bool,
    ) -> String {
        if self.format == OutputFormat::Json {
            let json = serde_json::json!({
                "stack": stack,
                "valid": result.is_valid(),
                "errors": result
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                    .collect::<Vec<_>>(),
                "warnings": result.warnings,
            });
            return serde_json::to_string_pretty(&json).unwrap_or_default();
        }

        let mut output = if result.is_valid() {
            format!("{} Bundle for stack {stack} is valid\n", self.paint("✓", Color::Green))
        } else {
            let mut output = format!(
                "{} Bundle for stack {stack} has {} error(s):\n",
                self.paint("✗", Color::Red),
                result.error_count()
            );
            for error in &result.errors {
                let _ = writeln!(output, "   - {error}");
            }
            output
        };

        if warnings && result.warning_count() > 0 {
            let _ = writeln!(output, "\n{} Warnings:", self.paint("⚠", Color::Yellow));
            for warning in &result.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        output
    }

    /// Formats a stack's live services with their published ports.
    #[must_use]
    pub fn format_services(&self, stack: &str, services: &[Service]) -> String {
        if self.format == OutputFormat::Json {
            let json: Vec<_> = services
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.spec.name,
                        "image": s.spec.task_template.container_spec.image,
                        "ports": s
                            .endpoint
                            .ports
                            .iter()
                            .map(|p| serde_json::json!({
                                "published": p.published_port,
                                "target": p.target_port,
                                "protocol": p.protocol,
                            }))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();
            return serde_json::to_string_pretty(&json).unwrap_or_default();
        }

        if services.is_empty() {
            return format!("No services deployed for stack {stack}.\n");
        }

        let rows: Vec<ServiceRow> = services
            .iter()
            .map(|s| ServiceRow {
                name: self.paint(&s.spec.name, Color::Green),
                image: s.spec.task_template.container_spec.image.clone(),
                ports: s
                    .endpoint
                    .ports
                    .iter()
                    .map(|p| format!("{} => {}", p.published_port, p.target_port))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();

        format!("{}\n", Table::new(rows))
    }

    /// Formats the list of written bundle files.
    #[must_use]
    pub fn format_exported(&self, paths: &[PathBuf]) -> String {
        if self.format == OutputFormat::Json {
            let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            return serde_json::to_string_pretty(&paths).unwrap_or_default();
        }

        if paths.is_empty() {
            return String::from("No services found to export\n");
        }

        let mut output = format!(
            "{} Swarm services exported to {} bundle(s):\n",
            self.paint("✓", Color::Green),
            paths.len()
        );
        for path in paths {
            let _ = writeln!(output, "   {}", path.display());
        }
        output
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "success", "message": message });
                serde_json::to_string(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", self.paint("✓", Color::Green)),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.config.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson<'a> {
    scope: &'a str,
    created_at: String,
    fingerprint: &'a str,
    creates: usize,
    updates: usize,
    deletes: usize,
    networks: Vec<&'a str>,
    actions: Vec<ActionJson<'a>>,
}

#[derive(Serialize)]
struct ActionJson<'a> {
    action: ActionKind,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    changes: Vec<&'a DiffNode>,
}

impl<'a> PlanJson<'a> {
    fn new(plan: &'a ReconciliationPlan, detail: bool) -> Self {
        Self {
            scope: &plan.scope,
            created_at: plan.created_at.to_rfc3339(),
            fingerprint: &plan.fingerprint,
            creates: plan.count(ActionKind::Create),
            updates: plan.count(ActionKind::Update),
            deletes: plan.count(ActionKind::Delete),
            networks: plan.networks.iter().map(|n| n.name.as_str()).collect(),
            actions: plan
                .actions
                .iter()
                .filter(|a| detail || a.kind() != ActionKind::Unchanged)
                .map(|a| ActionJson {
                    action: a.kind(),
                    name: a.name(),
                    spec: match a {
                        ReconciliationAction::Create(e) => Some(e.spec.to_json()),
                        _ => None,
                    },
                    changes: match a {
                        ReconciliationAction::Update { diff, .. } => diff
                            .nodes()
                            .iter()
                            .filter(|n| detail || n.changed)
                            .collect(),
                        _ => Vec::new(),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    success: bool,
    summary: String,
    networks_created: &'a [String],
    outcomes: Vec<OutcomeJson<'a>>,
    errors: Vec<ErrorJson<'a>>,
}

#[derive(Serialize)]
struct OutcomeJson<'a> {
    name: &'a str,
    action: ActionKind,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorJson<'a> {
    name: &'a str,
    action: ActionKind,
    message: String,
    retryable: bool,
}

impl<'a> From<&'a ExecutionReport> for ReportJson<'a> {
    fn from(report: &'a ExecutionReport) -> Self {
        Self {
            success: report.all_successful(),
            summary: report.to_string(),
            networks_created: &report.networks_created,
            outcomes: report
                .outcomes
                .iter()
                .map(|o| OutcomeJson {
                    name: &o.name,
                    action: o.action,
                    success: o.success,
                    remote_id: o.remote_id.as_deref(),
                })
                .collect(),
            errors: report
                .errors
                .iter()
                .map(|e| ErrorJson {
                    name: &e.name,
                    action: e.action,
                    message: e.source.to_string(),
                    retryable: e.source.is_retryable(),
                })
                .collect(),
        }
    }
}
