//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::classifier::{ClassificationOutcome, LearningOutcome, ModelStats, PerformanceStats};
use crate::cli::args::{OutputFormat, ParleyArgs};
use crate::error::Result;
use crate::intent::ClassificationResult;
use crate::ml::TrainingMetrics;

/// One classified input.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyReport {
    pub input: String,
    #[serde(flatten)]
    pub outcome: ClassificationOutcome,
    /// Rule-based answer tried after the model deferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<ClassificationResult>,
}

/// Result of a `train` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainReport {
    /// Whether the saved model was reused.
    pub loaded: bool,
    pub metrics: TrainingMetrics,
}

/// Result of a `learn` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct LearnReport {
    pub input: String,
    #[serde(flatten)]
    pub outcome: LearningOutcome,
}

/// Result of a `stats` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsReport {
    pub model: ModelStats,
    pub performance: PerformanceStats,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &ParleyArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &ParleyArgs) -> Result<()> {
    if args.verbosity() > 0 && !message.is_empty() {
        println!("{message}");
        println!("{}", "─".repeat(message.chars().count()));
    }
    let value = serde_json::to_value(result)?;
    print_human_value(&value, 0);
    Ok(())
}

fn output_json<T: Serialize>(result: &T, args: &ParleyArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Print nested objects as indented `key: value` lines.
fn print_human_value(value: &serde_json::Value, indent: usize) {
    let spaces = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                if val.is_object() {
                    println!("{spaces}{key}:");
                    print_human_value(val, indent + 1);
                } else {
                    println!("{spaces}{key}: {}", format_value(val));
                }
            }
        }
        _ => println!("{spaces}{}", format_value(value)),
    }
}

/// Format a JSON scalar or array for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}
