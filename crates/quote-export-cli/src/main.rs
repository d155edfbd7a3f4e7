use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use quote_export_core::observability::{LogFormat, init_tracing};
use quote_export_core::{ExportError, InvocationContext, ResponseEnvelope, handle_from_env};

/// Run one quote export and print the response envelope as JSON.
#[derive(Parser, Debug)]
#[command(name = "quote-export", version, about, long_about = None)]
struct CliArgs {
    /// Event document passed by the trigger (`-` reads stdin). Defaults to `{}`.
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// pretty or json
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Request id to tag logs with; generated when absent.
    #[arg(long, env = "REQUEST_ID")]
    request_id: Option<String>,

    /// Function name to tag logs with.
    #[arg(long, env = "FUNCTION_NAME")]
    function_name: Option<String>,
}

fn parse_event(raw: &str) -> Result<serde_json::Value, ExportError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
        .map_err(|e| ExportError::Configuration(format!("invalid event JSON: {e}")))
}

fn read_event(path: Option<&Path>) -> Result<serde_json::Value, ExportError> {
    let raw = match path {
        None => String::new(),
        Some(p) if p.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| ExportError::Configuration(format!("reading event from stdin: {e}")))?;
            buf
        }
        Some(p) => std::fs::read_to_string(p).map_err(|e| {
            ExportError::Configuration(format!("reading event {}: {e}", p.display()))
        })?,
    };
    parse_event(&raw)
}

fn context_from(args: &CliArgs) -> InvocationContext {
    let mut ctx = match &args.request_id {
        Some(id) => InvocationContext::new(id.clone()),
        None => InvocationContext::default(),
    };
    if let Some(name) = &args.function_name {
        ctx = ctx.with_function_name(name.clone());
    }
    ctx
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // ログの初期化に失敗しても export 自体は続ける
    let format = args.log_format.parse().unwrap_or_else(|e| {
        eprintln!("{e}; falling back to pretty logs");
        LogFormat::Pretty
    });
    if let Err(e) = init_tracing(format, "info") {
        eprintln!("{e}");
    }

    let ctx = context_from(&args);
    let envelope = match read_event(args.event.as_deref()) {
        Ok(event) => handle_from_env(&event, &ctx).await,
        Err(err) => {
            tracing::error!(error = %err, "could not read event");
            ResponseEnvelope::failure(&err)
        }
    };

    match serde_json::to_string(&envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to encode response: {e}"),
    }

    if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
