use std::path::PathBuf;
use std::process::ExitCode;

use domsnap::output::CaptureOutput;
use domsnap::plugins::{cleaner, iframe_placeholder};
use domsnap::{
    CaptureOptions, Document, PageSnapshot, SnapOutput, SnapshotError, Snapshotter, OUTPUT_VERSION,
};
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{format_effective_config, load_config, resolve_capture_settings};

/// Arguments of the capture command.
pub struct CaptureArgs {
    pub snapshot: PathBuf,
    pub selector: Option<String>,
    pub bgcolor: Option<String>,
    pub group: Option<String>,
    pub clean: bool,
    pub fetch_timeout: Option<u64>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the capture command.
pub async fn run_capture(config_path: Option<PathBuf>, args: CaptureArgs) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();
    match capture(config_path, args).await {
        Ok(body) => {
            if let Err(err) = write_output(&body, format, output.clone()) {
                return render_error(SnapshotError::Config(err.to_string()), format, output);
            }
            ExitCode::SUCCESS
        }
        Err(err) => render_error(err, format, output),
    }
}

async fn capture(
    config_path: Option<PathBuf>,
    args: CaptureArgs,
) -> Result<SnapOutput, SnapshotError> {
    let config = load_config(config_path.as_deref())?;
    let settings = resolve_capture_settings(args.fetch_timeout, args.group, &config)?;
    debug!("{}", format_effective_config(&settings, config_path.as_deref()));

    let page = PageSnapshot::load(&args.snapshot).map_err(|e| match e {
        SnapshotError::Io(io) => SnapshotError::Config(format!(
            "Failed to read snapshot {}: {}",
            args.snapshot.display(),
            io
        )),
        other => other,
    })?;
    let root = match args.selector.as_deref() {
        Some(selector) => page.query_selector(selector).ok_or_else(|| {
            SnapshotError::Config(format!("selector '{selector}' matched no node"))
        })?,
        None => page
            .document_element()
            .ok_or_else(|| SnapshotError::Config("snapshot has no root node".to_string()))?,
    };
    info!(
        snapshot = %args.snapshot.display(),
        url = page.url().unwrap_or("<unknown>"),
        "capturing"
    );

    let snapshotter = Snapshotter::with_defaults(settings.config.clone())?;
    if args.clean {
        for (modifier, filter, priority) in [cleaner(), iframe_placeholder()] {
            snapshotter
                .registry()
                .register(modifier, filter, priority, settings.group.as_deref());
        }
    }

    let mut options = CaptureOptions::default();
    if let Some(bgcolor) = args.bgcolor {
        options = options.with_bgcolor(bgcolor);
    }
    if let Some(group) = settings.group.clone() {
        options = options.with_group(group);
    }

    let svg = snapshotter.capture_svg(&page, root, &options).await?;
    Ok(SnapOutput::Capture(CaptureOutput {
        version: OUTPUT_VERSION.to_string(),
        snapshot: args.snapshot,
        selector: args.selector,
        group: settings.group,
        width: svg.width,
        height: svg.height,
        data_uri: svg.data_uri,
    }))
}
