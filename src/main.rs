//! QRFORGE command-line entrypoint

use clap::Parser;
use qrforge::output::platform::{CommandShare, ConfiguredPermissions, DirectoryLibrary};
use qrforge::session::SAVED_MESSAGE;
use qrforge::{
    Error, HttpQrService, Notice, NoticeKind, OutputSink, QrforgeConfig, Result, Session, logging,
    preview,
};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrforge",
    version,
    about = "Request QR codes with an optional logo from a generation service"
)]
struct Cli {
    /// URL to encode
    #[arg(long, short, value_name = "URL", default_value = "")]
    url: String,

    /// Image to place in the middle of the QR code
    #[arg(long, short, value_name = "PATH")]
    logo: Option<PathBuf>,

    /// Optional configuration file (toml/yaml). Defaults to qrforge.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the generation endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Override the request timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Share the generated image through the configured share command
    #[arg(long)]
    share: bool,

    /// Save the generated image into the photo library
    #[arg(long)]
    save: bool,

    /// Print the full data URI of the generated image
    #[arg(long)]
    data_uri: bool,

    /// Read the QR code back and check it encodes the requested URL
    #[arg(long)]
    verify: bool,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

struct Console {
    json: bool,
    records: Vec<Value>,
}

impl Console {
    fn new(json: bool) -> Self {
        Self {
            json,
            records: Vec::new(),
        }
    }

    fn notice(&mut self, notice: &Notice) {
        if self.json {
            self.records.push(json!({ "notice": notice }));
            return;
        }
        let marker = match notice.kind {
            NoticeKind::Error => "✗",
            NoticeKind::Success => "✓",
            NoticeKind::Info => "•",
        };
        println!("{marker} {}", notice.text);
    }

    fn report(&mut self, key: &str, value: Value, human: impl FnOnce() -> String) {
        if self.json {
            let mut record = Map::new();
            record.insert(key.to_string(), value);
            self.records.push(Value::Object(record));
        } else {
            println!("{}", human());
        }
    }

    fn finish(self) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&Value::Array(self.records))?);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = QrforgeConfig::load(cli.config.as_deref())?;

    if let Some(ref endpoint) = cli.endpoint {
        config.service.endpoint = endpoint.clone();
    }
    if let Some(timeout) = cli.timeout_secs {
        config.service.timeout_secs = timeout;
    }

    logging::init(&config.logging)?;
    info!(endpoint = %config.service.endpoint, "Starting QRFORGE session");

    let service = HttpQrService::new(&config.service)?;
    let sink = OutputSink::new(
        config.output.cache_dir.clone(),
        Arc::new(CommandShare::from_options(&config.output)),
        Arc::new(DirectoryLibrary::new(config.photos.library_dir.clone())),
        Arc::new(ConfiguredPermissions::from_options(&config.photos)),
    );

    let mut session = Session::new(Arc::new(service), sink);
    let mut console = Console::new(cli.json);

    session.set_url(cli.url.clone());
    if let Some(logo) = cli.logo.clone() {
        if let Err(err) = session.pick_logo(logo) {
            console.notice(&Notice::error(&err));
            console.finish()?;
            return Ok(ExitCode::FAILURE);
        }
    }

    let generated = match session.generate().await {
        Ok(image) => image.clone(),
        Err(err) => {
            console.notice(&Notice::error(&err));
            console.finish()?;
            return Ok(ExitCode::FAILURE);
        }
    };

    match preview::inspect(&generated) {
        Ok(summary) => console.report("image", json!(summary), || {
            format!(
                "QR code generated: {}x{} PNG ({} bytes)",
                summary.width, summary.height, summary.byte_len
            )
        }),
        Err(err) => {
            tracing::warn!("Generated payload is not a readable PNG: {err}");
            console.notice(&Notice::info("QR code generated but could not be previewed"));
        }
    }

    if cli.data_uri {
        console.report("data_uri", json!(generated.data_uri()), || {
            generated.data_uri().to_string()
        });
    }

    let mut exit = ExitCode::SUCCESS;

    if cli.verify {
        match preview::verify(&generated, session.url()) {
            Ok(verification) => {
                let matches = verification.matches;
                console.report("verification", json!(verification), || {
                    if matches {
                        "QR content matches the requested URL".to_string()
                    } else {
                        "QR content does not match the requested URL".to_string()
                    }
                });
                if !matches {
                    exit = ExitCode::FAILURE;
                }
            }
            Err(err) => {
                console.notice(&Notice::error(&err));
                exit = ExitCode::FAILURE;
            }
        }
    }

    // Share and save are independent; one failing does not stop the other.
    let (shared, saved) = tokio::join!(
        async {
            if cli.share {
                Some(session.share().await)
            } else {
                None
            }
        },
        async {
            if cli.save {
                Some(session.save().await)
            } else {
                None
            }
        }
    );

    if let Some(result) = shared {
        report_output(&mut console, result, None, &mut exit);
    }
    if let Some(result) = saved {
        report_output(&mut console, result, Some(SAVED_MESSAGE), &mut exit);
    }

    console.finish()?;
    Ok(exit)
}

fn report_output(
    console: &mut Console,
    result: Result<PathBuf>,
    success: Option<&str>,
    exit: &mut ExitCode,
) {
    match result {
        Ok(path) => {
            if let Some(text) = success {
                console.notice(&Notice::success(text));
            }
            tracing::debug!(path = %path.display(), "Output written");
        }
        Err(err) => {
            if !matches!(err, Error::Permission(_)) {
                tracing::warn!("Output failed: {err}");
            }
            console.notice(&Notice::error(&err));
            *exit = ExitCode::FAILURE;
        }
    }
}
