use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use rollcall::json_encoder::{write_rosters, write_rosters_to_path};
use rollcall::opts::DEFAULT_VISION_ENDPOINT;
use rollcall::{
    BatchOpts, BatchReport, Credentials, Rollcall, VisionConfig, VisionRecognizer,
    process_text_dir,
};

fn main() -> Result<()> {
    rollcall::init_logging();
    let params = Params::parse();

    let opts = BatchOpts {
        sort_inputs: !params.no_sort,
        fail_fast: params.fail_fast,
    };

    let report = if params.text {
        process_text_dir(&params.dir, &opts)
            .with_context(|| format!("failed to process {}", params.dir.display()))?
    } else {
        let config = vision_config(&params)?;
        let recognizer =
            VisionRecognizer::new(config).context("failed to build Vision client")?;
        Rollcall::with_opts(recognizer, opts)
            .process_dir(&params.dir)
            .with_context(|| format!("failed to process {}", params.dir.display()))?
    };

    save(&report, &params.output)?;
    print_summary(&report);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "Extract room rosters from photographed lists")]
struct Params {
    /// Folder containing roster images (jpg, jpeg, png, bmp, gif).
    #[arg(short = 'd', long = "dir")]
    dir: PathBuf,

    /// Where to write the JSON results. Use `-` for stdout.
    #[arg(short = 'o', long = "output", default_value = "results.json")]
    output: PathBuf,

    /// Vision API key.
    #[arg(long = "api-key", env = "ROLLCALL_VISION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OAuth2 access token, used when no API key is given.
    #[arg(long = "access-token", env = "ROLLCALL_VISION_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// JSON file holding `api_key` or `access_token`.
    #[arg(long = "credentials")]
    credentials: Option<PathBuf>,

    /// Vision API base URL.
    #[arg(long = "endpoint", default_value = DEFAULT_VISION_ENDPOINT)]
    endpoint: String,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Keep directory-listing order instead of sorting by file name.
    #[arg(long = "no-sort", default_value_t = false)]
    no_sort: bool,

    /// Stop at the first image that fails instead of skipping it.
    #[arg(long = "fail-fast", default_value_t = false)]
    fail_fast: bool,

    /// Treat inputs as already-recognized `.txt` files and skip OCR.
    #[arg(long = "text", default_value_t = false)]
    text: bool,
}

fn credentials(params: &Params) -> Result<Credentials> {
    Credentials::resolve(
        params.api_key.as_deref(),
        params.access_token.as_deref(),
        params.credentials.as_deref(),
    )
    .context("failed to load Vision credentials")?
    .context("no Vision credentials: pass --api-key, --access-token, or --credentials")
}

fn vision_config(params: &Params) -> Result<VisionConfig> {
    let mut config = VisionConfig::new(credentials(params)?).with_endpoint(&params.endpoint);
    if let Some(secs) = params.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

fn save(report: &BatchReport, output: &Path) -> Result<()> {
    if output.as_os_str() == "-" {
        let stdout = io::stdout();
        write_rosters(BufWriter::new(stdout.lock()), &report.rosters)
            .context("failed to write results to stdout")?;
        println!();
        return Ok(());
    }

    write_rosters_to_path(&report.rosters, output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Results saved to {}", output.display());
    Ok(())
}

fn print_summary(report: &BatchReport) {
    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.error);
    }
    eprintln!(
        "{} parsed, {} without text, {} skipped, {} rooms",
        report.processed,
        report.no_text.len(),
        report.failures.len(),
        report.rosters.len()
    );
}
