use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use firstlink_core::report::{self, page_title, ReportFormat};
use firstlink_core::walk::{
    execute_walk, stderr_trace, stdout_trace, Outcome, TraceCallback, Walk, WalkOptions, SEED_URL,
};
use firstlink_scanner::LinkSelector;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::form_urlencoded;
use url::Url;

const TARGET_TITLE: &str = "Philosophy";

// Escapes MediaWiki reverts after percent-encoding a title, so that article
// URLs match the hrefs it writes into pages
const TITLE_UNESCAPES: [(&str, &str); 10] = [
    ("%3B", ";"),
    ("%40", "@"),
    ("%24", "$"),
    ("%21", "!"),
    ("%28", "("),
    ("%29", ")"),
    ("%2C", ","),
    ("%2F", "/"),
    ("%7E", "~"),
    ("%3A", ":"),
];

// Helper functions for the walk handler

/// Initialise logging on stderr so stdout only carries the path and verdict
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build an article URL from its title, e.g. `Ancient Greece` ->
/// `https://en.wikipedia.org/wiki/Ancient_Greece`.
///
/// The title is written the way MediaWiki links to it: spaces become `_`,
/// the first letter is capitalised and the rest is percent-encoded
/// (`Kurt Gödel` -> `Kurt_G%C3%B6del`, `Hilbert's` -> `Hilbert%27s`).
pub fn title_to_url(site_root: &str, title: &str) -> String {
    format!(
        "{}/wiki/{}",
        site_root.trim_end_matches('/'),
        encode_title(title)
    )
}

fn encode_title(title: &str) -> String {
    let underscored = title.trim().replace(' ', "_");
    let mut chars = underscored.chars();
    let capitalised: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    let mut encoded: String = form_urlencoded::byte_serialize(capitalised.as_bytes()).collect();
    for (escaped, raw) in TITLE_UNESCAPES {
        encoded = encoded.replace(escaped, raw);
    }
    encoded
}

/// Pick the start page from --url or --title, falling back to the seed page
pub fn resolve_start_url(url: Option<&Url>, title: Option<&String>, site_root: &str) -> String {
    if let Some(url) = url {
        url.as_str().to_string()
    } else if let Some(title) = title {
        title_to_url(site_root, title)
    } else {
        SEED_URL.to_string()
    }
}

/// Expand `~` in a user supplied output path
pub fn output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Start page, target and site root all share one normalised root, so the
/// URLs the walk compares are built by the same rule as followed links.
pub fn walk_options_from_args(args: &ArgMatches, quiet: bool) -> WalkOptions {
    let site_root = match args.get_one::<String>("site-root") {
        Some(raw) => LinkSelector::new(raw.as_str()).site_root().to_string(),
        None => WalkOptions::default().site_root,
    };
    let start_url = resolve_start_url(
        args.get_one::<Url>("url"),
        args.get_one::<String>("title"),
        &site_root,
    );
    let target_url = match args.try_get_one::<String>("target") {
        Ok(Some(target)) => target.clone(),
        _ => title_to_url(&site_root, TARGET_TITLE),
    };
    let mut options = WalkOptions {
        start_url,
        target_url,
        site_root,
        show_progress: !quiet,
        ..WalkOptions::default()
    };
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    debug!(?options, "Resolved walk options");
    options
}

pub fn summary_line(walk: &Walk) -> String {
    let target = page_title(&walk.target_url);
    match walk.outcome {
        Outcome::ReachedTarget => format!(
            "{} Reached {} in {} hops",
            "✓".green().bold(),
            target.bright_white(),
            walk.hops().to_string().cyan()
        ),
        Outcome::NoValidLink => format!(
            "{} No valid link on {} after {} hops",
            "✗".red().bold(),
            page_title(walk.last_url().unwrap_or_default()).bright_white(),
            walk.hops().to_string().cyan()
        ),
        Outcome::PageMissing => format!(
            "{} {} does not exist",
            "✗".red().bold(),
            page_title(walk.last_url().unwrap_or_default()).bright_white()
        ),
    }
}

/// Stdout carries the path in text mode; in JSON mode it carries the report,
/// so the path goes to stderr instead
pub fn trace_for(format: ReportFormat) -> TraceCallback {
    match format {
        ReportFormat::Text => stdout_trace(),
        ReportFormat::Json => stderr_trace(),
    }
}

pub async fn handle_walk(args: &ArgMatches, quiet: bool) -> Result<bool> {
    let options = walk_options_from_args(args, quiet);
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    if !quiet {
        eprintln!(
            "{} {} {} {}",
            "→".blue(),
            page_title(&options.start_url).bright_white(),
            "→".blue(),
            page_title(&options.target_url).bright_white()
        );
    }

    let trace = trace_for(format);

    let walk = execute_walk(options, trace).await.context("Walk failed")?;

    match format {
        ReportFormat::Text => println!("{}", walk.reached_target()),
        ReportFormat::Json => println!("{}", report::render_json(&walk)?),
    }

    if !quiet {
        eprintln!("{}", summary_line(&walk));
    }

    if let Some(raw) = args.get_one::<String>("output") {
        let path = output_path(raw);
        report::write_report(&walk, format, &path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if !quiet {
            eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
        }
    }

    Ok(walk.reached_target())
}

pub async fn handle_first(args: &ArgMatches) -> Result<()> {
    let options = walk_options_from_args(args, true);
    let finder = options.path_finder()?;

    match finder.peek(&options.start_url).await? {
        Some(link) => println!("{}", link.url),
        None => {
            eprintln!(
                "{} No valid link on {}",
                "✗".red().bold(),
                page_title(&options.start_url).bright_white()
            );
        }
    }
    Ok(())
}
