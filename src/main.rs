use std::fs;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;

use godet::cli::{Args, OutputFormat};
use godet::logging;
use godet::report::{self, sarif};
use godet::{config, rules, Analyzer, Config};

const INFORMATION_URI: &str = "https://github.com/godet-dev/godet";

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate().context("invalid arguments")?;
    logging::init(args.verbose, args.quiet);

    let mut config = Config::new();
    if args.nosec {
        config.set(config::NOSEC, true);
    }
    if let Some(tag) = &args.nosec_tag {
        config.set(config::NOSEC_ALTERNATIVE, tag.clone());
    }

    let mut analyzer = Analyzer::new(config, args.tests);
    analyzer.load_rules(&rules::generate_rule_list());

    let packages = args.expand_packages().context("expanding package paths")?;
    analyzer
        .process(&args.build_tags, &packages)
        .context("analysis failed")?;

    let (issues, stats, errors) = analyzer.report();
    let mut issues = issues.to_vec();
    report::sort_issues(&mut issues);

    let document = match args.format {
        OutputFormat::Json => report::to_json(&issues, stats, errors)?,
        OutputFormat::Sarif => {
            let sarif_report = sarif::create_report(
                &issues,
                &args.root_paths,
                "godet",
                env!("CARGO_PKG_VERSION"),
                INFORMATION_URI,
            )?;
            serde_json::to_string_pretty(&sarif_report).context("encoding SARIF")?
        }
    };

    match &args.output {
        Some(path) => fs::write(path, document)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{document}"),
    }

    if !issues.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
