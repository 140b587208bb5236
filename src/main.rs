use anyhow::Context;
use t4c_tool::args;
use t4c_tool::diagnostics::Diagnostics;
use t4c_tool::extract::extract_all;
use tracing::{Level, error, info};

fn run_extract(args: &args::ExtractArgs, diag: &mut Diagnostics) -> anyhow::Result<()> {
    let config = args.to_config();
    if !config.install_dir.is_dir() {
        anyhow::bail!(
            "Install directory {} does not exist",
            config.install_dir.display()
        );
    }
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    info!(
        "Extracting {} to {}",
        config.install_dir.display(),
        config.output_dir.display()
    );
    extract_all(&config, diag).context("Extraction aborted")?;
    Ok(())
}

fn main() {
    let arg = args::parse_args();
    if arg.backtrace {
        unsafe { std::env::set_var("RUST_LIB_BACKTRACE", "1") };
    }
    let level = if arg.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let mut diag = Diagnostics::new();
    let re = match &arg.command {
        args::Command::Extract(args) => run_extract(args, &mut diag),
    };
    eprintln!("{}", diag.counter());
    if let Err(e) = re {
        error!("{:#}", e);
        if arg.backtrace {
            eprintln!("Backtrace: {}", e.backtrace());
        }
        std::process::exit(1);
    }
}
