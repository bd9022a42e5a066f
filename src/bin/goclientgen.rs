use std::io::Write;

use anyhow::Context;
use clap::Parser;
use goclientgen::logger::init_cli_logger;
use goclientgen::{generate, write_output, Args, GenRequest, GoEnv};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_cli_logger(args.verbose);

    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let req = GenRequest::from(&args);
    let generated = generate(&cwd, GoEnv::from_env(), &req).with_context(|| {
        format!(
            "cannot generate client for {}.{}",
            args.server_pkg, args.server_type
        )
    })?;

    if args.stdout {
        let mut out = std::io::stdout().lock();
        out.write_all(generated.source.as_bytes())
            .context("cannot write to stdout")?;
    } else {
        write_output(&cwd.join(&args.out_dir), &generated)?;
    }
    Ok(())
}
